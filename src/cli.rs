//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI parser for `workshop`.
#[derive(Debug, Parser)]
#[command(
    name = "workshop",
    version,
    about = "Turn an idea into a blueprint, a project and a running preview"
)]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the goal (optional) and generate a blueprint for it.
    Ideate {
        /// New goal text; the saved goal is used when omitted.
        goal: Option<String>,
    },
    /// Review, edit or approve the blueprint.
    Blueprint {
        /// Blueprint action.
        #[command(subcommand)]
        action: BlueprintAction,
    },
    /// Show the project file tree.
    Files,
    /// Select a file.
    Select {
        /// File path.
        path: String,
    },
    /// Generate file contents with the model.
    Generate {
        /// File to generate; every blueprint file when omitted.
        path: Option<String>,
        /// Generate every blueprint file.
        #[arg(long, conflicts_with = "path")]
        all: bool,
    },
    /// Replace a file's content with the contents of a local file.
    Edit {
        /// Project file path.
        path: String,
        /// Local file to read the new content from.
        #[arg(long)]
        from: PathBuf,
    },
    /// Create a new project file.
    Create {
        /// Project file path.
        path: String,
        /// Local file to read the initial content from.
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Delete a project file.
    Delete {
        /// Project file path.
        path: String,
    },
    /// Rename a project file.
    Rename {
        /// Current path.
        path: String,
        /// New path.
        new_path: String,
    },
    /// Ask the AI pair programmer.
    Chat {
        /// Message text.
        message: String,
    },
    /// Review the action plan proposed in chat.
    Plan {
        /// Plan action.
        #[command(subcommand)]
        action: PlanAction,
    },
    /// Apply code block N (1-based) of the latest model reply to the selected file.
    ApplyCode {
        /// Code block number.
        index: usize,
    },
    /// Render the preview of `index.html`.
    Preview {
        /// Write a standalone document with inlined resources to this file.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run the selected file.
    Run,
    /// Show the console log.
    Console {
        /// Clear the console instead.
        #[arg(long, conflicts_with = "ingest")]
        clear: bool,
        /// Feed preview bridge messages (one JSON object per line) from a
        /// file, or from stdin with `-`, into the console.
        #[arg(long, value_name = "FILE|-")]
        ingest: Option<PathBuf>,
    },
    /// Summarize the workshop.
    Status,
    /// Start over, keeping only the goal.
    Reset,
}

/// `workshop blueprint` actions.
#[derive(Debug, Subcommand)]
pub enum BlueprintAction {
    /// Print the blueprint text under review.
    Show,
    /// Replace the blueprint text with the contents of a file.
    Load {
        /// File holding blueprint JSON.
        file: PathBuf,
    },
    /// Approve the blueprint and scaffold the project.
    Approve,
}

/// `workshop plan` actions.
#[derive(Debug, Subcommand)]
pub enum PlanAction {
    /// Print pending action plans.
    Show,
    /// Apply a pending plan.
    Apply(PlanTarget),
    /// Discard a pending plan.
    Discard(PlanTarget),
}

/// Which chat message's plan to act on.
#[derive(Debug, Args)]
pub struct PlanTarget {
    /// Chat message number (as printed by `plan show`); the latest pending
    /// plan when omitted.
    #[arg(long)]
    pub message: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ideate_with_and_without_goal() {
        let cli = Cli::parse_from(["workshop", "ideate", "a todo app"]);
        assert!(matches!(cli.command, Command::Ideate { goal: Some(ref g) } if g == "a todo app"));
        let cli = Cli::parse_from(["workshop", "ideate"]);
        assert!(matches!(cli.command, Command::Ideate { goal: None }));
    }

    #[test]
    fn parses_nested_blueprint_actions() {
        let cli = Cli::parse_from(["workshop", "blueprint", "load", "bp.json"]);
        assert!(matches!(
            cli.command,
            Command::Blueprint { action: BlueprintAction::Load { ref file } } if file == &PathBuf::from("bp.json")
        ));
    }

    #[test]
    fn parses_plan_target() {
        let cli = Cli::parse_from(["workshop", "plan", "apply", "--message", "3"]);
        assert!(matches!(
            cli.command,
            Command::Plan { action: PlanAction::Apply(PlanTarget { message: Some(3) }) }
        ));
    }

    #[test]
    fn generate_path_conflicts_with_all() {
        assert!(Cli::try_parse_from(["workshop", "generate", "app.py", "--all"]).is_err());
        let cli = Cli::parse_from(["workshop", "generate", "--all"]);
        assert!(matches!(cli.command, Command::Generate { path: None, all: true }));
    }

    #[test]
    fn edit_requires_a_source() {
        assert!(Cli::try_parse_from(["workshop", "edit", "app.py"]).is_err());
    }

    #[test]
    fn console_ingest_conflicts_with_clear() {
        let cli = Cli::parse_from(["workshop", "console", "--ingest", "-"]);
        assert!(matches!(
            cli.command,
            Command::Console { clear: false, ingest: Some(ref p) } if p == &PathBuf::from("-")
        ));
        assert!(Cli::try_parse_from(["workshop", "console", "--clear", "--ingest", "-"]).is_err());
    }

    #[test]
    fn parses_apply_code_in_kebab_case() {
        let cli = Cli::parse_from(["workshop", "apply-code", "2"]);
        assert!(matches!(cli.command, Command::ApplyCode { index: 2 }));
    }
}
