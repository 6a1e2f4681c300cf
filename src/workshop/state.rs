//! The workshop aggregate root and its named transitions.
//!
//! Nothing outside this module assigns fields directly. Every transition
//! keeps two invariants: the stage only moves forward (or resets), and the
//! selected file, if any, exists in the store.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::blueprint::Blueprint;
use super::console::{ConsoleLevel, ConsoleSink};
use super::files::{FileOutcome, FileStore, ProjectFile};
use super::plan::{ActionKind, ActionOperation, ActionPlan};
use super::stage::{BuildStage, OutputTab, SideTab};
use crate::context::ServiceContext;
use crate::error::WorkshopError;

/// Goal text of a fresh workshop.
pub const DEFAULT_GOAL: &str =
    r#"A simple python flask API that has one route /hello that returns {"message": "hello world"}"#;

/// User-visible error for a blueprint that fails to parse on approval.
pub const INVALID_BLUEPRINT_ERROR: &str =
    "Blueprint is not valid JSON. Please fix it before proceeding.";

/// Extensions the "run" action can simulate.
pub const RUNNABLE_EXTENSIONS: [&str; 6] = ["py", "js", "ts", "go", "sh", "bash"];

/// Extension of `path` after the last dot, if any.
#[must_use]
pub fn extension(path: &str) -> Option<&str> {
    path.rsplit_once('.').map(|(_, ext)| ext)
}

/// Whether `path` names a script the run action can simulate.
#[must_use]
pub fn is_runnable(path: &str) -> bool {
    extension(path).is_some_and(|ext| RUNNABLE_EXTENSIONS.contains(&ext))
}

/// A logical call site guarded against concurrent use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Blueprint generation.
    Blueprint,
    /// Per-file or batch code generation.
    FileGeneration,
    /// A pair-programmer turn.
    Chat,
    /// Simulated execution.
    Run,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Blueprint => "blueprint generation",
            Self::FileGeneration => "file generation",
            Self::Chat => "chat",
            Self::Run => "run",
        };
        f.write_str(name)
    }
}

/// Proof of an in-flight call, tagged with the session it was dispatched in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    slot: Slot,
    session_id: String,
}

impl Ticket {
    /// Slot the call occupies.
    #[must_use]
    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// Session the call was dispatched in.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Counts of an applied action plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanReport {
    /// Operations that took effect.
    pub applied: usize,
    /// Operations skipped as no-ops.
    pub skipped: usize,
}

/// The workshop aggregate, persisted as a single JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkshopState {
    session_id: String,
    goal: String,
    stage: BuildStage,
    blueprint: Option<Blueprint>,
    blueprint_text: String,
    #[serde(rename = "projectFiles")]
    files: FileStore,
    selected_file_name: Option<String>,
    #[serde(rename = "consoleMessages")]
    console: ConsoleSink,
    active_side_tab: SideTab,
    is_preview_fullscreen: bool,
    show_output_panel: bool,
    active_output_tab: OutputTab,
    terminal_output: String,
    error: Option<String>,
    #[serde(skip)]
    in_flight: HashSet<Slot>,
}

impl Default for WorkshopState {
    fn default() -> Self {
        Self {
            session_id: String::new(),
            goal: DEFAULT_GOAL.to_string(),
            stage: BuildStage::Ideation,
            blueprint: None,
            blueprint_text: String::new(),
            files: FileStore::default(),
            selected_file_name: None,
            console: ConsoleSink::default(),
            active_side_tab: SideTab::Chat,
            is_preview_fullscreen: false,
            show_output_panel: true,
            active_output_tab: OutputTab::Preview,
            terminal_output: String::new(),
            error: None,
            in_flight: HashSet::new(),
        }
    }
}

impl WorkshopState {
    /// A fresh aggregate in ideation with a new session.
    #[must_use]
    pub fn new(ctx: &ServiceContext) -> Self {
        Self { session_id: ctx.id_gen.generate_id(), ..Self::default() }
    }

    /// Restores invariants on a freshly deserialized aggregate.
    ///
    /// Mints a session when none was stored and drops a selection that
    /// points at a missing file.
    pub fn repair(&mut self, ctx: &ServiceContext) {
        if self.session_id.is_empty() {
            self.session_id = ctx.id_gen.generate_id();
        }
        if self.selected_file_name.as_deref().is_some_and(|path| !self.files.contains(path)) {
            tracing::warn!(
                selected = self.selected_file_name.as_deref().unwrap_or_default(),
                "stored selection points at a missing file"
            );
            self.selected_file_name = self.files.first().map(|f| f.file_name.clone());
        }
    }

    // --- accessors ---

    /// Current session identifier.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The free-text project goal.
    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Current build stage.
    #[must_use]
    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    /// Accepted (or approved) blueprint.
    #[must_use]
    pub fn blueprint(&self) -> Option<&Blueprint> {
        self.blueprint.as_ref()
    }

    /// Editable blueprint text.
    #[must_use]
    pub fn blueprint_text(&self) -> &str {
        &self.blueprint_text
    }

    /// The project file store.
    #[must_use]
    pub fn files(&self) -> &FileStore {
        &self.files
    }

    /// Path of the selected file.
    #[must_use]
    pub fn selected_file_name(&self) -> Option<&str> {
        self.selected_file_name.as_deref()
    }

    /// The selected file.
    #[must_use]
    pub fn selected_file(&self) -> Option<&ProjectFile> {
        self.selected_file_name.as_deref().and_then(|path| self.files.get(path))
    }

    /// Console log.
    #[must_use]
    pub fn console(&self) -> &ConsoleSink {
        &self.console
    }

    /// Active side panel.
    #[must_use]
    pub fn active_side_tab(&self) -> SideTab {
        self.active_side_tab
    }

    /// Active output view.
    #[must_use]
    pub fn active_output_tab(&self) -> OutputTab {
        self.active_output_tab
    }

    /// Whether the preview fills the screen.
    #[must_use]
    pub fn is_preview_fullscreen(&self) -> bool {
        self.is_preview_fullscreen
    }

    /// Whether the output panel is visible.
    #[must_use]
    pub fn show_output_panel(&self) -> bool {
        self.show_output_panel
    }

    /// Output of the last simulated run.
    #[must_use]
    pub fn terminal_output(&self) -> &str {
        &self.terminal_output
    }

    /// User-visible inline error.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // --- in-flight slots ---

    /// Claims `slot` for a call dispatched in the current session.
    ///
    /// # Errors
    ///
    /// Returns [`WorkshopError::Busy`] if the slot is already claimed.
    pub fn begin(&mut self, slot: Slot) -> Result<Ticket, WorkshopError> {
        if !self.in_flight.insert(slot) {
            return Err(WorkshopError::Busy(slot));
        }
        Ok(Ticket { slot, session_id: self.session_id.clone() })
    }

    /// Whether `ticket` still belongs to the current session.
    #[must_use]
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.session_id == self.session_id
    }

    /// Releases the slot held by `ticket`.
    ///
    /// Returns `false` for a ticket of an abandoned session, whose result
    /// must then be dropped; the current session's slots stay untouched.
    pub fn finish(&mut self, ticket: &Ticket) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                slot = %ticket.slot,
                stale = %ticket.session_id,
                current = %self.session_id,
                "dropping result of an abandoned session"
            );
            return false;
        }
        self.in_flight.remove(&ticket.slot);
        true
    }

    /// Whether a call is in flight in `slot`.
    #[must_use]
    pub fn is_busy(&self, slot: Slot) -> bool {
        self.in_flight.contains(&slot)
    }

    // --- stage transitions ---

    /// Fails unless the workshop is in `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkshopError::InvalidStage`] for any other stage.
    pub fn require_stage(&self, expected: BuildStage) -> Result<(), WorkshopError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(WorkshopError::InvalidStage { expected, actual: self.stage })
        }
    }

    /// Replaces the goal text.
    pub fn set_goal(&mut self, goal: impl Into<String>) {
        self.goal = goal.into();
    }

    /// Discards everything but the goal and starts a new session.
    pub fn reset(&mut self, ctx: &ServiceContext) {
        let goal = std::mem::take(&mut self.goal);
        *self = Self { goal, ..Self::new(ctx) };
        tracing::info!(session = %self.session_id, "workshop reset");
    }

    /// Stores a freshly generated blueprint and opens it for review.
    ///
    /// # Errors
    ///
    /// Returns [`WorkshopError::InvalidStage`] outside ideation.
    pub fn accept_blueprint(
        &mut self,
        ctx: &ServiceContext,
        blueprint: Blueprint,
    ) -> Result<(), WorkshopError> {
        self.require_stage(BuildStage::Ideation)?;
        self.blueprint_text = blueprint.to_pretty_json();
        self.blueprint = Some(blueprint);
        self.stage = BuildStage::BlueprintReview;
        self.error = None;
        self.log(ctx, ConsoleLevel::Info, "Blueprint generated. Please review.");
        Ok(())
    }

    /// Replaces the blueprint text under review. The text is not validated
    /// until approval.
    ///
    /// # Errors
    ///
    /// Returns [`WorkshopError::InvalidStage`] outside blueprint review.
    pub fn edit_blueprint_text(&mut self, text: impl Into<String>) -> Result<(), WorkshopError> {
        self.require_stage(BuildStage::BlueprintReview)?;
        self.blueprint_text = text.into();
        Ok(())
    }

    /// Parses the reviewed text, scaffolds the store and enters the build stage.
    ///
    /// On a parse failure the workshop stays in review with the text intact
    /// and the inline error set.
    ///
    /// # Errors
    ///
    /// Returns [`WorkshopError::InvalidStage`] outside blueprint review, or
    /// [`WorkshopError::BlueprintParse`] when the text is not a valid blueprint.
    pub fn approve_blueprint(&mut self, ctx: &ServiceContext) -> Result<(), WorkshopError> {
        self.require_stage(BuildStage::BlueprintReview)?;
        let blueprint = match Blueprint::parse(&self.blueprint_text) {
            Ok(blueprint) => blueprint,
            Err(e) => {
                self.log(ctx, ConsoleLevel::Error, e.to_string());
                self.error = Some(INVALID_BLUEPRINT_ERROR.to_string());
                return Err(e);
            }
        };

        self.files = FileStore::scaffold(&blueprint);
        self.stage = BuildStage::Build;
        self.error = None;
        self.log(
            ctx,
            ConsoleLevel::Info,
            format!("Blueprint approved. Project \"{}\" scaffolded.", blueprint.project_name),
        );
        self.blueprint = Some(blueprint);

        self.selected_file_name = None;
        if let Some(first) = self.files.first().map(|f| f.file_name.clone()) {
            self.select_file(ctx, &first);
        }
        Ok(())
    }

    // --- file store ---

    /// Replaces the content of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkshopError::InvalidStage`] outside the build stage.
    pub fn set_content(
        &mut self,
        ctx: &ServiceContext,
        path: &str,
        content: impl Into<String>,
    ) -> Result<FileOutcome, WorkshopError> {
        self.require_stage(BuildStage::Build)?;
        Ok(self.update_op(ctx, path, content.into()))
    }

    /// Adds a file; an existing path is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`WorkshopError::InvalidStage`] outside the build stage.
    pub fn create_file(
        &mut self,
        ctx: &ServiceContext,
        path: &str,
        content: impl Into<String>,
    ) -> Result<FileOutcome, WorkshopError> {
        self.require_stage(BuildStage::Build)?;
        Ok(self.create_op(ctx, path, content.into()))
    }

    /// Removes a file, moving the selection if it pointed there.
    ///
    /// # Errors
    ///
    /// Returns [`WorkshopError::InvalidStage`] outside the build stage.
    pub fn delete_file(
        &mut self,
        ctx: &ServiceContext,
        path: &str,
    ) -> Result<FileOutcome, WorkshopError> {
        self.require_stage(BuildStage::Build)?;
        Ok(self.delete_op(ctx, path))
    }

    /// Renames a file; the selection follows it. Renaming onto an existing
    /// path is refused.
    ///
    /// # Errors
    ///
    /// Returns [`WorkshopError::InvalidStage`] outside the build stage.
    pub fn rename_file(
        &mut self,
        ctx: &ServiceContext,
        path: &str,
        new_path: &str,
    ) -> Result<FileOutcome, WorkshopError> {
        self.require_stage(BuildStage::Build)?;
        Ok(self.rename_op(ctx, path, new_path))
    }

    /// Selects `path` and picks the matching output view.
    ///
    /// HTML files show the preview when an entry point exists; every other
    /// file shows the terminal. Returns `false` when `path` is not in the
    /// store.
    pub fn select_file(&mut self, ctx: &ServiceContext, path: &str) -> bool {
        if !self.files.contains(path) {
            self.log(ctx, ConsoleLevel::Warn, format!("Cannot select {path}: no such file."));
            return false;
        }
        self.selected_file_name = Some(path.to_string());
        self.active_output_tab =
            if extension(path) == Some("html") && self.files.entry_point().is_some() {
                OutputTab::Preview
            } else {
                OutputTab::Terminal
            };
        true
    }

    /// Replaces the selected file's content with a code snippet from chat.
    ///
    /// # Errors
    ///
    /// Returns [`WorkshopError::NoSelection`] when no file is selected.
    pub fn apply_snippet(&mut self, ctx: &ServiceContext, code: &str) -> Result<(), WorkshopError> {
        self.require_stage(BuildStage::Build)?;
        let path = self.selected_file_name.clone().ok_or(WorkshopError::NoSelection)?;
        self.files.set_content(&path, code);
        self.log(ctx, ConsoleLevel::Info, format!("Applied AI suggestion to {path}."));
        Ok(())
    }

    /// Applies an approved action plan, operation by operation.
    ///
    /// No-op operations are skipped with a console warning and never abort
    /// the remaining ones.
    ///
    /// # Errors
    ///
    /// Returns [`WorkshopError::InvalidStage`] outside the build stage.
    pub fn apply_action_plan(
        &mut self,
        ctx: &ServiceContext,
        plan: &ActionPlan,
    ) -> Result<PlanReport, WorkshopError> {
        self.require_stage(BuildStage::Build)?;
        let mut report = PlanReport::default();
        for op in &plan.operations {
            if self.apply_operation(ctx, op).is_applied() {
                report.applied += 1;
            } else {
                report.skipped += 1;
            }
        }
        self.log(
            ctx,
            ConsoleLevel::Info,
            format!(
                "Action plan applied: {} operation(s) applied, {} skipped.",
                report.applied, report.skipped
            ),
        );
        Ok(report)
    }

    fn apply_operation(&mut self, ctx: &ServiceContext, op: &ActionOperation) -> FileOutcome {
        let path = op.path.as_str();
        match (op.action, &op.content, &op.new_path) {
            (ActionKind::CreateFile, Some(content), _) => self.create_op(ctx, path, content.clone()),
            (ActionKind::UpdateFile, Some(content), _) => self.update_op(ctx, path, content.clone()),
            (ActionKind::DeleteFile, _, _) => self.delete_op(ctx, path),
            (ActionKind::RenameFile, _, Some(new_path)) => self.rename_op(ctx, path, new_path),
            (ActionKind::CreateFile | ActionKind::UpdateFile, None, _) => {
                self.log(
                    ctx,
                    ConsoleLevel::Warn,
                    format!("{path}: operation has no content; skipped."),
                );
                FileOutcome::InvalidPath
            }
            (ActionKind::RenameFile, _, None) => {
                self.log(ctx, ConsoleLevel::Warn, format!("{path}: rename has no newPath; skipped."));
                FileOutcome::InvalidPath
            }
        }
    }

    fn create_op(&mut self, ctx: &ServiceContext, path: &str, content: String) -> FileOutcome {
        let outcome = self.files.create_file(path, "", content);
        match outcome {
            FileOutcome::Applied => self.log(ctx, ConsoleLevel::Info, format!("Created {path}.")),
            FileOutcome::AlreadyExists => self.log(
                ctx,
                ConsoleLevel::Warn,
                format!("{path} already exists; not overwriting."),
            ),
            _ => self.log(ctx, ConsoleLevel::Warn, format!("Cannot create file at {path:?}.")),
        }
        outcome
    }

    fn update_op(&mut self, ctx: &ServiceContext, path: &str, content: String) -> FileOutcome {
        let outcome = self.files.set_content(path, content);
        if outcome.is_applied() {
            self.log(ctx, ConsoleLevel::Info, format!("Updated {path}."));
        } else {
            self.log(ctx, ConsoleLevel::Warn, format!("Cannot update {path}: no such file."));
        }
        outcome
    }

    fn delete_op(&mut self, ctx: &ServiceContext, path: &str) -> FileOutcome {
        let outcome = self.files.delete_file(path);
        if !outcome.is_applied() {
            self.log(ctx, ConsoleLevel::Warn, format!("Cannot delete {path}: no such file."));
            return outcome;
        }
        if self.selected_file_name.as_deref() == Some(path) {
            self.selected_file_name = self.files.first().map(|f| f.file_name.clone());
        }
        self.log(ctx, ConsoleLevel::Info, format!("Deleted {path}."));
        outcome
    }

    fn rename_op(&mut self, ctx: &ServiceContext, path: &str, new_path: &str) -> FileOutcome {
        let outcome = self.files.rename_file(path, new_path);
        match outcome {
            FileOutcome::Applied => {
                if self.selected_file_name.as_deref() == Some(path) {
                    self.selected_file_name = Some(new_path.to_string());
                }
                self.log(ctx, ConsoleLevel::Info, format!("Renamed {path} to {new_path}."));
            }
            FileOutcome::Missing => {
                self.log(ctx, ConsoleLevel::Warn, format!("Cannot rename {path}: no such file."));
            }
            FileOutcome::DestinationExists => self.log(
                ctx,
                ConsoleLevel::Warn,
                format!("Cannot rename {path} to {new_path}: destination already exists."),
            ),
            _ => self.log(
                ctx,
                ConsoleLevel::Warn,
                format!("Cannot rename {path} to {new_path:?}."),
            ),
        }
        outcome
    }

    // --- view toggles and output ---

    /// Switches the output view.
    pub fn set_output_tab(&mut self, tab: OutputTab) {
        self.active_output_tab = tab;
    }

    /// Switches the side panel.
    pub fn set_side_tab(&mut self, tab: SideTab) {
        self.active_side_tab = tab;
    }

    /// Enters or leaves fullscreen preview. Entering also reveals the panel.
    pub fn set_preview_fullscreen(&mut self, fullscreen: bool) {
        self.is_preview_fullscreen = fullscreen;
        if fullscreen {
            self.show_output_panel = true;
        }
    }

    /// Shows or hides the output panel.
    pub fn toggle_output_panel(&mut self) {
        self.show_output_panel = !self.show_output_panel;
    }

    /// Replaces the terminal output.
    pub fn set_terminal_output(&mut self, output: impl Into<String>) {
        self.terminal_output = output.into();
    }

    /// Sets the inline error.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Clears the inline error.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    // --- console ---

    /// Appends a console entry stamped by the context clock.
    pub fn log(&mut self, ctx: &ServiceContext, level: ConsoleLevel, message: impl Into<String>) {
        self.console.push(ctx.clock.now(), level, message);
    }

    /// Ingests a message posted by the preview bridge.
    pub fn accept_preview_message(&mut self, ctx: &ServiceContext, raw: &str) -> bool {
        self.console.accept_preview_message(ctx.clock.now(), raw)
    }

    /// Empties the console.
    pub fn clear_console(&mut self) {
        self.console.clear();
    }
}
