//! Async orchestration of the model-backed workshop operations.
//!
//! Every operation runs in three steps: dispatch (claim a slot ticket and
//! build the request under a short borrow), await the model, then commit
//! (re-borrow, check the ticket still belongs to the current session, and
//! mutate). No `RefCell` borrow is ever held across an `.await`, so the
//! workshop stays usable while a call is in flight.

use std::cell::RefCell;
use std::sync::LazyLock;

use futures::StreamExt;
use regex::Regex;

use super::blueprint::{blueprint_prompt, blueprint_schema, Blueprint};
use super::chat::{system_instruction, turn_prompt};
use super::console::ConsoleLevel;
use super::preview::ReferenceScheme;
use super::stage::{BuildStage, OutputTab};
use super::state::{extension, is_runnable, Slot, Ticket};
use super::Workshop;
use crate::context::ServiceContext;
use crate::error::WorkshopError;
use crate::ports::{ChatRequest, ExecutionRequest, Sampling, StructuredRequest, TextRequest};

/// System instruction for per-file code generation.
pub const FILE_SYSTEM_INSTRUCTION: &str = "You are an expert software engineer.";

/// Near-deterministic sampling for per-file code generation.
pub const FILE_SAMPLING: Sampling = Sampling { temperature: 0.1, top_k: 1, top_p: 1.0 };

/// Markdown fence wrapped around a whole response.
static SURROUNDING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```(?:\w+\n)?(.+)```$").expect("Invalid fence regex"));

/// How an operation's result was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Commit {
    /// The result was applied to the workshop.
    Applied,
    /// Nothing to do (empty input, busy chat, unsupported file type).
    Skipped,
    /// The workshop was reset while the call was in flight; the result was dropped.
    Stale,
}

/// Outcome of [`generate_all_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Files whose content was generated.
    pub generated: Vec<String>,
    /// Files that received an error placeholder.
    pub failed: Vec<String>,
    /// The workshop was reset before the batch finished.
    pub abandoned: bool,
}

/// Prompt asking for the raw content of one file.
#[must_use]
pub fn file_prompt(path: &str, description: &str) -> String {
    format!(
        "Based on the project blueprint, generate complete, production-ready code for the file: \
         {path}. File Description: {description}. IMPORTANT: Only output the raw code content \
         for the file. Do not include any explanatory text, markdown formatting like ```, or \
         anything that is not part of the file's content."
    )
}

/// Removes a markdown fence wrapped around the whole text, then trims.
#[must_use]
pub fn strip_fence(text: &str) -> String {
    let trimmed = text.trim();
    SURROUNDING_FENCE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |body| body.as_str())
        .trim()
        .to_string()
}

/// Language name passed to the execution simulator for an extension.
#[must_use]
pub fn language_for(ext: &str) -> &str {
    match ext {
        "js" => "javascript",
        "py" => "python",
        "ts" => "typescript",
        "sh" | "bash" => "bash",
        other => other,
    }
}

/// Generates a blueprint for the current goal.
///
/// Starts a new session (the goal is the only thing kept), clears the chat
/// and moves to blueprint review on success. An empty goal is skipped.
///
/// # Errors
///
/// Returns [`WorkshopError::Busy`] while another blueprint is generating, or
/// the model/parse failure (also recorded as the inline error).
pub async fn generate_blueprint(
    ctx: &ServiceContext,
    ws: &RefCell<Workshop>,
) -> Result<Commit, WorkshopError> {
    let (ticket, request) = {
        let mut w = ws.borrow_mut();
        let goal = w.state.goal().trim().to_string();
        if goal.is_empty() {
            return Ok(Commit::Skipped);
        }
        if w.state.is_busy(Slot::Blueprint) {
            return Err(WorkshopError::Busy(Slot::Blueprint));
        }
        w.reset(ctx);
        w.state.log(ctx, ConsoleLevel::Info, "Starting project generation...");
        let ticket = w.state.begin(Slot::Blueprint)?;
        (ticket, StructuredRequest { prompt: blueprint_prompt(&goal), schema: blueprint_schema() })
    };

    let result = ctx.llm.generate_structured(&request).await;

    let mut w = ws.borrow_mut();
    if !w.state.finish(&ticket) {
        return Ok(Commit::Stale);
    }
    let blueprint = result
        .map_err(|e| WorkshopError::Llm(e.to_string()))
        .and_then(|text| Blueprint::parse(&text));
    match blueprint {
        Ok(blueprint) => {
            tracing::info!(project = %blueprint.project_name, files = blueprint.files.len(), "blueprint generated");
            w.state.accept_blueprint(ctx, blueprint)?;
            Ok(Commit::Applied)
        }
        Err(e) => {
            w.state.set_error(e.to_string());
            w.state.log(ctx, ConsoleLevel::Error, e.to_string());
            Err(e)
        }
    }
}

/// Generates the content of one file.
///
/// # Errors
///
/// Returns a stage error outside the build, [`WorkshopError::NotFound`] for
/// an unknown path, [`WorkshopError::Busy`] while files are generating, or
/// the model failure.
pub async fn generate_file(
    ctx: &ServiceContext,
    ws: &RefCell<Workshop>,
    path: &str,
) -> Result<Commit, WorkshopError> {
    let ticket = {
        let mut w = ws.borrow_mut();
        w.state.require_stage(BuildStage::Build)?;
        if !w.state.files().contains(path) {
            return Err(WorkshopError::NotFound(path.to_string()));
        }
        w.state.begin(Slot::FileGeneration)?
    };

    let result = fill_file(ctx, ws, &ticket, path).await;
    if ws.borrow_mut().state.finish(&ticket) {
        result
    } else {
        Ok(Commit::Stale)
    }
}

/// Generates every blueprint file in order, one request at a time.
///
/// The store is updated after each file. A failed file gets an error
/// placeholder as its content and the batch moves on.
///
/// # Errors
///
/// Returns a stage error outside the build or [`WorkshopError::Busy`] while
/// files are generating.
pub async fn generate_all_files(
    ctx: &ServiceContext,
    ws: &RefCell<Workshop>,
) -> Result<BatchReport, WorkshopError> {
    let (ticket, paths) = {
        let mut w = ws.borrow_mut();
        w.state.require_stage(BuildStage::Build)?;
        let paths: Vec<String> = w
            .state
            .blueprint()
            .map(|b| b.files.iter().map(|f| f.file_name.clone()).collect())
            .unwrap_or_default();
        (w.state.begin(Slot::FileGeneration)?, paths)
    };

    let mut report = BatchReport::default();
    for path in paths {
        if !ws.borrow().state.files().contains(&path) {
            continue;
        }
        match fill_file(ctx, ws, &ticket, &path).await {
            Ok(Commit::Stale) => {
                report.abandoned = true;
                break;
            }
            Ok(_) => report.generated.push(path),
            Err(e) => {
                let mut w = ws.borrow_mut();
                let placeholder = format!("Error generating content for {path}: {e}");
                w.state.set_content(ctx, &path, placeholder)?;
                w.refresh_preview(ctx);
                report.failed.push(path);
            }
        }
    }

    let mut w = ws.borrow_mut();
    if !w.state.finish(&ticket) {
        report.abandoned = true;
        return Ok(report);
    }
    w.state.log(
        ctx,
        ConsoleLevel::Info,
        format!(
            "Generated {} file(s), {} failed.",
            report.generated.len(),
            report.failed.len()
        ),
    );
    Ok(report)
}

/// Requests and commits the content of `path` under an already claimed ticket.
async fn fill_file(
    ctx: &ServiceContext,
    ws: &RefCell<Workshop>,
    ticket: &Ticket,
    path: &str,
) -> Result<Commit, WorkshopError> {
    let request = {
        let mut w = ws.borrow_mut();
        let description =
            w.state.files().get(path).map(|f| f.description.clone()).unwrap_or_default();
        w.state.log(ctx, ConsoleLevel::Info, format!("Generating code for {path}..."));
        TextRequest {
            prompt: file_prompt(path, &description),
            system_instruction: FILE_SYSTEM_INSTRUCTION.to_string(),
            sampling: FILE_SAMPLING,
        }
    };

    let result = ctx.llm.generate_text(&request).await;

    let mut w = ws.borrow_mut();
    if !w.state.is_current(ticket) {
        tracing::debug!(path, "dropping generated file of an abandoned session");
        return Ok(Commit::Stale);
    }
    match result {
        Ok(text) => {
            w.state.set_content(ctx, path, strip_fence(&text))?;
            w.refresh_preview(ctx);
            w.state.log(ctx, ConsoleLevel::Info, format!("Code for {path} generated successfully."));
            Ok(Commit::Applied)
        }
        Err(e) => {
            w.state.log(
                ctx,
                ConsoleLevel::Error,
                format!("Error generating code for {path}: {e}"),
            );
            Err(WorkshopError::Llm(e.to_string()))
        }
    }
}

/// Sends one message to the pair programmer and streams the reply.
///
/// Empty messages and messages sent while a reply is streaming are skipped.
/// A plan found in the completed reply is attached for approval, never
/// applied.
///
/// # Errors
///
/// Returns a stage error outside the build, or the stream failure (the
/// reply then reads "Sorry, an error occurred.").
pub async fn send_chat_message(
    ctx: &ServiceContext,
    ws: &RefCell<Workshop>,
    text: &str,
) -> Result<Commit, WorkshopError> {
    let (ticket, request, index) = {
        let mut w = ws.borrow_mut();
        if text.trim().is_empty() || w.state.is_busy(Slot::Chat) {
            return Ok(Commit::Skipped);
        }
        w.state.require_stage(BuildStage::Build)?;
        let ticket = w.state.begin(Slot::Chat)?;
        let request = ChatRequest {
            system_instruction: system_instruction(w.state.blueprint(), w.state.files()),
            history: w.chat.history(),
            message: turn_prompt(w.state.selected_file_name(), text),
        };
        w.chat.push_user(text);
        let index = w.chat.begin_model_reply();
        (ticket, request, index)
    };

    let mut stream = ctx.llm.stream_chat(&request);
    while let Some(item) = stream.next().await {
        let mut w = ws.borrow_mut();
        if !w.state.is_current(&ticket) {
            tracing::debug!("dropping chat stream of an abandoned session");
            return Ok(Commit::Stale);
        }
        match item {
            Ok(chunk) => w.chat.append_chunk(index, &chunk),
            Err(e) => {
                w.chat.fail_reply(index);
                w.state.log(ctx, ConsoleLevel::Error, format!("Chat error: {e}"));
                w.state.finish(&ticket);
                return Err(WorkshopError::Llm(e.to_string()));
            }
        }
    }

    let mut w = ws.borrow_mut();
    if !w.state.finish(&ticket) {
        return Ok(Commit::Stale);
    }
    if let Some(parsed) = w.chat.finish_reply(index) {
        if let Some(diagnostic) = parsed.diagnostic {
            w.state.log(
                ctx,
                ConsoleLevel::Warn,
                format!("Could not read the proposed action plan: {diagnostic}"),
            );
        }
        if let Some(plan) = parsed.reply.plan() {
            let count = plan.operations.len();
            w.state.log(
                ctx,
                ConsoleLevel::Info,
                format!("The AI proposed {count} file operation(s). Review the plan to apply or discard it."),
            );
        }
    }
    Ok(Commit::Applied)
}

/// Runs the selected file: HTML refreshes the preview, scripts are sent to
/// the execution simulator, anything else is refused with a warning.
///
/// # Errors
///
/// Returns a stage error outside the build, [`WorkshopError::NoSelection`],
/// [`WorkshopError::Busy`] while a run is in flight, or the simulator
/// failure (also written to the terminal).
pub async fn run_selected(
    ctx: &ServiceContext,
    ws: &RefCell<Workshop>,
) -> Result<Commit, WorkshopError> {
    let (ticket, request, path) = {
        let mut w = ws.borrow_mut();
        w.state.require_stage(BuildStage::Build)?;
        let file = w.state.selected_file().cloned().ok_or(WorkshopError::NoSelection)?;
        let path = file.file_name;
        let ext = extension(&path).unwrap_or_default().to_string();

        if ext == "html" {
            w.state.set_output_tab(OutputTab::Preview);
            w.render_preview(ctx, ReferenceScheme::Blob);
            w.state.log(ctx, ConsoleLevel::Info, format!("Refreshing preview for {path}."));
            return Ok(Commit::Applied);
        }
        if !is_runnable(&path) {
            w.state.log(
                ctx,
                ConsoleLevel::Warn,
                format!(
                    "Cannot run file type: .{ext}. Only web previews and script execution are supported."
                ),
            );
            return Ok(Commit::Skipped);
        }

        let ticket = w.state.begin(Slot::Run)?;
        w.state.set_output_tab(OutputTab::Terminal);
        w.state.set_terminal_output("");
        w.state.log(ctx, ConsoleLevel::Info, format!("Simulating execution for {path}..."));
        let request =
            ExecutionRequest { code: file.content, language: language_for(&ext).to_string() };
        (ticket, request, path)
    };

    let result = ctx.llm.simulate_execution(&request).await;

    let mut w = ws.borrow_mut();
    if !w.state.finish(&ticket) {
        return Ok(Commit::Stale);
    }
    match result {
        Ok(output) => {
            w.state.set_terminal_output(output);
            w.state.log(ctx, ConsoleLevel::Info, format!("Execution of {path} simulated."));
            Ok(Commit::Applied)
        }
        Err(e) => {
            let message = format!("Failed to simulate execution: {e}");
            w.state.set_terminal_output(message.clone());
            w.state.log(ctx, ConsoleLevel::Error, message);
            Err(WorkshopError::Llm(e.to_string()))
        }
    }
}
