//! Command dispatch and handlers.
//!
//! Every command loads the workshop from the state directory, runs against
//! it, and saves it back (also when the command failed, so console entries
//! and inline errors are kept).

pub mod blueprint;
pub mod chat;
pub mod console;
pub mod files;
pub mod generate;
pub mod ideate;
pub mod plan;
pub mod preview;
pub mod reset;
pub mod run;
pub mod status;

use std::cell::RefCell;
use std::future::Future;

use crate::adapters::replaying::ReplayingLlmClient;
use crate::cassette::config::CassetteConfig;
use crate::cassette::session::RecordingSession;
use crate::cli::Command;
use crate::config::WorkshopConfig;
use crate::context::ServiceContext;
use crate::store::WorkshopStore;
use crate::workshop::{FileOutcome, Workshop};

/// Dispatch a parsed command to its handler.
///
/// When `WORKSHOP_RECORD` is set to a directory path, all port interactions
/// are recorded to per-port cassette files in a new session directory under
/// it. When `WORKSHOP_REPLAY` names a cassette file, model calls are served
/// from it.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    let config = WorkshopConfig::from_env();
    let (ctx, session) = match &config.record_dir {
        Some(dir) => {
            let (ctx, session) = ServiceContext::recording_at(&config, dir)?;
            (ctx, Some(session))
        }
        None => (ServiceContext::live(&config), None),
    };
    let ctx = match &config.replay_cassette {
        Some(path) => {
            let replayer = CassetteConfig::load_monolithic(path)?;
            ctx.with_llm(Box::new(ReplayingLlmClient::new(replayer)))
        }
        None => ctx,
    };

    let result = dispatch_with_context(command, &ctx, &config);

    // Finish recording after command completes (even on error)
    if let Some(session) = session {
        // Drop context first to release Arc references
        drop(ctx);
        finish_recording(session)?;
    }

    result
}

/// Dispatch a command with the given service context.
fn dispatch_with_context(
    command: &Command,
    ctx: &ServiceContext,
    config: &WorkshopConfig,
) -> Result<(), String> {
    let store = WorkshopStore::new(ctx, &config.home);
    let ws = RefCell::new(store.load_workshop()?);
    tracing::debug!(home = %config.home.display(), session = %ws.borrow().state.session_id(), "workshop loaded");

    let result = execute(command, ctx, &ws, &store);

    store.save_workshop(&ws.borrow())?;
    result
}

fn execute(
    command: &Command,
    ctx: &ServiceContext,
    ws: &RefCell<Workshop>,
    store: &WorkshopStore<'_>,
) -> Result<(), String> {
    match command {
        Command::Ideate { goal } => ideate::run(ctx, ws, goal.as_deref()),
        Command::Blueprint { action } => blueprint::run(ctx, ws, action),
        Command::Files => files::tree(ws),
        Command::Select { path } => files::select(ctx, ws, path),
        Command::Generate { path, all } => {
            generate::run(ctx, ws, if *all { None } else { path.as_deref() })
        }
        Command::Edit { path, from } => files::edit(ctx, ws, path, from),
        Command::Create { path, from } => files::create(ctx, ws, path, from.as_deref()),
        Command::Delete { path } => files::delete(ctx, ws, path),
        Command::Rename { path, new_path } => files::rename(ctx, ws, path, new_path),
        Command::Chat { message } => chat::run(ctx, ws, message),
        Command::Plan { action } => plan::run(ctx, ws, action),
        Command::ApplyCode { index } => chat::apply_code(ctx, ws, *index),
        Command::Preview { out } => preview::run(ctx, ws, out.as_deref()),
        Command::Run => run::run(ctx, ws),
        Command::Console { clear, ingest } => console::run(ctx, ws, *clear, ingest.as_deref()),
        Command::Status => status::run(ws, store),
        Command::Reset => reset::run(ctx, ws),
    }
}

/// Runs a future to completion on a single-threaded runtime.
///
/// # Errors
///
/// Returns an error if the runtime cannot be started.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;
    Ok(runtime.block_on(future))
}

/// Prints `done` for an applied store operation (re-rendering a live
/// preview first), or the warning the workshop logged for a no-op.
pub(crate) fn report(ctx: &ServiceContext, ws: &RefCell<Workshop>, outcome: FileOutcome, done: &str) {
    if outcome.is_applied() {
        ws.borrow_mut().refresh_preview(ctx);
        println!("{done}");
    } else if let Some(entry) = ws.borrow().state.console().latest() {
        println!("warning: {}", entry.message);
    }
}

/// Finish a recording session and print the output directory.
fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish()?;
    eprintln!("Recording saved to: {}", output_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_on_drives_a_future() {
        assert_eq!(block_on(async { 2 + 2 }).unwrap(), 4);
    }
}
