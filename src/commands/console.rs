//! `workshop console` command.

use std::cell::RefCell;
use std::io::Read;
use std::path::Path;

use chrono::DateTime;

use crate::context::ServiceContext;
use crate::workshop::console::{ConsoleLevel, ConsoleMessage};
use crate::workshop::Workshop;

/// Execute the `console` command: print the log, most recent first, clear
/// it, or ingest preview bridge messages.
///
/// # Errors
///
/// Returns an error string if the ingest source cannot be read.
pub fn run(
    ctx: &ServiceContext,
    ws: &RefCell<Workshop>,
    clear: bool,
    ingest: Option<&Path>,
) -> Result<(), String> {
    if clear {
        ws.borrow_mut().state.clear_console();
        println!("Console cleared.");
        return Ok(());
    }
    if let Some(source) = ingest {
        let raw = read_source(ctx, source)?;
        let (accepted, ignored) = ingest_lines(ctx, ws, &raw);
        println!("Ingested {accepted} preview message(s), ignored {ignored}.");
        return Ok(());
    }

    let w = ws.borrow();
    let entries = w.state.console().entries();
    if entries.is_empty() {
        println!("Console is empty.");
    }
    for entry in entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}

fn read_source(ctx: &ServiceContext, source: &Path) -> Result<String, String> {
    if source == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .map_err(|e| format!("Failed to read stdin: {e}"))?;
        return Ok(raw);
    }
    ctx.fs
        .read_to_string(source)
        .map_err(|e| format!("Failed to read {}: {e}", source.display()))
}

/// Feeds each non-blank line through the preview bridge filter; returns
/// (accepted, ignored).
fn ingest_lines(ctx: &ServiceContext, ws: &RefCell<Workshop>, raw: &str) -> (usize, usize) {
    let mut w = ws.borrow_mut();
    let (mut accepted, mut ignored) = (0, 0);
    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if w.state.accept_preview_message(ctx, line) {
            accepted += 1;
        } else {
            tracing::debug!(line, "ignoring message that did not come from the preview bridge");
            ignored += 1;
        }
    }
    (accepted, ignored)
}

fn format_entry(entry: &ConsoleMessage) -> String {
    let time = DateTime::from_timestamp_millis(entry.id)
        .map_or_else(|| entry.id.to_string(), |t| t.format("%H:%M:%S").to_string());
    let level = match entry.level {
        ConsoleLevel::Log => "LOG",
        ConsoleLevel::Error => "ERROR",
        ConsoleLevel::Info => "INFO",
        ConsoleLevel::Warn => "WARN",
    };
    format!("[{time}] {level:<5} {}", entry.message)
}
