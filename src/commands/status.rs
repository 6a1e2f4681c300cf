//! `workshop status` command.

use std::cell::RefCell;

use crate::store::WorkshopStore;
use crate::workshop::{OutputTab, Workshop};

/// Execute the `status` command.
///
/// # Errors
///
/// Returns an error string if the saved chat logs cannot be listed.
pub fn run(ws: &RefCell<Workshop>, store: &WorkshopStore<'_>) -> Result<(), String> {
    let w = ws.borrow();
    let state = &w.state;

    let mut rows: Vec<(&str, String)> = vec![
        ("Goal", state.goal().to_string()),
        ("Stage", state.stage().to_string()),
    ];
    if let Some(blueprint) = state.blueprint() {
        rows.push(("Project", format!("{} ({})", blueprint.project_name, blueprint.project_type)));
    }
    if !state.files().is_empty() {
        rows.push(("Files", state.files().len().to_string()));
        rows.push(("Selected", state.selected_file_name().unwrap_or("-").to_string()));
        let tab = match state.active_output_tab() {
            OutputTab::Preview => "preview",
            OutputTab::Terminal => "terminal",
        };
        rows.push(("Output", tab.to_string()));
    }
    rows.push(("Chat", format!("{} message(s)", w.chat.len())));
    if let Some(index) = w.chat.pending_plan_index() {
        rows.push(("Pending plan", format!("message {}", index + 1)));
    }
    rows.push(("Console", format!("{} entr(ies)", state.console().len())));
    if let Some(error) = state.error() {
        rows.push(("Error", error.to_string()));
    }
    let chats = store.saved_chats()?;
    if !chats.is_empty() {
        rows.push(("Saved chats", chats.join(", ")));
    }

    let width = rows.iter().map(|r| r.0.len()).max().unwrap_or(0);
    for (label, value) in &rows {
        println!("{label:<width$}  {value}");
    }
    Ok(())
}
