//! `workshop blueprint` command.

use std::cell::RefCell;

use crate::cli::BlueprintAction;
use crate::context::ServiceContext;
use crate::workshop::{BuildStage, Workshop};

/// Execute the `blueprint` command.
///
/// # Errors
///
/// Returns an error string if the action is not allowed in the current
/// stage, the file cannot be read, or the blueprint does not validate.
pub fn run(ctx: &ServiceContext, ws: &RefCell<Workshop>, action: &BlueprintAction) -> Result<(), String> {
    match action {
        BlueprintAction::Show => show(ws),
        BlueprintAction::Load { file } => {
            let text = ctx
                .fs
                .read_to_string(file)
                .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
            ws.borrow_mut().state.edit_blueprint_text(text).map_err(|e| e.to_string())?;
            println!("Blueprint text replaced from {}.", file.display());
            Ok(())
        }
        BlueprintAction::Approve => {
            let mut w = ws.borrow_mut();
            w.state.approve_blueprint(ctx).map_err(|e| e.to_string())?;
            let name = w.state.blueprint().map(|b| b.project_name.clone()).unwrap_or_default();
            println!("Project \"{name}\" scaffolded with {} file(s).", w.state.files().len());
            if let Some(selected) = w.state.selected_file_name() {
                println!("Selected {selected}.");
            }
            Ok(())
        }
    }
}

fn show(ws: &RefCell<Workshop>) -> Result<(), String> {
    let w = ws.borrow();
    if w.state.stage() == BuildStage::Ideation {
        return Err("No blueprint yet. Run `workshop ideate` first.".to_string());
    }
    println!("{}", w.state.blueprint_text());
    Ok(())
}
