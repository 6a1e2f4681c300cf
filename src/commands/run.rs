//! `workshop run` command.

use std::cell::RefCell;

use super::block_on;
use crate::context::ServiceContext;
use crate::workshop::pipeline::{self, Commit};
use crate::workshop::{OutputTab, Workshop};

/// Execute the `run` command on the selected file.
///
/// HTML refreshes the preview; scripts print the simulated terminal output.
///
/// # Errors
///
/// Returns an error string when nothing is selected, the file type cannot
/// be run, or the simulation fails.
pub fn run(ctx: &ServiceContext, ws: &RefCell<Workshop>) -> Result<(), String> {
    let commit = block_on(pipeline::run_selected(ctx, ws))?.map_err(|e| e.to_string())?;

    let w = ws.borrow();
    if commit == Commit::Skipped {
        let reason = w.state.console().latest().map(|m| m.message.clone()).unwrap_or_default();
        return Err(reason);
    }
    match w.state.active_output_tab() {
        OutputTab::Terminal => println!("{}", w.state.terminal_output()),
        OutputTab::Preview => {
            let live = w.preview.pool().len();
            println!("Preview refreshed ({live} reference(s) live). Use `workshop preview --out <FILE>` to export it.");
        }
    }
    Ok(())
}

