//! `workshop plan` command.

use std::cell::RefCell;

use crate::cli::PlanAction;
use crate::context::ServiceContext;
use crate::workshop::{PlanStatus, Workshop};

/// Execute the `plan` command.
///
/// Message numbers are 1-based positions in the chat log.
///
/// # Errors
///
/// Returns an error string when no matching plan awaits approval, or when
/// applying outside the build stage.
pub fn run(ctx: &ServiceContext, ws: &RefCell<Workshop>, action: &PlanAction) -> Result<(), String> {
    match action {
        PlanAction::Show => show(ws),
        PlanAction::Apply(target) => {
            let index = to_index(target.message)?;
            let report = ws
                .borrow_mut()
                .resolve_plan(ctx, index, PlanStatus::Applied)
                .map_err(|e| e.to_string())?;
            if let Some(report) = report {
                println!(
                    "Plan applied: {} operation(s) applied, {} skipped.",
                    report.applied, report.skipped
                );
            }
            Ok(())
        }
        PlanAction::Discard(target) => {
            let index = to_index(target.message)?;
            ws.borrow_mut()
                .resolve_plan(ctx, index, PlanStatus::Discarded)
                .map_err(|e| e.to_string())?;
            println!("Plan discarded.");
            Ok(())
        }
    }
}

fn to_index(message: Option<usize>) -> Result<Option<usize>, String> {
    message
        .map(|n| n.checked_sub(1).ok_or_else(|| "Message numbers start at 1.".to_string()))
        .transpose()
}

fn show(ws: &RefCell<Workshop>) -> Result<(), String> {
    let w = ws.borrow();
    let mut pending = 0;
    for (i, message) in w.chat.messages().iter().enumerate() {
        let Some(plan) = message.proposed_plan.as_ref().filter(|_| message.has_pending_plan()) else {
            continue;
        };
        pending += 1;
        println!("message {}: {}", i + 1, plan.thought);
        for op in &plan.operations {
            println!("  {op}");
        }
    }
    if pending == 0 {
        println!("No action plan awaiting approval.");
    }
    Ok(())
}
