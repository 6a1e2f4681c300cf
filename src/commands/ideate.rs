//! `workshop ideate` command.

use std::cell::RefCell;

use super::block_on;
use crate::context::ServiceContext;
use crate::workshop::pipeline::{self, Commit};
use crate::workshop::Workshop;

/// Execute the `ideate` command.
///
/// Stores the new goal (when given) and asks the model for a blueprint,
/// which is printed for review.
///
/// # Errors
///
/// Returns an error string if the goal is empty or blueprint generation fails.
pub fn run(ctx: &ServiceContext, ws: &RefCell<Workshop>, goal: Option<&str>) -> Result<(), String> {
    if let Some(goal) = goal {
        ws.borrow_mut().state.set_goal(goal);
    }

    let commit = block_on(pipeline::generate_blueprint(ctx, ws))?.map_err(|e| e.to_string())?;
    if commit == Commit::Skipped {
        return Err("The goal is empty. Pass one: workshop ideate \"<goal>\"".to_string());
    }

    let w = ws.borrow();
    if let Some(blueprint) = w.state.blueprint() {
        println!("Blueprint for {} ({}):", blueprint.project_name, blueprint.project_type);
        println!("{}", w.state.blueprint_text());
        println!("\nReview it, then run `workshop blueprint approve`.");
    }
    Ok(())
}
