//! `workshop reset` command.

use std::cell::RefCell;

use crate::context::ServiceContext;
use crate::workshop::Workshop;

/// Execute the `reset` command: start over, keeping only the goal.
///
/// # Errors
///
/// This command does not fail.
pub fn run(ctx: &ServiceContext, ws: &RefCell<Workshop>) -> Result<(), String> {
    let mut w = ws.borrow_mut();
    w.reset(ctx);
    println!("Workshop reset. Goal kept: {}", w.state.goal());
    Ok(())
}
