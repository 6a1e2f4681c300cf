//! `workshop chat` and `workshop apply-code` commands.

use std::cell::RefCell;

use super::block_on;
use crate::context::ServiceContext;
use crate::ports::ChatRole;
use crate::workshop::chat::code_blocks;
use crate::workshop::pipeline::{self, Commit};
use crate::workshop::Workshop;

/// Execute the `chat` command.
///
/// Sends the message and prints the completed reply. A proposed action plan
/// is printed with the commands that apply or discard it.
///
/// # Errors
///
/// Returns an error string if the project is not in the build stage or the
/// reply stream fails.
pub fn run(ctx: &ServiceContext, ws: &RefCell<Workshop>, message: &str) -> Result<(), String> {
    let commit = block_on(pipeline::send_chat_message(ctx, ws, message))?.map_err(|e| e.to_string())?;
    if commit == Commit::Skipped {
        return Err("Nothing to send.".to_string());
    }

    let w = ws.borrow();
    let Some(reply) = w.chat.messages().last().filter(|m| m.role == ChatRole::Model) else {
        return Ok(());
    };
    println!("{}", reply.text);
    if let Some(plan) = reply.proposed_plan.as_ref().filter(|_| reply.has_pending_plan()) {
        println!("\nProposed plan: {}", plan.thought);
        for op in &plan.operations {
            println!("  {op}");
        }
        println!("Run `workshop plan apply` or `workshop plan discard`.");
    }
    let blocks = code_blocks(&reply.text).len();
    if blocks > 0 {
        println!("\n{blocks} code block(s); `workshop apply-code <N>` copies one into the selected file.");
    }
    Ok(())
}

/// Execute the `apply-code` command: copy code block `index` (1-based) of
/// the latest model reply into the selected file.
///
/// # Errors
///
/// Returns an error string if there is no such block or no selected file.
pub fn apply_code(ctx: &ServiceContext, ws: &RefCell<Workshop>, index: usize) -> Result<(), String> {
    let mut w = ws.borrow_mut();
    let reply = w
        .chat
        .messages()
        .iter()
        .rev()
        .find(|m| m.role == ChatRole::Model)
        .ok_or("The AI has not replied yet.")?;
    let blocks = code_blocks(&reply.text);
    let block = index
        .checked_sub(1)
        .and_then(|i| blocks.get(i))
        .ok_or_else(|| format!("The latest reply has {} code block(s); there is no block {index}.", blocks.len()))?
        .clone();

    w.state.apply_snippet(ctx, &block.code).map_err(|e| e.to_string())?;
    w.refresh_preview(ctx);
    let path = w.state.selected_file_name().unwrap_or_default();
    println!("Applied code block {index} to {path}.");
    Ok(())
}
