//! File commands: `files`, `select`, `edit`, `create`, `delete`, `rename`.

use std::cell::RefCell;
use std::path::Path;

use super::report;
use crate::context::ServiceContext;
use crate::workshop::{FileTreeNode, Workshop};

/// Execute the `files` command: print the project tree.
///
/// # Errors
///
/// Returns an error string when there is no project yet.
pub fn tree(ws: &RefCell<Workshop>) -> Result<(), String> {
    let w = ws.borrow();
    if w.state.files().is_empty() {
        return Err("No project files. Approve a blueprint first.".to_string());
    }
    let selected = w.state.selected_file_name();
    for line in render_tree(&w.state.files().tree(), selected) {
        println!("{line}");
    }
    Ok(())
}

/// Execute the `select` command.
///
/// # Errors
///
/// Returns an error string when the path is not in the project.
pub fn select(ctx: &ServiceContext, ws: &RefCell<Workshop>, path: &str) -> Result<(), String> {
    let mut w = ws.borrow_mut();
    if !w.state.select_file(ctx, path) {
        return Err(format!("No such file: {path}"));
    }
    println!("Selected {path} ({} view).", tab_name(&w));
    Ok(())
}

/// Execute the `edit` command.
///
/// # Errors
///
/// Returns an error string if the source cannot be read or the project is
/// not in the build stage.
pub fn edit(ctx: &ServiceContext, ws: &RefCell<Workshop>, path: &str, from: &Path) -> Result<(), String> {
    let content = read_source(ctx, from)?;
    let outcome = ws.borrow_mut().state.set_content(ctx, path, content).map_err(|e| e.to_string())?;
    report(ctx, ws, outcome, &format!("Updated {path}."));
    Ok(())
}

/// Execute the `create` command.
///
/// # Errors
///
/// Returns an error string if the source cannot be read or the project is
/// not in the build stage.
pub fn create(
    ctx: &ServiceContext,
    ws: &RefCell<Workshop>,
    path: &str,
    from: Option<&Path>,
) -> Result<(), String> {
    let content = from.map(|f| read_source(ctx, f)).transpose()?.unwrap_or_default();
    let outcome = ws.borrow_mut().state.create_file(ctx, path, content).map_err(|e| e.to_string())?;
    report(ctx, ws, outcome, &format!("Created {path}."));
    Ok(())
}

/// Execute the `delete` command.
///
/// # Errors
///
/// Returns an error string if the project is not in the build stage.
pub fn delete(ctx: &ServiceContext, ws: &RefCell<Workshop>, path: &str) -> Result<(), String> {
    let outcome = ws.borrow_mut().state.delete_file(ctx, path).map_err(|e| e.to_string())?;
    report(ctx, ws, outcome, &format!("Deleted {path}."));
    Ok(())
}

/// Execute the `rename` command.
///
/// # Errors
///
/// Returns an error string if the project is not in the build stage.
pub fn rename(
    ctx: &ServiceContext,
    ws: &RefCell<Workshop>,
    path: &str,
    new_path: &str,
) -> Result<(), String> {
    let outcome =
        ws.borrow_mut().state.rename_file(ctx, path, new_path).map_err(|e| e.to_string())?;
    report(ctx, ws, outcome, &format!("Renamed {path} to {new_path}."));
    Ok(())
}

fn read_source(ctx: &ServiceContext, from: &Path) -> Result<String, String> {
    ctx.fs.read_to_string(from).map_err(|e| format!("Failed to read {}: {e}", from.display()))
}

fn tab_name(w: &Workshop) -> &'static str {
    match w.state.active_output_tab() {
        crate::workshop::OutputTab::Preview => "preview",
        crate::workshop::OutputTab::Terminal => "terminal",
    }
}

/// Indented tree lines; the selected file is marked with `*`.
fn render_tree(nodes: &[FileTreeNode], selected: Option<&str>) -> Vec<String> {
    fn walk(nodes: &[FileTreeNode], depth: usize, selected: Option<&str>, out: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        for node in nodes {
            match node {
                FileTreeNode::Directory { name, children, .. } => {
                    out.push(format!("  {indent}{name}/"));
                    walk(children, depth + 1, selected, out);
                }
                FileTreeNode::File { name, path } => {
                    let mark = if selected == Some(path.as_str()) { '*' } else { ' ' };
                    out.push(format!("{mark} {indent}{name}"));
                }
            }
        }
    }

    let mut out = Vec::new();
    walk(nodes, 0, selected, &mut out);
    out
}
