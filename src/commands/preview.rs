//! `workshop preview` command.

use std::cell::RefCell;
use std::path::Path;

use crate::context::ServiceContext;
use crate::workshop::console::ConsoleLevel;
use crate::workshop::{OutputTab, Preview, ReferenceScheme, Workshop};

/// Execute the `preview` command.
///
/// Without `out`, renders the entry point and lists the references minted
/// for it. With `out`, writes a standalone document whose resources are
/// inlined as data URLs.
///
/// # Errors
///
/// Returns an error string if the document cannot be written.
pub fn run(ctx: &ServiceContext, ws: &RefCell<Workshop>, out: Option<&Path>) -> Result<(), String> {
    let scheme = if out.is_some() { ReferenceScheme::DataUrl } else { ReferenceScheme::Blob };
    let mut w = ws.borrow_mut();
    w.state.set_output_tab(OutputTab::Preview);

    let (entry_point, html) = match w.render_preview(ctx, scheme) {
        Preview::Placeholder(notice) => {
            println!("{notice}");
            return Ok(());
        }
        Preview::Document { entry_point, html } => (entry_point, html),
    };

    match out {
        Some(path) => {
            ctx.fs
                .write(path, &html)
                .map_err(|e| format!("Failed to write preview {}: {e}", path.display()))?;
            w.state.log(
                ctx,
                ConsoleLevel::Info,
                format!("Preview of {entry_point} exported to {}.", path.display()),
            );
            println!("Wrote preview of {entry_point} to {}.", path.display());
        }
        None => {
            println!("Preview of {entry_point} ({} bytes).", html.len());
            let mut resources: Vec<_> = w.preview.pool().iter().collect();
            resources.sort_by(|a, b| a.1.path.cmp(&b.1.path));
            for (url, resource) in resources {
                println!("  {url}  {}  {}", resource.path, resource.content_type);
            }
        }
    }
    Ok(())
}
