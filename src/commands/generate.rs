//! `workshop generate` command.

use std::cell::RefCell;

use super::block_on;
use crate::context::ServiceContext;
use crate::workshop::pipeline::{self, Commit};
use crate::workshop::Workshop;

const STALE_NOTICE: &str = "The workshop was reset during generation; the result was dropped.";

/// Execute the `generate` command.
///
/// Generates one file when `path` is given, otherwise every blueprint file
/// in order. A batch keeps going past failed files.
///
/// # Errors
///
/// Returns an error string if the project is not in the build stage, the
/// path is unknown, the single-file request fails, or any file in a batch
/// failed.
pub fn run(ctx: &ServiceContext, ws: &RefCell<Workshop>, path: Option<&str>) -> Result<(), String> {
    if let Some(path) = path {
        let commit = block_on(pipeline::generate_file(ctx, ws, path))?.map_err(|e| e.to_string())?;
        println!("{}", single_file_message(path, commit));
        return Ok(());
    }

    let report = block_on(pipeline::generate_all_files(ctx, ws))?.map_err(|e| e.to_string())?;
    if report.abandoned {
        println!("{STALE_NOTICE}");
    }
    for path in &report.generated {
        println!("generated  {path}");
    }
    for path in &report.failed {
        println!("failed     {path}");
    }
    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(format!("{} file(s) could not be generated; see `workshop console`.", report.failed.len()))
    }
}

fn single_file_message(path: &str, commit: Commit) -> String {
    match commit {
        Commit::Applied => format!("Generated {path}."),
        Commit::Skipped => format!("Nothing to generate for {path}."),
        Commit::Stale => STALE_NOTICE.to_string(),
    }
}
