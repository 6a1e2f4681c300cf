//! Error taxonomy for workshop operations.

use thiserror::Error;

use crate::workshop::stage::BuildStage;
use crate::workshop::state::Slot;

/// Failures surfaced by workshop operations.
///
/// Reconciliation no-ops (create on an existing path, update of a missing
/// file, ...) are not errors; they are reported as console warnings.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WorkshopError {
    /// The generative model call failed.
    #[error("{0}")]
    Llm(String),

    /// Blueprint text did not parse or failed validation.
    #[error("Invalid blueprint JSON: {0}")]
    BlueprintParse(String),

    /// A proposed action plan did not parse.
    #[error("Could not parse action plan: {0}")]
    PlanParse(String),

    /// The operation is not allowed in the current build stage.
    #[error("operation requires stage {expected}, workshop is in {actual}")]
    InvalidStage {
        /// Stage the operation needs.
        expected: BuildStage,
        /// Stage the workshop is in.
        actual: BuildStage,
    },

    /// Another call into the same slot is still in flight.
    #[error("{0} is already in progress")]
    Busy(Slot),

    /// The operation needs a selected file.
    #[error("no file is selected")]
    NoSelection,

    /// A referenced file, message or plan does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}
