//! Build stages and view toggles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a workshop build.
///
/// Stages only move forward (`ideation` → `blueprint_review` → `build`);
/// the way back is a full reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    /// Collecting a free-text goal.
    #[default]
    Ideation,
    /// The generated blueprint is open for editing.
    BlueprintReview,
    /// Files, editor, chat and output are active.
    Build,
}

impl BuildStage {
    /// The stage that follows this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Ideation => Some(Self::BlueprintReview),
            Self::BlueprintReview => Some(Self::Build),
            Self::Build => None,
        }
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ideation => "ideation",
            Self::BlueprintReview => "blueprint_review",
            Self::Build => "build",
        };
        f.write_str(name)
    }
}

/// Which output view is shown in the build stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTab {
    /// Live preview of the entry point.
    #[default]
    Preview,
    /// Terminal output from simulated runs.
    Terminal,
}

/// Which side panel is shown next to the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideTab {
    /// Pair-programmer chat.
    #[default]
    Chat,
    /// Console log.
    Console,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_order() {
        assert_eq!(BuildStage::Ideation.next(), Some(BuildStage::BlueprintReview));
        assert_eq!(BuildStage::BlueprintReview.next(), Some(BuildStage::Build));
        assert_eq!(BuildStage::Build.next(), None);
    }

    #[test]
    fn stage_serializes_as_snake_case() {
        let json = serde_json::to_string(&BuildStage::BlueprintReview).unwrap();
        assert_eq!(json, "\"blueprint_review\"");
        assert_eq!(BuildStage::BlueprintReview.to_string(), "blueprint_review");
    }
}
