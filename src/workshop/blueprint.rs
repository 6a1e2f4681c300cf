//! Blueprint model: the declarative plan for a generated project.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::WorkshopError;

/// One planned file of a blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintFile {
    /// Relative path, `/`-separated.
    pub file_name: String,
    /// What the file should contain.
    pub description: String,
}

/// A project blueprint as produced by the model and reviewed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    /// File-system-safe project identifier.
    pub project_name: String,
    /// Kind of project (e.g. "Python Flask API").
    pub project_type: String,
    /// One-sentence summary.
    pub description: String,
    /// Key technologies.
    #[serde(default)]
    pub tech_stack: Vec<String>,
    /// Files to generate, in order.
    pub files: Vec<BlueprintFile>,
}

impl Blueprint {
    /// Parses and validates blueprint JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`WorkshopError::BlueprintParse`] when the text is not valid
    /// JSON, misses required fields, or lists an empty or duplicate file name.
    pub fn parse(text: &str) -> Result<Self, WorkshopError> {
        let blueprint: Self =
            serde_json::from_str(text).map_err(|e| WorkshopError::BlueprintParse(e.to_string()))?;
        blueprint.validate()?;
        Ok(blueprint)
    }

    fn validate(&self) -> Result<(), WorkshopError> {
        let mut seen = HashSet::new();
        for file in &self.files {
            if file.file_name.trim().is_empty() {
                return Err(WorkshopError::BlueprintParse("file name must not be empty".into()));
            }
            if !seen.insert(file.file_name.as_str()) {
                return Err(WorkshopError::BlueprintParse(format!(
                    "duplicate file name {:?}",
                    file.file_name
                )));
            }
        }
        Ok(())
    }

    /// Pretty JSON (2-space indent) shown in the blueprint editor.
    #[must_use]
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Looks up a planned file by name.
    #[must_use]
    pub fn file(&self, file_name: &str) -> Option<&BlueprintFile> {
        self.files.iter().find(|f| f.file_name == file_name)
    }
}

/// Builds the blueprint generation prompt for a goal.
#[must_use]
pub fn blueprint_prompt(goal: &str) -> String {
    format!(
        "Generate a project blueprint for the following request: \"{goal}\". \
         The project should be self-contained and runnable where possible. \
         For web UIs, prioritize a single 'index.html' file with embedded CSS and JS. \
         For backend apps (e.g., Python, Node.js), include a main runnable file \
         (like app.py or index.js), a README.md explaining how to run it, and any \
         necessary config files (like requirements.txt or package.json)."
    )
}

/// Response schema constraining blueprint generation.
#[must_use]
pub fn blueprint_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "projectName": {
                "type": "STRING",
                "description": "A short, file-system-friendly name for the project (e.g., \"my-weather-api\")."
            },
            "projectType": {
                "type": "STRING",
                "description": "The type of project (e.g., \"Python Flask API\", \"React Web App\", \"Node.js Script\")."
            },
            "description": {
                "type": "STRING",
                "description": "A one-sentence summary of the project."
            },
            "techStack": {
                "type": "ARRAY",
                "description": "A list of key technologies used.",
                "items": { "type": "STRING" }
            },
            "files": {
                "type": "ARRAY",
                "description": "The list of files to be generated for this project.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "fileName": {
                            "type": "STRING",
                            "description": "The name of the file (e.g., \"app.py\", \"package.json\")."
                        },
                        "description": {
                            "type": "STRING",
                            "description": "A detailed description of the file's purpose and what code it should contain."
                        }
                    },
                    "required": ["fileName", "description"]
                }
            }
        },
        "required": ["projectName", "projectType", "description", "files"]
    })
}
