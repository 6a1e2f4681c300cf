//! Workshop store: persistence for the aggregate and the chat logs.
//!
//! The store uses the `FileSystem` port for all I/O. Directory layout:
//!
//! ```text
//! <root>/
//!   ├── digitalWorkshop_v6.json
//!   └── chat/
//!       └── <projectName|default>.json
//! ```
//!
//! A missing or unreadable document loads as its default, so a corrupt file
//! never locks the user out of their state directory.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::context::ServiceContext;
use crate::workshop::{ChatLog, Workshop, WorkshopState};

/// Namespace key of the persisted aggregate.
pub const STATE_KEY: &str = "digitalWorkshop_v6";

/// Chat log name used before a blueprint names the project.
pub const DEFAULT_CHAT: &str = "default";

/// Persistence layer for the workshop.
///
/// All I/O goes through `ctx.fs` so that the store works with live,
/// replaying, and recording adapters.
pub struct WorkshopStore<'a> {
    ctx: &'a ServiceContext,
    root: PathBuf,
}

impl<'a> WorkshopStore<'a> {
    /// Creates a new store rooted at the given path.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, root: &Path) -> Self {
        Self { ctx, root: root.to_path_buf() }
    }

    /// Loads the aggregate, repairing a missing session or dangling selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file exists but cannot be read.
    pub fn load_state(&self) -> Result<WorkshopState, String> {
        let mut state = self
            .read_json::<WorkshopState>(&self.state_path())?
            .unwrap_or_else(|| WorkshopState::new(self.ctx));
        state.repair(self.ctx);
        Ok(state)
    }

    /// Saves the aggregate as `<root>/digitalWorkshop_v6.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save_state(&self, state: &WorkshopState) -> Result<(), String> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| format!("Failed to serialize workshop state: {e}"))?;
        self.ctx
            .fs
            .write(&self.state_path(), &json)
            .map_err(|e| format!("Failed to write workshop state: {e}"))
    }

    /// Loads the chat log of a project (the default log when `None`).
    ///
    /// # Errors
    ///
    /// Returns an error if the chat file exists but cannot be read.
    pub fn load_chat(&self, project: Option<&str>) -> Result<ChatLog, String> {
        Ok(self.read_json(&self.chat_path(project))?.unwrap_or_default())
    }

    /// Saves the chat log of a project.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save_chat(&self, project: Option<&str>, chat: &ChatLog) -> Result<(), String> {
        let json = serde_json::to_string_pretty(chat)
            .map_err(|e| format!("Failed to serialize chat log: {e}"))?;
        self.ctx
            .fs
            .write(&self.chat_path(project), &json)
            .map_err(|e| format!("Failed to write chat log: {e}"))
    }

    /// Lists the names of saved chat logs.
    ///
    /// # Errors
    ///
    /// Returns an error if the chat directory cannot be listed.
    pub fn saved_chats(&self) -> Result<Vec<String>, String> {
        let dir = self.root.join("chat");
        if !self.ctx.fs.exists(&dir) {
            return Ok(Vec::new());
        }
        let entries =
            self.ctx.fs.list_dir(&dir).map_err(|e| format!("Failed to list chat directory: {e}"))?;
        Ok(entries
            .into_iter()
            .filter_map(|name| name.strip_suffix(".json").map(String::from))
            .collect())
    }

    /// Loads the aggregate and the chat log of its project.
    ///
    /// # Errors
    ///
    /// Returns an error if either document exists but cannot be read.
    pub fn load_workshop(&self) -> Result<Workshop, String> {
        let state = self.load_state()?;
        let chat = self.load_chat(project_name(&state))?;
        Ok(Workshop::from_parts(state, chat))
    }

    /// Saves the aggregate and the chat log of its project.
    ///
    /// # Errors
    ///
    /// Returns an error if either document cannot be written.
    pub fn save_workshop(&self, workshop: &Workshop) -> Result<(), String> {
        self.save_state(&workshop.state)?;
        self.save_chat(project_name(&workshop.state), &workshop.chat)
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, String> {
        if !self.ctx.fs.exists(path) {
            return Ok(None);
        }
        let contents = self
            .ctx
            .fs
            .read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        match serde_json::from_str(&contents) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable document");
                Ok(None)
            }
        }
    }

    fn state_path(&self) -> PathBuf {
        self.root.join(format!("{STATE_KEY}.json"))
    }

    fn chat_path(&self, project: Option<&str>) -> PathBuf {
        let name: String = project
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_CHAT)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
            .collect();
        self.root.join("chat").join(format!("{name}.json"))
    }
}

fn project_name(state: &WorkshopState) -> Option<&str> {
    state.blueprint().map(|b| b.project_name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::workshop::{Blueprint, BuildStage};
    use pretty_assertions::assert_eq;

    fn blueprint(name: &str) -> Blueprint {
        Blueprint::parse(&format!(
            r#"{{"projectName":"{name}","projectType":"t","description":"d","files":[{{"fileName":"app.py","description":"entry"}}]}}"#
        ))
        .unwrap()
    }

    #[test]
    fn fresh_directory_loads_a_new_workshop() {
        let ctx = testing::context();
        let store = WorkshopStore::new(&ctx, Path::new("/home"));

        let ws = store.load_workshop().unwrap();

        assert_eq!(ws.state.stage(), BuildStage::Ideation);
        assert!(!ws.state.session_id().is_empty());
        assert!(ws.chat.is_empty());
    }

    #[test]
    fn state_survives_a_save_and_load() {
        let ctx = testing::context();
        let store = WorkshopStore::new(&ctx, Path::new("/home"));
        let mut state = WorkshopState::new(&ctx);
        state.set_goal("a todo app");
        state.accept_blueprint(&ctx, blueprint("todo")).unwrap();
        state.approve_blueprint(&ctx).unwrap();

        store.save_state(&state).unwrap();
        let loaded = store.load_state().unwrap();

        assert_eq!(loaded.goal(), "a todo app");
        assert_eq!(loaded.stage(), BuildStage::Build);
        assert_eq!(loaded.selected_file_name(), Some("app.py"));
        assert_eq!(loaded.session_id(), state.session_id());
    }

    #[test]
    fn state_is_written_under_the_namespace_key_in_camel_case() {
        let ctx = testing::context();
        let store = WorkshopStore::new(&ctx, Path::new("/home"));
        store.save_state(&WorkshopState::new(&ctx)).unwrap();

        let raw = ctx.fs.read_to_string(Path::new("/home/digitalWorkshop_v6.json")).unwrap();
        assert!(raw.contains("\"projectFiles\""));
        assert!(raw.contains("\"consoleMessages\""));
    }

    #[test]
    fn chat_logs_are_keyed_by_project() {
        let ctx = testing::context();
        let store = WorkshopStore::new(&ctx, Path::new("/home"));
        let mut chat = ChatLog::default();
        chat.push_user("hello");

        store.save_chat(Some("my app/v2"), &chat).unwrap();

        assert_eq!(store.load_chat(Some("my app/v2")).unwrap().len(), 1);
        assert!(store.load_chat(None).unwrap().is_empty());
        assert_eq!(store.saved_chats().unwrap(), vec!["my_app_v2"]);
    }

    #[test]
    fn workshop_chat_follows_the_blueprint_name() {
        let ctx = testing::context();
        let store = WorkshopStore::new(&ctx, Path::new("/home"));
        let mut ws = Workshop::new(&ctx);
        ws.state.accept_blueprint(&ctx, blueprint("weather")).unwrap();
        ws.chat.push_user("make it blue");

        store.save_workshop(&ws).unwrap();

        assert!(ctx.fs.exists(Path::new("/home/chat/weather.json")));
        assert_eq!(store.load_workshop().unwrap().chat.len(), 1);
    }

    #[test]
    fn corrupt_state_loads_as_fresh() {
        let ctx = testing::context();
        ctx.fs.write(Path::new("/home/digitalWorkshop_v6.json"), "{not json").unwrap();
        let store = WorkshopStore::new(&ctx, Path::new("/home"));

        let state = store.load_state().unwrap();

        assert_eq!(state.stage(), BuildStage::Ideation);
    }
}
