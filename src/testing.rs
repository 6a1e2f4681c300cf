//! Deterministic port doubles shared by unit tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};

use crate::adapters::replaying::ReplayingLlmClient;
use crate::cassette::format::{Cassette, Interaction};
use crate::cassette::replayer::CassetteReplayer;
use crate::context::ServiceContext;
use crate::ports::filesystem::FsError;
use crate::ports::{Clock, FileSystem, IdGenerator, LlmClient};

/// Clock that starts at a fixed instant and advances 1 ms per reading.
pub struct StepClock {
    start: DateTime<Utc>,
    ticks: AtomicI64,
}

impl Default for StepClock {
    fn default() -> Self {
        Self {
            start: Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).single().unwrap_or_default(),
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.start + chrono::Duration::milliseconds(tick)
    }
}

/// Ids `id-1`, `id-2`, ...
#[derive(Default)]
pub struct SequenceIds(AtomicUsize);

impl IdGenerator for SequenceIds {
    fn generate_id(&self) -> String {
        format!("id-{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// In-memory filesystem.
#[derive(Default)]
pub struct MemFs {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl FileSystem for MemFs {
    fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        let files = self.files.lock().unwrap();
        files.get(path).cloned().ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        self.files.lock().unwrap().insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.keys().any(|p| p == path || p.starts_with(path))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let files = self.files.lock().unwrap();
        let mut names: Vec<String> = files
            .keys()
            .filter_map(|p| p.strip_prefix(path).ok())
            .filter_map(|rest| rest.components().next())
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        names.dedup();
        Ok(names)
    }
}

/// Replayer over an in-memory cassette.
pub fn replayer_for(interactions: Vec<Interaction>) -> CassetteReplayer {
    CassetteReplayer::new(&Cassette {
        name: "test".into(),
        recorded_at: Utc::now(),
        commit: "test".into(),
        interactions,
    })
}

/// A recorded `llm` port call.
pub fn llm_call(seq: u64, method: &str, output: serde_json::Value) -> Interaction {
    Interaction {
        seq,
        port: "llm".into(),
        method: method.into(),
        input: serde_json::Value::Null,
        output,
    }
}

/// Context with deterministic clock, ids and memory filesystem around `llm`.
pub fn context_with_llm(llm: Box<dyn LlmClient>) -> ServiceContext {
    ServiceContext::new(
        Box::new(StepClock::default()),
        Box::new(MemFs::default()),
        Box::new(SequenceIds::default()),
        llm,
    )
}

/// Context whose model replays `interactions`.
pub fn replaying_context(interactions: Vec<Interaction>) -> ServiceContext {
    context_with_llm(Box::new(ReplayingLlmClient::new(replayer_for(interactions))))
}

/// Context for tests that never reach the model.
pub fn context() -> ServiceContext {
    replaying_context(Vec::new())
}
