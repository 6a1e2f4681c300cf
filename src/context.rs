//! Service context bundling all port trait objects.

use std::path::Path;

use crate::adapters::live::{LiveClock, LiveFileSystem, LiveIdGenerator, LiveLlmClient};
use crate::adapters::recording::{
    RecordingClock, RecordingFileSystem, RecordingIdGenerator, RecordingLlmClient,
};
use crate::adapters::replaying::{
    ReplayingClock, ReplayingFileSystem, ReplayingIdGenerator, ReplayingLlmClient,
};
use crate::cassette::config::CassetteConfig;
use crate::cassette::session::RecordingSession;
use crate::config::WorkshopConfig;
use crate::ports::clock::Clock;
use crate::ports::filesystem::{FileSystem, FsError};
use crate::ports::id_gen::IdGenerator;
use crate::ports::llm::{
    ChatRequest, ChunkStream, ExecutionRequest, LlmClient, LlmFuture, StructuredRequest,
    TextRequest,
};

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live, replaying, recording).
pub struct ServiceContext {
    /// Clock for console timestamps.
    pub clock: Box<dyn Clock>,
    /// Filesystem for the state directory.
    pub fs: Box<dyn FileSystem>,
    /// ID generator for session ids and preview references.
    pub id_gen: Box<dyn IdGenerator>,
    /// The generative model.
    pub llm: Box<dyn LlmClient>,
}

impl ServiceContext {
    /// Creates a context from explicit adapters.
    #[must_use]
    pub fn new(
        clock: Box<dyn Clock>,
        fs: Box<dyn FileSystem>,
        id_gen: Box<dyn IdGenerator>,
        llm: Box<dyn LlmClient>,
    ) -> Self {
        Self { clock, fs, id_gen, llm }
    }

    /// Creates a live context: system clock, real disk, random ids and the
    /// hosted model configured by `config`.
    #[must_use]
    pub fn live(config: &WorkshopConfig) -> Self {
        Self::new(
            Box::new(LiveClock),
            Box::new(LiveFileSystem),
            Box::new(LiveIdGenerator::new()),
            Box::new(LiveLlmClient::new(config)),
        )
    }

    /// Replaces the model adapter.
    #[must_use]
    pub fn with_llm(self, llm: Box<dyn LlmClient>) -> Self {
        Self { llm, ..self }
    }

    /// Creates a live context whose every port is recorded into a new
    /// session directory under `root`.
    ///
    /// The returned session must be finished after the context is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the session directory cannot be created.
    pub fn recording_at(
        config: &WorkshopConfig,
        root: &Path,
    ) -> Result<(Self, RecordingSession), String> {
        let session = RecordingSession::new(root)?;
        let live = Self::live(config);
        let ctx = Self::new(
            Box::new(RecordingClock::new(live.clock, session.clock.clone())),
            Box::new(RecordingFileSystem::new(live.fs, session.fs.clone())),
            Box::new(RecordingIdGenerator::new(live.id_gen, session.id_gen.clone())),
            Box::new(RecordingLlmClient::new(live.llm, session.llm.clone())),
        );
        Ok((ctx, session))
    }

    /// Creates a replaying context from a monolithic cassette file.
    ///
    /// All ports are served by a single cassette; each port/method pair
    /// is dispatched to its own interaction stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, String> {
        let load = || CassetteConfig::load_monolithic(path);
        Ok(Self::new(
            Box::new(ReplayingClock::new(load()?)),
            Box::new(ReplayingFileSystem::new(load()?)),
            Box::new(ReplayingIdGenerator::new(load()?)),
            Box::new(ReplayingLlmClient::new(load()?)),
        ))
    }

    /// Creates a replaying context from per-port cassette files.
    ///
    /// Ports without a configured cassette file use a panicking adapter
    /// that fails with a clear message when called.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette file cannot be read or parsed.
    pub fn replaying_from(config: &CassetteConfig) -> Result<Self, String> {
        let replayers = config.load_all()?;

        Ok(Self::new(
            match replayers.clock {
                Some(r) => Box::new(ReplayingClock::new(r)),
                None => Box::new(PanickingClock),
            },
            match replayers.fs {
                Some(r) => Box::new(ReplayingFileSystem::new(r)),
                None => Box::new(PanickingFileSystem),
            },
            match replayers.id_gen {
                Some(r) => Box::new(ReplayingIdGenerator::new(r)),
                None => Box::new(PanickingIdGenerator),
            },
            match replayers.llm {
                Some(r) => Box::new(ReplayingLlmClient::new(r)),
                None => Box::new(PanickingLlmClient),
            },
        ))
    }
}

// --- Panicking adapters for unspecified ports ---

fn unconfigured(port: &str) -> ! {
    panic!("{port} port not configured in CassetteConfig, no cassette loaded for it");
}

struct PanickingClock;
impl Clock for PanickingClock {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        unconfigured("clock")
    }
}

struct PanickingFileSystem;
impl FileSystem for PanickingFileSystem {
    fn read_to_string(&self, _path: &Path) -> Result<String, FsError> {
        unconfigured("fs")
    }
    fn write(&self, _path: &Path, _contents: &str) -> Result<(), FsError> {
        unconfigured("fs")
    }
    fn exists(&self, _path: &Path) -> bool {
        unconfigured("fs")
    }
    fn list_dir(&self, _path: &Path) -> Result<Vec<String>, FsError> {
        unconfigured("fs")
    }
}

struct PanickingIdGenerator;
impl IdGenerator for PanickingIdGenerator {
    fn generate_id(&self) -> String {
        unconfigured("id_gen")
    }
}

struct PanickingLlmClient;
impl LlmClient for PanickingLlmClient {
    fn generate_structured(&self, _request: &StructuredRequest) -> LlmFuture<'_, String> {
        unconfigured("llm")
    }
    fn generate_text(&self, _request: &TextRequest) -> LlmFuture<'_, String> {
        unconfigured("llm")
    }
    fn stream_chat(&self, _request: &ChatRequest) -> ChunkStream<'_> {
        unconfigured("llm")
    }
    fn simulate_execution(&self, _request: &ExecutionRequest) -> LlmFuture<'_, String> {
        unconfigured("llm")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use chrono::Utc;
    use serde_json::json;

    fn write_cassette(path: &Path, interactions: Vec<Interaction>) {
        let cassette = Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            commit: "abc".into(),
            interactions,
        };
        std::fs::write(path, serde_yaml::to_string(&cassette).unwrap()).unwrap();
    }

    fn interaction(seq: u64, port: &str, method: &str, output: serde_json::Value) -> Interaction {
        Interaction { seq, port: port.into(), method: method.into(), input: json!({}), output }
    }

    #[test]
    fn replaying_context_from_monolithic_cassette() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full.cassette.yaml");
        write_cassette(
            &path,
            vec![
                interaction(0, "clock", "now", json!("2024-06-15T10:30:00Z")),
                interaction(1, "id_gen", "generate_id", json!("uuid-001")),
            ],
        );

        let ctx = ServiceContext::replaying(&path).unwrap();
        assert_eq!(ctx.clock.now().to_rfc3339(), "2024-06-15T10:30:00+00:00");
        assert_eq!(ctx.id_gen.generate_id(), "uuid-001");
    }

    #[tokio::test]
    async fn replaying_from_per_port_cassettes() {
        let dir = tempfile::tempdir().unwrap();
        let llm_path = dir.path().join("llm.cassette.yaml");
        write_cassette(
            &llm_path,
            vec![interaction(0, "llm", "generate_structured", json!({"Ok": "{}"}))],
        );

        let config = CassetteConfig { llm: Some(llm_path), ..CassetteConfig::default() };
        let ctx = ServiceContext::replaying_from(&config).unwrap();
        let request = StructuredRequest { prompt: "p".into(), schema: json!({}) };
        assert_eq!(ctx.llm.generate_structured(&request).await.unwrap(), "{}");
    }

    #[test]
    fn with_llm_keeps_the_other_ports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full.cassette.yaml");
        write_cassette(&path, vec![interaction(0, "id_gen", "generate_id", json!("kept"))]);

        let ctx = ServiceContext::replaying(&path)
            .unwrap()
            .with_llm(Box::new(PanickingLlmClient));
        assert_eq!(ctx.id_gen.generate_id(), "kept");
    }

    #[test]
    #[should_panic(expected = "not configured in CassetteConfig")]
    fn unspecified_port_panics_with_clear_message() {
        let ctx = ServiceContext::replaying_from(&CassetteConfig::panic_on_unspecified()).unwrap();
        let _ = ctx.clock.now();
    }
}
