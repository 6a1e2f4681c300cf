//! Record-replay round-trip integration test.
//!
//! 1. Run a blueprint session on a recording context (live clock, fs and
//!    ids; scripted model).
//! 2. Replay the per-port cassettes of that session.
//! 3. Assert the replayed session ends in the identical persisted state.

use std::cell::RefCell;
use std::path::Path;

use serde_json::json;

use workshop::adapters::replaying::ReplayingLlmClient;
use workshop::cassette::config::CassetteConfig;
use workshop::cassette::recorder::CassetteRecorder;
use workshop::config::WorkshopConfig;
use workshop::context::ServiceContext;
use workshop::store::WorkshopStore;
use workshop::workshop::pipeline::{self, Commit};
use workshop::workshop::{BuildStage, Workshop};

const BLUEPRINT: &str = r#"{"projectName":"notes","projectType":"Static site","description":"A notes page.","files":[{"fileName":"index.html","description":"page"},{"fileName":"style.css","description":"styles"}]}"#;

fn scripted_model(dir: &Path) -> ReplayingLlmClient {
    let path = dir.join("model.cassette.yaml");
    let mut recorder = CassetteRecorder::new(&path, "model", "test");
    recorder.record("llm", "generate_structured", json!({}), json!({"Ok": BLUEPRINT}));
    recorder.record("llm", "generate_text", json!({}), json!({"Ok": "<p>notes</p>"}));
    recorder.record("llm", "generate_text", json!({}), json!({"Err": "rate limited"}));
    recorder.finish().unwrap();
    ReplayingLlmClient::new(CassetteConfig::load_monolithic(&path).unwrap())
}

/// Runs ideate → approve → generate-all → save and returns the saved state.
async fn blueprint_session(ctx: &ServiceContext, home: &Path) -> String {
    let ws = RefCell::new(Workshop::new(ctx));
    ws.borrow_mut().state.set_goal("a notes page");

    assert_eq!(pipeline::generate_blueprint(ctx, &ws).await.unwrap(), Commit::Applied);
    ws.borrow_mut().state.approve_blueprint(ctx).unwrap();
    let report = pipeline::generate_all_files(ctx, &ws).await.unwrap();
    assert_eq!(report.failed, vec!["style.css".to_string()]);
    assert_eq!(ws.borrow().state.stage(), BuildStage::Build);

    let store = WorkshopStore::new(ctx, home);
    store.save_workshop(&ws.borrow()).unwrap();
    let snapshot = serde_json::to_string(&ws.borrow().state).unwrap();
    snapshot
}

#[tokio::test]
async fn replayed_session_matches_the_recording() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("home");

    // --- Record ---
    let (ctx, session) =
        ServiceContext::recording_at(&WorkshopConfig::default(), &dir.path().join("cassettes"))
            .unwrap();
    let ctx = ctx.with_llm(Box::new(scripted_model(dir.path())));
    let recorded = blueprint_session(&ctx, &home).await;
    drop(ctx);
    let cassettes = session.finish().unwrap();

    assert!(home.join("digitalWorkshop_v6.json").exists());
    assert!(home.join("chat").join("notes.json").exists());

    // --- Replay twice ---
    for _ in 0..2 {
        let ctx = ServiceContext::replaying_from(&CassetteConfig::from_dir(&cassettes))
            .unwrap()
            .with_llm(Box::new(scripted_model(dir.path())));
        let replayed = blueprint_session(&ctx, &dir.path().join("elsewhere")).await;
        assert_eq!(replayed, recorded, "replayed state differs from the recording");
    }

    // Replayed writes never touch the disk.
    assert!(!dir.path().join("elsewhere").exists());
}

#[test]
fn monolithic_cassette_serves_every_port() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("all.cassette.yaml");
    let mut recorder = CassetteRecorder::new(&path, "all", "test");
    recorder.record("clock", "now", json!({}), json!("2025-03-15T14:30:00Z"));
    recorder.record(
        "fs",
        "read_to_string",
        json!({"path": "/home/bp.json"}),
        json!({"Ok": BLUEPRINT}),
    );
    recorder.record("fs", "exists", json!({"path": "/home/chat"}), json!(false));
    recorder.record("id_gen", "generate_id", json!({}), json!("session-001"));
    recorder.finish().unwrap();

    let ctx = ServiceContext::replaying(&path).unwrap();

    assert_eq!(ctx.clock.now().to_rfc3339(), "2025-03-15T14:30:00+00:00");
    assert_eq!(ctx.fs.read_to_string(Path::new("/home/bp.json")).unwrap(), BLUEPRINT);
    assert!(!ctx.fs.exists(Path::new("/home/chat")));
    assert_eq!(ctx.id_gen.generate_id(), "session-001");
}
