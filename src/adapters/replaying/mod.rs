//! Replaying adapters that serve recorded interactions from cassettes.

pub mod clock;
pub mod filesystem;
pub mod id_gen;
pub mod llm;

use std::sync::Mutex;

use crate::cassette::replayer::CassetteReplayer;

pub use clock::ReplayingClock;
pub use filesystem::ReplayingFileSystem;
pub use id_gen::ReplayingIdGenerator;
pub use llm::ReplayingLlmClient;

/// Takes the output of the next `port::method` interaction.
///
/// # Panics
///
/// Panics when the cassette has no further interaction for the pair, so a
/// drifting test fails at the call that diverged.
pub(crate) fn next_output(
    replayer: &Mutex<CassetteReplayer>,
    port: &str,
    method: &str,
) -> serde_json::Value {
    let mut replayer = replayer.lock().expect("replayer lock poisoned");
    replayer.next_interaction(port, method).output.clone()
}

/// Decodes a recorded `Result` using the Ok/Err JSON convention.
///
/// Mirror of `recording::record_result`. Accepts `{"Ok": v}` / `{"Err": msg}`
/// and the lowercase `ok` / `err` spellings; a bare value counts as `Ok`.
pub(crate) fn replay_result<T>(
    output: &serde_json::Value,
    context: &str,
) -> Result<T, Box<dyn std::error::Error + Send + Sync>>
where
    T: serde::de::DeserializeOwned,
{
    if let Some(err) = output.get("Err").or_else(|| output.get("err")) {
        let msg = err.as_str().map_or_else(|| err.to_string(), str::to_string);
        return Err(msg.into());
    }
    let value = output.get("Ok").or_else(|| output.get("ok")).unwrap_or(output);
    serde_json::from_value(value.clone())
        .map_err(|e| format!("{context}: failed to deserialize: {e}").into())
}
