//! Recording adapters that capture interactions to cassettes.
//!
//! Each adapter delegates to an inner (usually live) implementation and
//! records the call's input and output to its port's recorder.

pub mod clock;
pub mod filesystem;
pub mod id_gen;
pub mod llm;

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::cassette::recorder::CassetteRecorder;

pub use clock::RecordingClock;
pub use filesystem::RecordingFileSystem;
pub use id_gen::RecordingIdGenerator;
pub use llm::RecordingLlmClient;

/// Record an interaction with a simple (non-Result) return value.
///
/// Mirror of `replaying::next_output` - records input/output instead of reading.
pub(crate) fn record_interaction<I, O>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    output: &O,
) where
    I: Serialize,
    O: Serialize,
{
    let input_json =
        serde_json::to_value(input).expect("failed to serialize recording input");
    let output_json =
        serde_json::to_value(output).expect("failed to serialize recording output");

    let mut guard = recorder.lock().expect("recorder lock poisoned");
    guard.record(port, method, input_json, output_json);
}

/// Record a `Result<T, E>` interaction using the Ok/Err JSON convention.
///
/// Mirror of `replaying::replay_result` - serializes Result for recording.
///
/// Convention:
/// - `Ok(v)` is serialized as `{"Ok": v}`
/// - `Err(e)` is serialized as `{"Err": e.to_string()}`
pub(crate) fn record_result<T, E, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: std::fmt::Display,
    I: Serialize,
{
    let input_json =
        serde_json::to_value(input).expect("failed to serialize recording input");

    let output_json = match result {
        Ok(v) => {
            let inner = serde_json::to_value(v).expect("failed to serialize Ok value");
            serde_json::json!({ "Ok": inner })
        }
        Err(e) => serde_json::json!({ "Err": e.to_string() }),
    };

    let mut guard = recorder.lock().expect("recorder lock poisoned");
    guard.record(port, method, input_json, output_json);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::replaying::replay_result;
    use crate::cassette::format::Cassette;

    fn recorded(recorder: Arc<Mutex<CassetteRecorder>>) -> Cassette {
        let recorder = Arc::try_unwrap(recorder).unwrap().into_inner().unwrap();
        let path = recorder.finish().unwrap();
        serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn recorded_results_replay_to_the_same_values() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(
            dir.path().join("llm.cassette.yaml"),
            "t",
            "c",
        )));

        let ok: Result<Vec<String>, String> = Ok(vec!["a".into(), "b".into()]);
        let err: Result<String, String> = Err("rate limited".into());
        record_result(&recorder, "llm", "stream_chat", &"hi", &ok);
        record_result(&recorder, "llm", "generate_text", &"hi", &err);

        let cassette = recorded(recorder);
        let chunks: Vec<String> = replay_result(&cassette.interactions[0].output, "t").unwrap();
        assert_eq!(chunks, vec!["a", "b"]);
        let failure = replay_result::<String>(&cassette.interactions[1].output, "t").unwrap_err();
        assert_eq!(failure.to_string(), "rate limited");
    }
}
