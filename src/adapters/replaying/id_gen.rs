//! Replaying adapter for the `IdGenerator` port.

use std::sync::Mutex;

use super::next_output;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::id_gen::IdGenerator;

/// Replays recorded session and reference ids from a cassette.
pub struct ReplayingIdGenerator {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingIdGenerator {
    /// Creates a new replaying ID generator from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl IdGenerator for ReplayingIdGenerator {
    fn generate_id(&self) -> String {
        let output = next_output(&self.replayer, "id_gen", "generate_id");
        output.as_str().expect("id_gen::generate_id: expected string output").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::Interaction;
    use crate::testing::replayer_for;
    use serde_json::json;

    #[test]
    fn serves_recorded_ids() {
        let ids = ReplayingIdGenerator::new(replayer_for(vec![Interaction {
            seq: 0,
            port: "id_gen".into(),
            method: "generate_id".into(),
            input: json!(null),
            output: json!("session-7"),
        }]));
        assert_eq!(ids.generate_id(), "session-7");
    }
}
