//! Cassette data structures for recording and replaying interactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded interaction with an external port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Sequence number (assigned automatically by the recorder).
    pub seq: u64,
    /// Port name (`llm`, `fs`, `clock` or `id_gen`).
    pub port: String,
    /// Method name invoked on the port.
    pub method: String,
    /// Input data sent to the port.
    pub input: serde_json::Value,
    /// Output data returned from the port.
    pub output: serde_json::Value,
}

/// A cassette containing a sequence of recorded interactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Human-readable name for this cassette.
    pub name: String,
    /// When this cassette was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Git commit hash at recording time.
    pub commit: String,
    /// Ordered list of interactions.
    pub interactions: Vec<Interaction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_hand_written_yaml() {
        let yaml = r#"
name: blueprint-happy-path
recorded_at: 2024-06-15T10:30:00Z
commit: abc123
interactions:
  - seq: 0
    port: llm
    method: generate_structured
    input: { prompt: "a todo app" }
    output: { Ok: '{"projectName":"todo"}' }
  - seq: 1
    port: llm
    method: stream_chat
    input: null
    output: { Ok: ["Hel", "lo"] }
"#;
        let cassette: Cassette = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(cassette.interactions.len(), 2);
        assert_eq!(cassette.interactions[0].method, "generate_structured");
        assert_eq!(cassette.interactions[1].output, json!({"Ok": ["Hel", "lo"]}));

        let again: Cassette =
            serde_yaml::from_str(&serde_yaml::to_string(&cassette).unwrap()).unwrap();
        assert_eq!(again, cassette);
    }
}
