//! ID generator port for producing unique identifiers.

/// Generates unique identifiers.
///
/// Used for workshop session ids and preview reference handles, so tests
/// and cassette playback can substitute a predictable sequence.
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier string.
    fn generate_id(&self) -> String;
}
