//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the workshop core and an
//! external system (time, the generative model, the filesystem, IDs).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod filesystem;
pub mod id_gen;
pub mod llm;

pub use clock::Clock;
pub use filesystem::FileSystem;
pub use id_gen::IdGenerator;
pub use llm::{
    ChatRequest, ChatRole, ChatTurn, ChunkStream, ExecutionRequest, LlmClient, LlmError,
    LlmFuture, Sampling, StructuredRequest, TextRequest,
};
