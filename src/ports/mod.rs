//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the pipeline core and an
//! external system (time, LLM, source-hosting object store, IDs).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod id_gen;
pub mod llm;
pub mod repo;

pub use clock::Clock;
pub use id_gen::IdGenerator;
pub use llm::{CompletionFuture, CompletionRequest, CompletionResponse, LlmClient};
pub use repo::{
    ChangeRequest, ChangedFile, CreatedRequest, EntryKind, RemoteFile, RepoFuture, RepoId,
    RepoStore, TreeEntry,
};
