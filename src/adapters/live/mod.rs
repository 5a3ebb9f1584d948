//! Live adapters that talk to real external systems.

pub mod clock;
pub mod id_gen;
pub mod llm;
pub mod repo;

pub use clock::LiveClock;
pub use id_gen::LiveIdGenerator;
pub use llm::LiveLlmClient;
pub use repo::GithubRepoStore;
