//! Service context bundling all port trait objects.

use std::path::Path;

use crate::adapters::replaying::{
    ReplayingClock, ReplayingIdGenerator, ReplayingLlmClient, ReplayingRepoStore,
};
use crate::config::Credentials;
use crate::ports::clock::Clock;
use crate::ports::id_gen::IdGenerator;
use crate::ports::llm::LlmClient;
use crate::ports::repo::RepoStore;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live, replaying).
pub struct ServiceContext {
    /// Clock for obtaining the current time.
    pub clock: Box<dyn Clock>,
    /// ID generator for branch uniqueness tokens.
    pub id_gen: Box<dyn IdGenerator>,
    /// LLM client for language-model completions.
    pub llm: Box<dyn LlmClient>,
    /// Source-hosting object store.
    pub repo: Box<dyn RepoStore>,
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext").finish_non_exhaustive()
    }
}

impl ServiceContext {
    /// Creates a live context with real adapters, wired with the given
    /// startup-validated credentials.
    #[must_use]
    pub fn live(credentials: &Credentials) -> Self {
        use crate::adapters::live::{GithubRepoStore, LiveClock, LiveIdGenerator, LiveLlmClient};

        Self {
            clock: Box::new(LiveClock),
            id_gen: Box::new(LiveIdGenerator),
            llm: Box::new(LiveLlmClient::new(credentials.anthropic_api_key.clone())),
            repo: Box::new(GithubRepoStore::new(credentials.github_token.clone())),
        }
    }

    /// Creates a replaying context from a monolithic cassette file.
    ///
    /// All ports are served by the same cassette — each port gets its own
    /// replayer so per-port cursors are independent.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        let cassette: crate::cassette::format::Cassette = serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))?;

        Ok(Self::replaying_from_cassette(&cassette))
    }

    /// Creates a replaying context from an already-loaded cassette.
    #[must_use]
    pub fn replaying_from_cassette(cassette: &crate::cassette::format::Cassette) -> Self {
        use crate::cassette::replayer::CassetteReplayer;

        Self {
            clock: Box::new(ReplayingClock::new(CassetteReplayer::new(cassette))),
            id_gen: Box::new(ReplayingIdGenerator::new(CassetteReplayer::new(cassette))),
            llm: Box::new(ReplayingLlmClient::new(CassetteReplayer::new(cassette))),
            repo: Box::new(ReplayingRepoStore::new(CassetteReplayer::new(cassette))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn replaying_context_from_monolithic_cassette() {
        let dir = std::env::temp_dir().join("docsync_ctx_test_mono");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("full.cassette.yaml");

        let cassette = Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            interactions: vec![
                Interaction {
                    seq: 0,
                    port: "clock".into(),
                    method: "now".into(),
                    input: json!({}),
                    output: json!("2024-06-15T10:30:00Z"),
                },
                Interaction {
                    seq: 1,
                    port: "id_gen".into(),
                    method: "generate_id".into(),
                    input: json!({}),
                    output: json!("token-001"),
                },
            ],
        };
        std::fs::write(&path, serde_yaml::to_string(&cassette).unwrap()).unwrap();

        let ctx = ServiceContext::replaying(&path).unwrap();
        let time = ctx.clock.now();
        assert_eq!(time.to_rfc3339(), "2024-06-15T10:30:00+00:00");
        let id = ctx.id_gen.generate_id();
        assert_eq!(id, "token-001");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn replaying_context_rejects_missing_file() {
        let result = ServiceContext::replaying(Path::new("/nonexistent/cassette.yaml"));
        assert!(result.unwrap_err().contains("Failed to read"));
    }
}
