//! Generation cache: a persisted map from planned document path to a
//! previously generated body, stored as a single versioned object in the
//! docs repository.
//!
//! Loading tolerates absence (empty cache) but not corruption. Persisting
//! is best-effort: the generated documents are already queued for
//! publishing, so a failed write-back is logged and swallowed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::RunContext;
use crate::context::ServiceContext;

/// Where the cache object lives in the docs repository.
pub const CACHE_PATH: &str = ".docsync/generation-cache.json";

/// In-memory cache state for one bootstrap run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationCache {
    /// Documentation path to generated body.
    pub entries: BTreeMap<String, String>,
    /// Revision marker of the persisted object at load time, attached on
    /// write-back to avoid lost updates. Last writer still wins on a race.
    #[serde(skip)]
    pub revision: Option<String>,
    /// Whether the in-memory state has diverged from the persisted one.
    #[serde(skip)]
    pub dirty: bool,
}

impl GenerationCache {
    /// Looks up a previously generated body.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    /// Stores a freshly generated body.
    pub fn insert(&mut self, path: String, body: String) {
        self.entries.insert(path, body);
        self.dirty = true;
    }

    /// Loads the cache from the docs repository.
    ///
    /// # Errors
    ///
    /// Not-found yields an empty cache. A read error or unparsable object
    /// is fatal.
    pub async fn load(ctx: &ServiceContext, run: &RunContext) -> Result<Self, String> {
        let found = ctx
            .repo
            .get_file(&run.docs_repo, CACHE_PATH, &run.branch)
            .await
            .map_err(|e| format!("Failed to read generation cache: {e}"))?;

        let Some(file) = found else {
            return Ok(Self::default());
        };

        let entries: BTreeMap<String, String> = serde_json::from_str(&file.content)
            .map_err(|e| format!("Failed to parse generation cache: {e}"))?;
        info!(entries = entries.len(), "loaded generation cache");
        Ok(Self { entries, revision: Some(file.revision), dirty: false })
    }

    /// Persists the cache back to the docs repository, best-effort.
    ///
    /// A write failure is logged and swallowed.
    pub async fn persist(&self, ctx: &ServiceContext, run: &RunContext) {
        if !self.dirty {
            return;
        }
        let body = match serde_json::to_string_pretty(&self.entries) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to serialize generation cache, skipping persist");
                return;
            }
        };
        let result = ctx
            .repo
            .put_file(
                &run.docs_repo,
                &run.branch,
                CACHE_PATH,
                &body,
                "chore: update generation cache",
                self.revision.as_deref(),
            )
            .await;
        if let Err(e) = result {
            warn!(error = %e, "failed to persist generation cache");
        }
    }
}
