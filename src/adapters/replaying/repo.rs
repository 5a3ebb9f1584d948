//! Replaying adapter for the `RepoStore` port.

use std::sync::Mutex;

use super::{extract_result, next_output};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::repo::{
    ChangeRequest, ChangedFile, CreatedRequest, RemoteFile, RepoFuture, RepoId, RepoStore,
    TreeEntry,
};

/// Serves recorded repository-store operations from a cassette.
pub struct ReplayingRepoStore {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingRepoStore {
    /// Creates a replaying repo store backed by the given replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl RepoStore for ReplayingRepoStore {
    fn get_file(
        &self,
        _repo: &RepoId,
        _path: &str,
        _reference: &str,
    ) -> RepoFuture<'_, Option<RemoteFile>> {
        let output = next_output(&self.replayer, "repo", "get_file");
        Box::pin(async move { extract_result(&output, "repo::get_file") })
    }

    fn put_file(
        &self,
        _repo: &RepoId,
        _branch: &str,
        _path: &str,
        _content: &str,
        _message: &str,
        _revision: Option<&str>,
    ) -> RepoFuture<'_, ()> {
        let output = next_output(&self.replayer, "repo", "put_file");
        Box::pin(async move {
            if let Some(err) = output.get("err") {
                let msg = err.as_str().unwrap_or("unknown error").to_string();
                return Err(msg.into());
            }
            Ok(())
        })
    }

    fn list_dir(
        &self,
        _repo: &RepoId,
        _path: &str,
        _reference: &str,
    ) -> RepoFuture<'_, Option<Vec<TreeEntry>>> {
        let output = next_output(&self.replayer, "repo", "list_dir");
        Box::pin(async move { extract_result(&output, "repo::list_dir") })
    }

    fn list_changed_files(
        &self,
        _repo: &RepoId,
        _number: u64,
    ) -> RepoFuture<'_, Vec<ChangedFile>> {
        let output = next_output(&self.replayer, "repo", "list_changed_files");
        Box::pin(async move { extract_result(&output, "repo::list_changed_files") })
    }

    fn branch_head(&self, _repo: &RepoId, _branch: &str) -> RepoFuture<'_, String> {
        let output = next_output(&self.replayer, "repo", "branch_head");
        Box::pin(async move { extract_result(&output, "repo::branch_head") })
    }

    fn branch_exists(&self, _repo: &RepoId, _branch: &str) -> RepoFuture<'_, bool> {
        let output = next_output(&self.replayer, "repo", "branch_exists");
        Box::pin(async move { extract_result(&output, "repo::branch_exists") })
    }

    fn create_branch(&self, _repo: &RepoId, _branch: &str, _from_sha: &str) -> RepoFuture<'_, ()> {
        let output = next_output(&self.replayer, "repo", "create_branch");
        Box::pin(async move {
            if let Some(err) = output.get("err") {
                let msg = err.as_str().unwrap_or("unknown error").to_string();
                return Err(msg.into());
            }
            Ok(())
        })
    }

    fn create_change_request(
        &self,
        _repo: &RepoId,
        _request: &ChangeRequest,
    ) -> RepoFuture<'_, CreatedRequest> {
        let output = next_output(&self.replayer, "repo", "create_change_request");
        Box::pin(async move { extract_result(&output, "repo::create_change_request") })
    }

    fn add_comment(&self, _repo: &RepoId, _number: u64, _body: &str) -> RepoFuture<'_, ()> {
        let output = next_output(&self.replayer, "repo", "add_comment");
        Box::pin(async move {
            if let Some(err) = output.get("err") {
                let msg = err.as_str().unwrap_or("unknown error").to_string();
                return Err(msg.into());
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use chrono::Utc;
    use serde_json::json;

    fn make_store(interactions: Vec<Interaction>) -> ReplayingRepoStore {
        let cassette = Cassette { name: "test".into(), recorded_at: Utc::now(), interactions };
        ReplayingRepoStore::new(CassetteReplayer::new(&cassette))
    }

    fn repo() -> RepoId {
        RepoId { owner: "acme".into(), name: "widgets".into() }
    }

    #[tokio::test]
    async fn get_file_replays_hit() {
        let store = make_store(vec![Interaction {
            seq: 0,
            port: "repo".into(),
            method: "get_file".into(),
            input: json!({"path": "docs/index.md"}),
            output: json!({"ok": {"content": "# Docs", "revision": "abc123"}}),
        }]);
        let file = store.get_file(&repo(), "docs/index.md", "main").await.unwrap();
        let file = file.expect("expected a file");
        assert_eq!(file.content, "# Docs");
        assert_eq!(file.revision, "abc123");
    }

    #[tokio::test]
    async fn get_file_replays_not_found_as_none() {
        let store = make_store(vec![Interaction {
            seq: 0,
            port: "repo".into(),
            method: "get_file".into(),
            input: json!({"path": "docs/missing.md"}),
            output: json!({"ok": null}),
        }]);
        let file = store.get_file(&repo(), "docs/missing.md", "main").await.unwrap();
        assert!(file.is_none());
    }

    #[tokio::test]
    async fn put_file_replays_error() {
        let store = make_store(vec![Interaction {
            seq: 0,
            port: "repo".into(),
            method: "put_file".into(),
            input: json!({}),
            output: json!({"err": "conflict"}),
        }]);
        let result = store.put_file(&repo(), "main", "a.md", "x", "msg", None).await;
        assert!(result.unwrap_err().to_string().contains("conflict"));
    }

    #[tokio::test]
    async fn list_changed_files_replays_listing() {
        let store = make_store(vec![Interaction {
            seq: 0,
            port: "repo".into(),
            method: "list_changed_files".into(),
            input: json!({"number": 7}),
            output: json!({"ok": [
                {"path": "src/a.rs", "status": "modified", "patch": "+fn a() {}"}
            ]}),
        }]);
        let files = store.list_changed_files(&repo(), 7).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "src/a.rs");
        assert_eq!(files[0].patch.as_deref(), Some("+fn a() {}"));
    }
}
