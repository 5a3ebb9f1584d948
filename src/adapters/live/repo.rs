//! Live adapter for the `RepoStore` port using the GitHub REST API.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::ports::repo::{
    ChangeRequest, ChangedFile, CreatedRequest, EntryKind, RemoteFile, RepoFuture, RepoId,
    RepoStore, TreeEntry,
};

const GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "docsync";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Live repo store that calls the GitHub REST v3 API.
///
/// The token is injected at construction and validated at startup;
/// it is never re-read mid-run.
pub struct GithubRepoStore {
    client: Client,
    token: String,
}

impl GithubRepoStore {
    /// Creates a new GitHub-backed repo store with the given token.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self { client: Client::new(), token }
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("authorization", format!("Bearer {}", self.token))
            .header("accept", "application/vnd.github+json")
            .header("user-agent", USER_AGENT)
    }
}

/// A contents-API entry; `content` is present for files, absent for listings.
#[derive(Deserialize)]
struct ContentsEntry {
    name: String,
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
    content: Option<String>,
}

/// One file in a pull-request diff listing.
#[derive(Deserialize)]
struct PullFile {
    filename: String,
    status: String,
    patch: Option<String>,
}

/// A git ref response (`object.sha` is the head commit).
#[derive(Deserialize)]
struct GitRef {
    object: GitObject,
}

/// The object a git ref points at.
#[derive(Deserialize)]
struct GitObject {
    sha: String,
}

/// A created pull request.
#[derive(Deserialize)]
struct CreatedPull {
    number: u64,
    html_url: String,
}

/// Decodes base64 file content as served by the contents API, which
/// wraps the payload with newlines.
fn decode_content(encoded: &str) -> Result<String, BoxError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes =
        BASE64.decode(compact).map_err(|e| format!("failed to decode file content: {e}"))?;
    String::from_utf8(bytes).map_err(|e| format!("file content is not UTF-8: {e}").into())
}

/// Reads the response body, mapping non-success statuses to an error.
async fn check_status(
    response: reqwest::Response,
    context: &str,
) -> Result<String, BoxError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| format!("{context}: failed to read response: {e}"))?;
    if !status.is_success() {
        return Err(format!("{context}: GitHub API error ({}): {text}", status.as_u16()).into());
    }
    Ok(text)
}

impl RepoStore for GithubRepoStore {
    fn get_file(
        &self,
        repo: &RepoId,
        path: &str,
        reference: &str,
    ) -> RepoFuture<'_, Option<RemoteFile>> {
        let url = format!(
            "{GITHUB_API_URL}/repos/{}/{}/contents/{path}?ref={reference}",
            repo.owner, repo.name
        );
        Box::pin(async move {
            let response = self
                .request(reqwest::Method::GET, url)
                .send()
                .await
                .map_err(|e| -> BoxError { format!("get_file request failed: {e}").into() })?;
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let text = check_status(response, "get_file").await?;
            let entry: ContentsEntry = serde_json::from_str(&text)
                .map_err(|e| -> BoxError { format!("get_file: unexpected response: {e}").into() })?;
            let encoded = entry.content.unwrap_or_default();
            Ok(Some(RemoteFile { content: decode_content(&encoded)?, revision: entry.sha }))
        })
    }

    fn put_file(
        &self,
        repo: &RepoId,
        branch: &str,
        path: &str,
        content: &str,
        message: &str,
        revision: Option<&str>,
    ) -> RepoFuture<'_, ()> {
        let url = format!(
            "{GITHUB_API_URL}/repos/{}/{}/contents/{path}",
            repo.owner, repo.name
        );
        let mut body = json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
            "branch": branch,
        });
        if let Some(sha) = revision {
            body["sha"] = json!(sha);
        }
        Box::pin(async move {
            let response = self
                .request(reqwest::Method::PUT, url)
                .json(&body)
                .send()
                .await
                .map_err(|e| -> BoxError { format!("put_file request failed: {e}").into() })?;
            check_status(response, "put_file").await?;
            Ok(())
        })
    }

    fn list_dir(
        &self,
        repo: &RepoId,
        path: &str,
        reference: &str,
    ) -> RepoFuture<'_, Option<Vec<TreeEntry>>> {
        let url = format!(
            "{GITHUB_API_URL}/repos/{}/{}/contents/{path}?ref={reference}",
            repo.owner, repo.name
        );
        Box::pin(async move {
            let response = self
                .request(reqwest::Method::GET, url)
                .send()
                .await
                .map_err(|e| -> BoxError { format!("list_dir request failed: {e}").into() })?;
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let text = check_status(response, "list_dir").await?;
            let entries: Vec<ContentsEntry> = serde_json::from_str(&text)
                .map_err(|e| -> BoxError { format!("list_dir: expected a directory: {e}").into() })?;
            Ok(Some(
                entries
                    .into_iter()
                    .map(|e| TreeEntry {
                        name: e.name,
                        path: e.path,
                        kind: if e.kind == "dir" { EntryKind::Dir } else { EntryKind::File },
                    })
                    .collect(),
            ))
        })
    }

    fn list_changed_files(&self, repo: &RepoId, number: u64) -> RepoFuture<'_, Vec<ChangedFile>> {
        let url = format!(
            "{GITHUB_API_URL}/repos/{}/{}/pulls/{number}/files?per_page=100",
            repo.owner, repo.name
        );
        Box::pin(async move {
            let response = self.request(reqwest::Method::GET, url).send().await.map_err(
                |e| -> BoxError { format!("list_changed_files request failed: {e}").into() },
            )?;
            let text = check_status(response, "list_changed_files").await?;
            let files: Vec<PullFile> = serde_json::from_str(&text).map_err(|e| -> BoxError {
                format!("list_changed_files: unexpected response: {e}").into()
            })?;
            Ok(files
                .into_iter()
                .map(|f| ChangedFile { path: f.filename, status: f.status, patch: f.patch })
                .collect())
        })
    }

    fn branch_head(&self, repo: &RepoId, branch: &str) -> RepoFuture<'_, String> {
        let url = format!(
            "{GITHUB_API_URL}/repos/{}/{}/git/ref/heads/{branch}",
            repo.owner, repo.name
        );
        Box::pin(async move {
            let response = self
                .request(reqwest::Method::GET, url)
                .send()
                .await
                .map_err(|e| -> BoxError { format!("branch_head request failed: {e}").into() })?;
            let text = check_status(response, "branch_head").await?;
            let git_ref: GitRef = serde_json::from_str(&text).map_err(|e| -> BoxError {
                format!("branch_head: unexpected response: {e}").into()
            })?;
            Ok(git_ref.object.sha)
        })
    }

    fn branch_exists(&self, repo: &RepoId, branch: &str) -> RepoFuture<'_, bool> {
        let url = format!(
            "{GITHUB_API_URL}/repos/{}/{}/git/ref/heads/{branch}",
            repo.owner, repo.name
        );
        Box::pin(async move {
            let response = self
                .request(reqwest::Method::GET, url)
                .send()
                .await
                .map_err(|e| -> BoxError { format!("branch_exists request failed: {e}").into() })?;
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(false);
            }
            check_status(response, "branch_exists").await?;
            Ok(true)
        })
    }

    fn create_branch(&self, repo: &RepoId, branch: &str, from_sha: &str) -> RepoFuture<'_, ()> {
        let url = format!("{GITHUB_API_URL}/repos/{}/{}/git/refs", repo.owner, repo.name);
        let body = json!({ "ref": format!("refs/heads/{branch}"), "sha": from_sha });
        Box::pin(async move {
            let response = self
                .request(reqwest::Method::POST, url)
                .json(&body)
                .send()
                .await
                .map_err(|e| -> BoxError { format!("create_branch request failed: {e}").into() })?;
            check_status(response, "create_branch").await?;
            Ok(())
        })
    }

    fn create_change_request(
        &self,
        repo: &RepoId,
        request: &ChangeRequest,
    ) -> RepoFuture<'_, CreatedRequest> {
        let pulls_url = format!("{GITHUB_API_URL}/repos/{}/{}/pulls", repo.owner, repo.name);
        let labels_url_base = format!("{GITHUB_API_URL}/repos/{}/{}/issues", repo.owner, repo.name);
        let body = json!({
            "title": request.title,
            "body": request.body,
            "head": request.head,
            "base": request.base,
        });
        let labels = request.labels.clone();
        Box::pin(async move {
            let response =
                self.request(reqwest::Method::POST, pulls_url).json(&body).send().await.map_err(
                    |e| -> BoxError { format!("create_change_request failed: {e}").into() },
                )?;
            let text = check_status(response, "create_change_request").await?;
            let created: CreatedPull = serde_json::from_str(&text).map_err(|e| -> BoxError {
                format!("create_change_request: unexpected response: {e}").into()
            })?;

            if !labels.is_empty() {
                let labels_url = format!("{labels_url_base}/{}/labels", created.number);
                let response = self
                    .request(reqwest::Method::POST, labels_url)
                    .json(&json!({ "labels": labels }))
                    .send()
                    .await
                    .map_err(|e| -> BoxError { format!("label request failed: {e}").into() })?;
                check_status(response, "add labels").await?;
            }

            Ok(CreatedRequest { number: created.number, url: created.html_url })
        })
    }

    fn add_comment(&self, repo: &RepoId, number: u64, body: &str) -> RepoFuture<'_, ()> {
        let url = format!(
            "{GITHUB_API_URL}/repos/{}/{}/issues/{number}/comments",
            repo.owner, repo.name
        );
        let payload = json!({ "body": body });
        Box::pin(async move {
            let response = self
                .request(reqwest::Method::POST, url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| -> BoxError { format!("add_comment request failed: {e}").into() })?;
            check_status(response, "add_comment").await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_content_handles_wrapped_base64() {
        // The contents API inserts newlines every 60 characters.
        let encoded = "IyBE\nb2Nz\nCg==";
        assert_eq!(decode_content(encoded).unwrap(), "# Docs\n");
    }

    #[test]
    fn decode_content_rejects_invalid_base64() {
        assert!(decode_content("!!!").is_err());
    }
}
