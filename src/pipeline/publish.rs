//! Publishing: turns generated content into a branch, file commits, and
//! a change request on the docs repository.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::RunContext;
use crate::context::ServiceContext;
use crate::ports::repo::{ChangeRequest, CreatedRequest};

/// Outcome of the publishing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishResult {
    /// The branch the documents were committed to.
    pub branch: String,
    /// The opened change request, unless PR creation is disabled.
    pub request: Option<CreatedRequest>,
    /// Number of files committed, navigation manifest included.
    pub files_written: usize,
}

/// Publishes generated content: allocates a branch, commits every
/// document plus the navigation manifest, and opens a change request.
///
/// # Errors
///
/// Returns a precondition error if generation has not run yet, and a
/// fatal error on any branch, commit, or change-request failure. The
/// cross-reference comment on the originating pull request is the one
/// best-effort step.
pub async fn publish(ctx: &ServiceContext, run: &RunContext) -> Result<PublishResult, String> {
    let content = run
        .content
        .as_ref()
        .ok_or_else(|| "publishing requires generated content".to_string())?;
    if content.docs.is_empty() && content.navigation.is_none() {
        info!("nothing to publish");
        return Ok(PublishResult { branch: run.branch.clone(), request: None, files_written: 0 });
    }

    let head = ctx
        .repo
        .branch_head(&run.docs_repo, &run.branch)
        .await
        .map_err(|e| format!("Failed to resolve head of {}: {e}", run.branch))?;
    let branch = branch_name(&run.config.templates.branch_prefix, &head, &ctx.id_gen.generate_id());

    let exists = ctx
        .repo
        .branch_exists(&run.docs_repo, &branch)
        .await
        .map_err(|e| format!("Failed to check branch {branch}: {e}"))?;
    if exists {
        info!(branch = %branch, "branch already exists, reusing");
    } else {
        ctx.repo
            .create_branch(&run.docs_repo, &branch, &head)
            .await
            .map_err(|e| format!("Failed to create branch {branch}: {e}"))?;
    }

    let mut files_written = 0;
    for doc in &content.docs {
        let message = format!("docs: update {}", doc.path);
        upsert(ctx, run, &branch, &doc.path, &doc.body, &message).await?;
        files_written += 1;
    }
    if let Some(navigation) = &content.navigation {
        upsert(ctx, run, &branch, &navigation.path, &navigation.body, "docs: update navigation")
            .await?;
        files_written += 1;
    }

    if !run.config.create_pr {
        info!(branch = %branch, files = files_written, "branch pushed, change request disabled");
        return Ok(PublishResult { branch, request: None, files_written });
    }

    let title = render_template(&run.config.templates.title, run);
    let body = render_body(run, ctx.clock.now());

    let created = ctx
        .repo
        .create_change_request(
            &run.docs_repo,
            &ChangeRequest {
                title,
                body,
                head: branch.clone(),
                base: run.branch.clone(),
                labels: run.config.pr_labels.clone(),
            },
        )
        .await
        .map_err(|e| format!("Failed to open change request from {branch}: {e}"))?;
    info!(number = created.number, url = %created.url, "opened change request");

    if let Some(pr) = &run.pr {
        let comment =
            format!("Documentation updates for this pull request: {}", created.url);
        if let Err(e) = ctx.repo.add_comment(&run.source_repo, pr.number, &comment).await {
            warn!(number = pr.number, error = %e, "failed to post cross-reference comment");
        }
    }

    Ok(PublishResult { branch, request: Some(created), files_written })
}

/// Deterministic branch name: prefix + short head SHA + uniqueness token.
fn branch_name(prefix: &str, head: &str, token: &str) -> String {
    let short = head.get(..7).unwrap_or(head);
    format!("{prefix}{short}-{token}")
}

/// Probes for an existing blob to obtain its revision marker, then writes
/// the file with the marker attached only when present.
async fn upsert(
    ctx: &ServiceContext,
    run: &RunContext,
    branch: &str,
    path: &str,
    body: &str,
    message: &str,
) -> Result<(), String> {
    let existing = ctx
        .repo
        .get_file(&run.docs_repo, path, branch)
        .await
        .map_err(|e| format!("Failed to probe {path} on {branch}: {e}"))?;
    let revision = existing.as_ref().map(|f| f.revision.as_str());
    ctx.repo
        .put_file(&run.docs_repo, branch, path, body, message, revision)
        .await
        .map_err(|e| format!("Failed to write {path} on {branch}: {e}"))
}

/// Renders the change-request body: template substitution, the rendered
/// change list, and a generation timestamp footer.
fn render_body(run: &RunContext, generated_at: DateTime<Utc>) -> String {
    let body = render_template(&run.config.templates.body, run)
        .replace("{changes}", &render_changes(run));
    format!("{body}\n_Generated at {}._\n", generated_at.format("%Y-%m-%d %H:%M UTC"))
}

/// Substitutes `{prNumber}` and `{prTitle}` tokens. Bootstrap runs have
/// no originating pull request and substitute fixed markers instead.
fn render_template(template: &str, run: &RunContext) -> String {
    let (number, title) = match &run.pr {
        Some(pr) => (pr.number.to_string(), pr.title.clone()),
        None => ("initial".to_string(), "initial documentation".to_string()),
    };
    template.replace("{prNumber}", &number).replace("{prTitle}", &title)
}

/// Renders the bullet list substituted for `{changes}` in the body.
fn render_changes(run: &RunContext) -> String {
    let Some(content) = &run.content else {
        return String::new();
    };
    let mut changes = String::new();
    for doc in &content.docs {
        let _ = writeln!(changes, "- `{}` — {}", doc.path, doc.reason);
    }
    if let Some(navigation) = &content.navigation {
        for applied in &navigation.applied {
            let _ = writeln!(
                changes,
                "- navigation: {:?} `{}` in **{}**",
                applied.operation, applied.page, applied.group
            );
        }
    }
    changes
}
