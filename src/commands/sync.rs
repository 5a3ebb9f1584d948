//! `docsync sync`: process one pull-request event.

use std::path::Path;

use tracing::info;

use crate::config::DocsConfig;
use crate::context::ServiceContext;
use crate::event::PullRequestEvent;
use crate::pipeline::{run_change_pipeline, RunContext};

/// Runs the change pipeline for the event payload at `event_path`.
///
/// # Errors
///
/// Returns an error if the config or event cannot be loaded, or if any
/// pipeline stage fails.
pub async fn run_with_context(
    ctx: &ServiceContext,
    event_path: &Path,
    config_path: &Path,
) -> Result<(), String> {
    let config = DocsConfig::load(config_path)?;
    let payload = std::fs::read_to_string(event_path)
        .map_err(|e| format!("Failed to read event {}: {e}", event_path.display()))?;
    let event = PullRequestEvent::from_json(&payload)?;

    if !event.is_actionable(&config) {
        info!(action = %event.action, "event is not actionable, skipping");
        println!("Skipped: event is not actionable");
        return Ok(());
    }

    let mut run = RunContext::from_event(config, &event)?;
    let outcome = run_change_pipeline(ctx, &mut run).await;
    let result = outcome.map_err(|e| {
        format!("Sync failed for {} PR #{}: {e}", run.source_repo, event.pull_request.number)
    })?;

    match &result.request {
        Some(request) => println!(
            "Published {} file(s) on {} — {}",
            result.files_written, result.branch, request.url
        ),
        None => println!("Published {} file(s) on {}", result.files_written, result.branch),
    }
    Ok(())
}
