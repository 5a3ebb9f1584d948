//! `docsync bootstrap`: generate initial documentation for a repository.

use std::path::Path;

use crate::config::DocsConfig;
use crate::context::ServiceContext;
use crate::pipeline::{run_bootstrap_pipeline, RunContext};

/// Runs the bootstrap pipeline against the named repository.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or any pipeline stage
/// fails.
pub async fn run_with_context(
    ctx: &ServiceContext,
    owner: &str,
    repo: &str,
    branch: &str,
    config_path: &Path,
) -> Result<(), String> {
    let config = DocsConfig::load(config_path)?;
    let mut run = RunContext::bootstrap(config, owner, repo, branch);
    let result = run_bootstrap_pipeline(ctx, &mut run)
        .await
        .map_err(|e| format!("Bootstrap failed for {}/{repo}: {e}", owner))?;

    if result.files_written == 0 {
        println!("Nothing to bootstrap: documentation already covers the important files");
        return Ok(());
    }
    match &result.request {
        Some(request) => println!(
            "Bootstrapped {} file(s) on {} — {}",
            result.files_written, result.branch, request.url
        ),
        None => println!("Bootstrapped {} file(s) on {}", result.files_written, result.branch),
    }
    Ok(())
}
