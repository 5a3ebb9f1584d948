//! Content generation: turns the plan into document bodies and a
//! reconciled navigation manifest.
//!
//! Generation calls are load-bearing — a failed or empty completion fails
//! the run. Source-file reads that merely enrich the prompt degrade to an
//! omitted excerpt instead.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::cache::GenerationCache;
use super::navigation::{apply_changes, NavigationChange, NavigationManifest};
use super::plan::{PlannedUpdate, UpdateType};
use super::RunContext;
use crate::context::ServiceContext;
use crate::ports::llm::CompletionRequest;

/// Longest source-file excerpt included per file in a generation prompt.
const SOURCE_EXCERPT_LIMIT: usize = 6000;

/// One generated document body, ready for publishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDoc {
    /// Target documentation path.
    pub path: String,
    /// The full document body.
    pub body: String,
    /// Create vs. update, carried through from the plan.
    pub update_type: UpdateType,
    /// Why this document was generated.
    pub reason: String,
}

/// The reconciled navigation manifest, when the plan edited navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationUpdate {
    /// Manifest path to write.
    pub path: String,
    /// Serialized manifest body.
    pub body: String,
    /// The changes that were applied, for the change-request body.
    pub applied: Vec<NavigationChange>,
}

/// Terminal artifact of the generation stage, handed to the publisher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    /// Generated documents, in plan order.
    pub docs: Vec<GeneratedDoc>,
    /// The navigation manifest rewrite, if any changes were planned.
    pub navigation: Option<NavigationUpdate>,
}

/// Generates content for every planned update and reconciles navigation.
///
/// Populates `run.content`. When a cache is supplied (bootstrap runs), a
/// cached body is reused verbatim and no generation call occurs for that
/// path; fresh bodies are stored back into the cache.
///
/// # Errors
///
/// Returns a precondition error if planning or indexing has not run yet,
/// and a fatal error if any generation call fails.
pub async fn generate_content(
    ctx: &ServiceContext,
    run: &mut RunContext,
    mut cache: Option<&mut GenerationCache>,
) -> Result<(), String> {
    let plan = run
        .plan
        .as_ref()
        .ok_or_else(|| "generation requires a completed plan".to_string())?;
    let structure = run
        .structure
        .as_ref()
        .ok_or_else(|| "generation requires an indexed documentation structure".to_string())?;

    let mut docs = Vec::with_capacity(plan.updates.len());
    for update in &plan.updates {
        let body = match cache.as_deref_mut().and_then(|c| c.get(&update.path)) {
            Some(cached) => {
                info!(path = %update.path, "reusing cached document body");
                cached.to_string()
            }
            None => {
                let body = generate_body(ctx, run, update).await?;
                if let Some(cache) = cache.as_deref_mut() {
                    cache.insert(update.path.clone(), body.clone());
                }
                body
            }
        };
        docs.push(GeneratedDoc {
            path: update.path.clone(),
            body,
            update_type: update.update_type,
            reason: update.reason.clone(),
        });
    }

    let navigation = if plan.navigation_changes.is_empty() {
        None
    } else {
        let mut groups = structure.navigation.clone();
        apply_changes(&mut groups, &plan.navigation_changes);
        let manifest = NavigationManifest { navigation: groups };
        let body = serde_json::to_string_pretty(&manifest)
            .map_err(|e| format!("failed to serialize navigation manifest: {e}"))?;
        let path = structure.manifest_path.clone().unwrap_or_else(|| {
            format!("{}/{}", run.config.docs_path, run.config.manifest_name)
        });
        Some(NavigationUpdate { path, body, applied: plan.navigation_changes.clone() })
    };

    info!(docs = docs.len(), navigation = navigation.is_some(), "generated content");
    run.content = Some(GeneratedContent { docs, navigation });
    Ok(())
}

/// Runs one generation call for a planned update.
async fn generate_body(
    ctx: &ServiceContext,
    run: &RunContext,
    update: &PlannedUpdate,
) -> Result<String, String> {
    let prompt = build_generation_prompt(ctx, run, update).await;
    let request = CompletionRequest { model: run.config.model.clone(), prompt, max_tokens: 8192 };
    let response = ctx
        .llm
        .complete(&request)
        .await
        .map_err(|e| format!("Content generation for {} failed: {e}", update.path))?;
    if response.text.trim().is_empty() {
        return Err(format!("Content generation for {} returned an empty body", update.path));
    }
    Ok(response.text)
}

/// Builds the generation prompt, enriching it with source-file excerpts
/// where they can be read. A failed read omits the excerpt.
async fn build_generation_prompt(
    ctx: &ServiceContext,
    run: &RunContext,
    update: &PlannedUpdate,
) -> String {
    let verb = match update.update_type {
        UpdateType::Create => "Write",
        UpdateType::Update => "Rewrite",
    };
    let mut prompt = format!(
        "{verb} the documentation page `{}`.\n\nReason: {}\n\n",
        update.path, update.reason
    );

    for source in &update.source_files {
        match ctx.repo.get_file(&run.source_repo, source, &run.source_branch).await {
            Ok(Some(file)) => {
                let excerpt: String = file.content.chars().take(SOURCE_EXCERPT_LIMIT).collect();
                let _ = writeln!(prompt, "## Source: {source}\n\n```\n{excerpt}\n```\n");
            }
            Ok(None) => {}
            Err(e) => {
                warn!(path = %source, error = %e, "failed to read source for generation prompt");
            }
        }
    }

    if !update.related_docs.is_empty() {
        let _ = writeln!(prompt, "## Related Pages\n\n{}\n", update.related_docs.join("\n"));
    }
    if let Some(hints) = &update.suggested_content {
        let _ = writeln!(prompt, "## Suggested Outline\n\n{hints}\n");
    }
    if let Some(style) = &run.config.style_guide {
        let _ = writeln!(prompt, "## Style Guide\n\n{style}\n");
    }

    prompt.push_str(
        "## Instructions\n\n\
         Respond with the complete Markdown body of the page and nothing else. \
         No preamble, no fences around the whole document.\n",
    );
    prompt
}
