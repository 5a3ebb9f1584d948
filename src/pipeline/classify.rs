//! Change classification: turns a raw diff listing into structured,
//! categorized change records and an aggregate analysis.
//!
//! Local classification (categories, significance flags) is heuristic and
//! cheap; the narrative summary and related-file hints come from the LLM
//! collaborator. The collaborator result is load-bearing here — a failed
//! or unparsable response fails the whole run.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::RunContext;
use crate::context::ServiceContext;
use crate::ports::llm::{CompletionRequest, CompletionResponse};
use crate::ports::repo::ChangedFile;

/// Longest patch excerpt included per file in the analysis prompt.
const PATCH_EXCERPT_LIMIT: usize = 1500;

/// The kind of change a record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// The file was added.
    Added,
    /// The file was modified (also covers renames).
    Modified,
    /// The file was deleted.
    Deleted,
}

impl ChangeKind {
    /// Maps a hosting-API status tag onto a change kind.
    #[must_use]
    pub fn from_status(status: &str) -> Self {
        match status {
            "added" => Self::Added,
            "removed" | "deleted" => Self::Deleted,
            _ => Self::Modified,
        }
    }
}

/// Heuristic markers derived from diff text indicating API-shape-relevant
/// changes, plus a filename-based test flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignificanceFlags {
    /// The patch mentions an export.
    pub has_exports: bool,
    /// The patch mentions an interface declaration.
    pub has_interfaces: bool,
    /// The patch mentions a class declaration.
    pub has_classes: bool,
    /// The patch mentions a type declaration.
    pub has_type_decls: bool,
    /// The patch mentions an enum declaration.
    pub has_enums: bool,
    /// The file name carries a test/spec marker.
    pub is_test: bool,
}

impl SignificanceFlags {
    /// Returns `true` if any API-shape flag is set (the test flag does not
    /// count).
    #[must_use]
    pub fn any_api_change(&self) -> bool {
        self.has_exports
            || self.has_interfaces
            || self.has_classes
            || self.has_type_decls
            || self.has_enums
    }
}

/// One changed file, classified. Immutable after the classification stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Path of the changed file.
    pub path: String,
    /// Unified-diff patch text (empty when the host provided none).
    pub patch: String,
    /// The kind of change.
    pub kind: ChangeKind,
    /// Heuristic significance markers.
    pub flags: SignificanceFlags,
    /// Category derived from the parent directory.
    pub category: String,
    /// Related files reported by the collaborator (never contains `path`).
    pub related_files: Vec<String>,
}

/// Aggregate result of the classification stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeAnalysis {
    /// Per-file change records.
    pub records: Vec<ChangeRecord>,
    /// Union of locally derived and collaborator-reported impacted areas.
    pub impacted_categories: BTreeSet<String>,
    /// Whether the change set is significant for documentation.
    pub significant: bool,
    /// Prose summary of the change set.
    pub summary: String,
}

/// Derives the category from the second-to-last path segment.
///
/// Paths with fewer than two segments yield the empty string.
#[must_use]
pub fn category_of(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 2 {
        return String::new();
    }
    segments[segments.len() - 2].to_string()
}

/// Returns `true` if the file name carries a test/spec marker.
#[must_use]
pub fn is_test_file(path: &str) -> bool {
    if path.split('/').any(|seg| seg == "tests" || seg == "test" || seg == "__tests__") {
        return true;
    }
    let name = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
    if [".test.", ".spec.", "_test.", "test_"].iter().any(|marker| name.contains(marker)) {
        return true;
    }
    let stem = name.rsplit_once('.').map_or(name.as_str(), |(stem, _)| stem);
    stem.ends_with("test") || stem.ends_with("spec")
}

/// Computes significance flags from the patch text and file name.
#[must_use]
pub fn significance_flags(path: &str, patch: &str) -> SignificanceFlags {
    SignificanceFlags {
        has_exports: patch.contains("export "),
        has_interfaces: patch.contains("interface "),
        has_classes: patch.contains("class "),
        has_type_decls: patch.contains("type ") || patch.contains("typedef"),
        has_enums: patch.contains("enum "),
        is_test: is_test_file(path),
    }
}

/// Builds one classified record per changed file.
#[must_use]
pub fn build_records(files: &[ChangedFile]) -> Vec<ChangeRecord> {
    files
        .iter()
        .map(|file| {
            let patch = file.patch.clone().unwrap_or_default();
            ChangeRecord {
                flags: significance_flags(&file.path, &patch),
                category: category_of(&file.path),
                kind: ChangeKind::from_status(&file.status),
                related_files: Vec::new(),
                path: file.path.clone(),
                patch,
            }
        })
        .collect()
}

/// Aggregates impacted categories from the records, excluding test files
/// and records without a derivable category.
fn local_impacted_categories(records: &[ChangeRecord]) -> BTreeSet<String> {
    records
        .iter()
        .filter(|r| !r.flags.is_test && !r.category.is_empty())
        .map(|r| r.category.clone())
        .collect()
}

/// Classifies the triggering pull request's changed files.
///
/// Populates `run.analysis`.
///
/// # Errors
///
/// Returns an error if the diff listing cannot be fetched, if no trigger
/// PR is present, or if the LLM analysis fails or is unparsable — local
/// classification alone is not sufficient to proceed.
pub async fn classify_changes(ctx: &ServiceContext, run: &mut RunContext) -> Result<(), String> {
    let pr = run
        .pr
        .as_ref()
        .ok_or_else(|| "classification requires a triggering pull request".to_string())?;

    let files = ctx
        .repo
        .list_changed_files(&run.source_repo, pr.number)
        .await
        .map_err(|e| format!("Failed to list changed files for PR #{}: {e}", pr.number))?;

    let mut records = build_records(&files);
    let local_categories = local_impacted_categories(&records);

    let prompt = build_classification_prompt(&records);
    let request = CompletionRequest { model: run.config.model.clone(), prompt, max_tokens: 4096 };
    let response: CompletionResponse = ctx
        .llm
        .complete(&request)
        .await
        .map_err(|e| format!("LLM change analysis failed: {e}"))?;

    let analysis = merge_analysis(&response.text, &mut records, local_categories)?;
    info!(
        files = analysis.records.len(),
        categories = analysis.impacted_categories.len(),
        significant = analysis.significant,
        "classified change set"
    );
    run.analysis = Some(analysis);
    Ok(())
}

/// Builds the LLM prompt for change-set analysis.
fn build_classification_prompt(records: &[ChangeRecord]) -> String {
    let mut prompt = String::new();
    prompt.push_str("Analyze this code change set for documentation impact.\n\n## Changed Files\n\n");

    for record in records {
        let _ = writeln!(prompt, "### {} ({:?})", record.path, record.kind);
        if !record.category.is_empty() {
            let _ = writeln!(prompt, "Category: {}", record.category);
        }
        if record.flags.is_test {
            prompt.push_str("Test file.\n");
        }
        if !record.patch.is_empty() {
            let excerpt: String = record.patch.chars().take(PATCH_EXCERPT_LIMIT).collect();
            let _ = writeln!(prompt, "```diff\n{excerpt}\n```");
        }
        prompt.push('\n');
    }

    prompt.push_str(
        "## Instructions\n\n\
         Respond with JSON (no markdown fences):\n\
         {\n  \
           \"summary\": \"<prose summary of the change set>\",\n  \
           \"impacted_areas\": [\"<area>\", ...],\n  \
           \"significant\": true|false,\n  \
           \"related_files\": {\"<changed path>\": [\"<related file>\", ...]}\n\
         }\n\n\
         - summary: What changed and why it matters for documentation.\n\
         - impacted_areas: Functional areas touched by this change set.\n\
         - significant: Whether documentation likely needs to change.\n\
         - related_files: Other files each change is coupled to.\n",
    );

    prompt
}

/// Merges the collaborator response with local classification.
///
/// Impacted areas are the set union; significance is the collaborator
/// verdict OR any local API-shape flag; related files merge per record
/// with self-references filtered out.
fn merge_analysis(
    response_text: &str,
    records: &mut [ChangeRecord],
    local_categories: BTreeSet<String>,
) -> Result<ChangeAnalysis, String> {
    #[derive(Deserialize)]
    struct LlmResponse {
        summary: String,
        #[serde(default)]
        impacted_areas: Vec<String>,
        #[serde(default)]
        significant: bool,
        #[serde(default)]
        related_files: HashMap<String, Vec<String>>,
    }

    let parsed: LlmResponse = serde_json::from_str(response_text)
        .map_err(|e| format!("failed to parse LLM change analysis: {e}"))?;

    let mut impacted = local_categories;
    impacted.extend(parsed.impacted_areas);

    let locally_significant = records.iter().any(|r| r.flags.any_api_change());

    for record in records.iter_mut() {
        if let Some(related) = parsed.related_files.get(&record.path) {
            record.related_files =
                related.iter().filter(|f| *f != &record.path).cloned().collect();
        }
    }

    Ok(ChangeAnalysis {
        records: records.to_vec(),
        impacted_categories: impacted,
        significant: parsed.significant || locally_significant,
        summary: parsed.summary,
    })
}
