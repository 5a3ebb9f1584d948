//! Update planning: combines the classified change set and the indexed
//! documentation structure into an ordered plan of document creations,
//! updates, and navigation edits.
//!
//! The judgment of *which* documents need work is delegated to the LLM
//! collaborator; this module enforces the output schema and defaults so
//! downstream stages never branch on absent fields.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::navigation::{NavigationChange, NavOperation};
use super::patterns::MatchRules;
use super::RunContext;
use crate::config::DocsConfig;
use crate::context::ServiceContext;
use crate::ports::llm::CompletionRequest;
use crate::ports::repo::{EntryKind, TreeEntry};

/// Whether a planned update creates a new document or modifies one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    /// A new document is created.
    Create,
    /// An existing document is modified.
    #[default]
    Update,
}

/// Plan priority for display ordering in the change-request body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Must be addressed.
    High,
    /// Normal priority.
    #[default]
    Medium,
    /// Nice to have.
    Low,
}

fn default_reason() -> String {
    "Documentation update needed".into()
}

/// One proposed documentation creation or modification, prior to content
/// generation. Never mutated after planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedUpdate {
    /// Target documentation path.
    pub path: String,
    /// Create vs. update.
    #[serde(rename = "type", default)]
    pub update_type: UpdateType,
    /// Why this document needs work.
    #[serde(default = "default_reason")]
    pub reason: String,
    /// Display priority.
    #[serde(default)]
    pub priority: Priority,
    /// Source files this document covers.
    #[serde(default)]
    pub source_files: Vec<String>,
    /// Existing documents related to this one.
    #[serde(default)]
    pub related_docs: Vec<String>,
    /// Optional content outline suggested by the planner.
    #[serde(default)]
    pub suggested_content: Option<String>,
}

/// The finished plan, consumed by content generation and publishing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePlan {
    /// Prose summary of the plan.
    pub summary: String,
    /// Ordered document updates.
    pub updates: Vec<PlannedUpdate>,
    /// Flat, order-significant navigation edits.
    pub navigation_changes: Vec<NavigationChange>,
}

/// Raw planner response: navigation changes arrive grouped by target
/// group and are flattened in order.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlan {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    updates: Vec<PlannedUpdate>,
    #[serde(default)]
    navigation_changes: Vec<RawNavGroup>,
}

#[derive(Deserialize)]
struct RawNavGroup {
    group: String,
    #[serde(default)]
    changes: Vec<RawNavChange>,
}

#[derive(Deserialize)]
struct RawNavChange {
    operation: NavOperation,
    page: String,
}

impl RawPlan {
    fn normalize(self) -> UpdatePlan {
        let navigation_changes = self
            .navigation_changes
            .into_iter()
            .flat_map(|group| {
                group.changes.into_iter().map(move |change| NavigationChange {
                    operation: change.operation,
                    page: change.page,
                    group: group.group.clone(),
                })
            })
            .collect();

        UpdatePlan { summary: self.summary, updates: self.updates, navigation_changes }
    }
}

/// Plans documentation updates for a classified change set.
///
/// Populates `run.plan`.
///
/// # Errors
///
/// Returns a precondition error if classification or indexing has not run
/// yet, and a fatal error if the LLM planning call fails or returns an
/// unparsable plan.
pub async fn plan_updates(ctx: &ServiceContext, run: &mut RunContext) -> Result<(), String> {
    let analysis = run
        .analysis
        .as_ref()
        .ok_or_else(|| "planning requires a completed change analysis".to_string())?;
    let structure = run
        .structure
        .as_ref()
        .ok_or_else(|| "planning requires an indexed documentation structure".to_string())?;

    let prompt = build_planning_prompt(run, analysis, structure)?;
    let request = CompletionRequest { model: run.config.model.clone(), prompt, max_tokens: 8192 };
    let response = ctx
        .llm
        .complete(&request)
        .await
        .map_err(|e| format!("LLM update planning failed: {e}"))?;

    let raw: RawPlan = serde_json::from_str(&response.text)
        .map_err(|e| format!("failed to parse update plan: {e}"))?;
    let plan = raw.normalize();

    info!(
        updates = plan.updates.len(),
        navigation_changes = plan.navigation_changes.len(),
        "planned documentation updates"
    );
    run.plan = Some(plan);
    Ok(())
}

/// Builds the planning prompt from the serialized analysis and structure.
fn build_planning_prompt(
    run: &RunContext,
    analysis: &crate::pipeline::classify::ChangeAnalysis,
    structure: &crate::pipeline::structure::DocStructure,
) -> Result<String, String> {
    let analysis_json = serde_json::to_string_pretty(analysis)
        .map_err(|e| format!("failed to serialize change analysis: {e}"))?;
    let navigation_json = serde_json::to_string_pretty(&structure.navigation)
        .map_err(|e| format!("failed to serialize navigation: {e}"))?;

    let mut prompt = String::new();
    prompt.push_str("Plan documentation updates for this code change.\n\n");
    let _ = writeln!(prompt, "## Change Analysis\n\n{analysis_json}\n");
    let _ = writeln!(prompt, "## Documentation Tree\n\n```\n{}```\n", structure.tree);
    let _ = writeln!(prompt, "## Current Navigation\n\n{navigation_json}\n");
    if let Some(style) = &run.config.style_guide {
        let _ = writeln!(prompt, "## Style Guide\n\n{style}\n");
    }
    let _ = writeln!(
        prompt,
        "## Instructions\n\n\
         All documentation lives under `{docs_path}/`. Respond with JSON (no markdown fences):\n\
         {{\n  \
           \"summary\": \"<what the plan accomplishes>\",\n  \
           \"updates\": [{{\"path\": \"...\", \"type\": \"create|update\", \"reason\": \"...\",\n    \
             \"priority\": \"high|medium|low\", \"sourceFiles\": [...], \"relatedDocs\": [...],\n    \
             \"suggestedContent\": \"...\"}}],\n  \
           \"navigationChanges\": [{{\"group\": \"<group name>\",\n    \
             \"changes\": [{{\"operation\": \"add|move|remove\", \"page\": \"...\"}}]}}]\n\
         }}\n\n\
         Only plan updates that the change analysis justifies. Prefer updating\n\
         existing pages over creating new ones.",
        docs_path = run.config.docs_path,
    );
    Ok(prompt)
}

/// Plans initial documentation for a repository with no prior coverage.
///
/// Walks the source tree, collects important files (capped to bound
/// cost), derives a deterministic candidate documentation path for each,
/// and plans a creation only when nothing exists at the candidate path.
///
/// Populates `run.plan`.
///
/// # Errors
///
/// Returns an error if the source tree cannot be listed or candidate
/// existence probes fail with anything other than not-found.
pub async fn plan_bootstrap(ctx: &ServiceContext, run: &mut RunContext) -> Result<(), String> {
    let important = collect_important_files(ctx, run).await?;

    let mut updates = Vec::new();
    for source_path in &important {
        let candidate = candidate_doc_path(source_path, &run.config, &run.rules);
        let existing = ctx
            .repo
            .get_file(&run.docs_repo, &candidate, &run.branch)
            .await
            .map_err(|e| format!("Failed to probe candidate doc {candidate}: {e}"))?;
        if existing.is_some() {
            continue;
        }
        updates.push(PlannedUpdate {
            path: candidate,
            update_type: UpdateType::Create,
            reason: "initial documentation".into(),
            priority: Priority::Medium,
            source_files: vec![source_path.clone()],
            related_docs: Vec::new(),
            suggested_content: None,
        });
    }

    info!(
        important = important.len(),
        planned = updates.len(),
        "planned bootstrap documentation"
    );
    run.plan = Some(UpdatePlan {
        summary: "initial".into(),
        updates,
        navigation_changes: Vec::new(),
    });
    Ok(())
}

/// Walks the source repository tree collecting important, non-ignored
/// files, capped at the configured bootstrap maximum.
async fn collect_important_files(
    ctx: &ServiceContext,
    run: &RunContext,
) -> Result<Vec<String>, String> {
    let root = ctx
        .repo
        .list_dir(&run.source_repo, "", &run.source_branch)
        .await
        .map_err(|e| format!("Failed to list repository root: {e}"))?
        .unwrap_or_default();

    let mut stack: Vec<TreeEntry> = Vec::new();
    push_sorted(&mut stack, root);

    let mut important = Vec::new();
    while let Some(entry) = stack.pop() {
        if important.len() >= run.config.max_bootstrap_files {
            break;
        }
        if run.rules.is_ignored(&entry.path) {
            continue;
        }
        match entry.kind {
            EntryKind::File => {
                if run.rules.is_important(&entry.path) {
                    important.push(entry.path);
                }
            }
            EntryKind::Dir => {
                let children = ctx
                    .repo
                    .list_dir(&run.source_repo, &entry.path, &run.source_branch)
                    .await
                    .map_err(|e| format!("Failed to list {}: {e}", entry.path))?
                    .unwrap_or_default();
                push_sorted(&mut stack, children);
            }
        }
    }
    Ok(important)
}

fn push_sorted(stack: &mut Vec<TreeEntry>, mut entries: Vec<TreeEntry>) {
    entries.sort_by(|a, b| b.name.cmp(&a.name));
    stack.extend(entries);
}

/// Derives the deterministic candidate documentation path for a source
/// file: apply the longest matching path-mapping prefix, or fall back to
/// nesting under the docs root, then swap the extension.
#[must_use]
pub fn candidate_doc_path(source_path: &str, config: &DocsConfig, rules: &MatchRules) -> String {
    let mapped = rules
        .path_mappings()
        .iter()
        .filter(|(from, _)| {
            source_path == from.as_str()
                || source_path.strip_prefix(from.as_str()).is_some_and(|r| r.starts_with('/'))
        })
        .max_by_key(|(from, _)| from.len())
        .map_or_else(
            || format!("{}/{}", config.docs_path, source_path),
            |(from, to)| format!("{}{}", to, &source_path[from.len()..]),
        );

    match mapped.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() && !stem.ends_with('/') => {
            format!("{stem}{}", config.primary_doc_extension())
        }
        _ => format!("{mapped}{}", config.primary_doc_extension()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use chrono::Utc;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn raw_plan_applies_defaults() {
        let raw: RawPlan = serde_json::from_str(
            r#"{"summary": "s", "updates": [{"path": "docs/a.md"}]}"#,
        )
        .unwrap();
        let plan = raw.normalize();

        let update = &plan.updates[0];
        assert_eq!(update.update_type, UpdateType::Update);
        assert_eq!(update.reason, "Documentation update needed");
        assert_eq!(update.priority, Priority::Medium);
        assert!(update.source_files.is_empty());
        assert!(update.related_docs.is_empty());
        assert!(update.suggested_content.is_none());
    }

    #[test]
    fn grouped_navigation_changes_flatten_in_order() {
        let raw: RawPlan = serde_json::from_str(
            r#"{
                "summary": "s",
                "navigationChanges": [
                    {"group": "Guides", "changes": [
                        {"operation": "add", "page": "docs/a.md"},
                        {"operation": "remove", "page": "docs/old.md"}
                    ]},
                    {"group": "Reference", "changes": [
                        {"operation": "move", "page": "docs/b.md"}
                    ]}
                ]
            }"#,
        )
        .unwrap();
        let plan = raw.normalize();

        assert_eq!(plan.navigation_changes.len(), 3);
        assert_eq!(plan.navigation_changes[0].operation, NavOperation::Add);
        assert_eq!(plan.navigation_changes[0].group, "Guides");
        assert_eq!(plan.navigation_changes[1].operation, NavOperation::Remove);
        assert_eq!(plan.navigation_changes[2].group, "Reference");
        assert_eq!(plan.navigation_changes[2].page, "docs/b.md");
    }

    #[test]
    fn candidate_path_falls_back_to_docs_root() {
        let config = DocsConfig::default();
        let rules = config.match_rules();
        assert_eq!(
            candidate_doc_path("app/Services/Billing.php", &config, &rules),
            "docs/app/Services/Billing.md"
        );
    }

    #[test]
    fn candidate_path_applies_longest_mapping() {
        let mut config = DocsConfig::default();
        config.path_mappings = BTreeMap::from([
            ("app".to_string(), "docs/app".to_string()),
            ("app/Models".to_string(), "docs/models".to_string()),
        ]);
        let rules = config.match_rules();
        assert_eq!(
            candidate_doc_path("app/Models/User.php", &config, &rules),
            "docs/models/User.md"
        );
        assert_eq!(
            candidate_doc_path("app/Services/Billing.php", &config, &rules),
            "docs/app/Services/Billing.md"
        );
    }

    #[test]
    fn candidate_path_without_extension_appends_one() {
        let config = DocsConfig::default();
        let rules = config.match_rules();
        assert_eq!(candidate_doc_path("Makefile", &config, &rules), "docs/Makefile.md");
    }

    fn make_ctx(interactions: Vec<Interaction>) -> ServiceContext {
        let cassette = Cassette { name: "test".into(), recorded_at: Utc::now(), interactions };
        ServiceContext::replaying_from_cassette(&cassette)
    }

    fn repo_interaction(seq: u64, method: &str, output: serde_json::Value) -> Interaction {
        Interaction { seq, port: "repo".into(), method: method.into(), input: json!({}), output }
    }

    #[tokio::test]
    async fn plan_updates_requires_upstream_stages() {
        let ctx = make_ctx(Vec::new());
        let mut run = RunContext::bootstrap(DocsConfig::default(), "acme", "widgets", "main");

        let err = plan_updates(&ctx, &mut run).await.unwrap_err();
        assert!(err.contains("requires a completed change analysis"));
    }

    #[tokio::test]
    async fn bootstrap_plans_only_missing_candidates() {
        let mut config = DocsConfig::default();
        config.important_patterns = vec!["app/Models/**".into()];
        let mut run = RunContext::bootstrap(config, "acme", "widgets", "main");

        let ctx = make_ctx(vec![
            repo_interaction(
                0,
                "list_dir",
                json!({"ok": [{"name": "app", "path": "app", "kind": "dir"}]}),
            ),
            repo_interaction(
                1,
                "list_dir",
                json!({"ok": [{"name": "Models", "path": "app/Models", "kind": "dir"}]}),
            ),
            repo_interaction(
                2,
                "list_dir",
                json!({"ok": [
                    {"name": "Invoice.php", "path": "app/Models/Invoice.php", "kind": "file"},
                    {"name": "User.php", "path": "app/Models/User.php", "kind": "file"}
                ]}),
            ),
            // Invoice doc already exists, User doc does not.
            repo_interaction(
                3,
                "get_file",
                json!({"ok": {"content": "existing", "revision": "r1"}}),
            ),
            repo_interaction(4, "get_file", json!({"ok": null})),
        ]);

        plan_bootstrap(&ctx, &mut run).await.unwrap();
        let plan = run.plan.unwrap();

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].path, "docs/app/Models/User.md");
        assert_eq!(plan.updates[0].update_type, UpdateType::Create);
        assert_eq!(plan.updates[0].source_files, vec!["app/Models/User.php"]);
        assert_eq!(plan.summary, "initial");
    }

    #[tokio::test]
    async fn bootstrap_skips_ignored_directories() {
        let mut config = DocsConfig::default();
        config.important_patterns = vec!["app/**".into()];
        config.ignore_patterns = vec!["vendor/**".into()];
        let mut run = RunContext::bootstrap(config, "acme", "widgets", "main");

        let ctx = make_ctx(vec![
            repo_interaction(
                0,
                "list_dir",
                json!({"ok": [
                    {"name": "app", "path": "app", "kind": "dir"},
                    {"name": "vendor", "path": "vendor", "kind": "dir"}
                ]}),
            ),
            // Only app is listed; vendor is pruned without a listing call.
            repo_interaction(
                1,
                "list_dir",
                json!({"ok": [{"name": "Kernel.php", "path": "app/Kernel.php", "kind": "file"}]}),
            ),
            repo_interaction(2, "get_file", json!({"ok": null})),
        ]);

        plan_bootstrap(&ctx, &mut run).await.unwrap();
        let plan = run.plan.unwrap();
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].path, "docs/app/Kernel.md");
    }

    #[tokio::test]
    async fn bootstrap_collection_stops_at_the_file_cap() {
        let mut config = DocsConfig::default();
        config.important_patterns = vec!["app/**".into()];
        config.max_bootstrap_files = 2;
        let mut run = RunContext::bootstrap(config, "acme", "widgets", "main");

        // Three important files, cap of two. No probe occurs for the file
        // beyond the cap: an extra get_file call would exhaust the cassette.
        let ctx = make_ctx(vec![
            repo_interaction(
                0,
                "list_dir",
                json!({"ok": [{"name": "app", "path": "app", "kind": "dir"}]}),
            ),
            repo_interaction(
                1,
                "list_dir",
                json!({"ok": [
                    {"name": "Alpha.php", "path": "app/Alpha.php", "kind": "file"},
                    {"name": "Beta.php", "path": "app/Beta.php", "kind": "file"},
                    {"name": "Gamma.php", "path": "app/Gamma.php", "kind": "file"}
                ]}),
            ),
            repo_interaction(2, "get_file", json!({"ok": null})),
            repo_interaction(3, "get_file", json!({"ok": null})),
        ]);

        plan_bootstrap(&ctx, &mut run).await.unwrap();
        let plan = run.plan.unwrap();

        assert_eq!(plan.updates.len(), 2);
        assert_eq!(plan.updates[0].path, "docs/app/Alpha.md");
        assert_eq!(plan.updates[1].path, "docs/app/Beta.md");
    }
}
