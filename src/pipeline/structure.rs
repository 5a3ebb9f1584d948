//! Structure indexing: walks the documentation tree and builds a
//! searchable structure plus a navigation snapshot.
//!
//! Traversal degrades gracefully — a subdirectory that cannot be listed
//! contributes nothing instead of aborting the run. Reference extraction
//! is best-effort enrichment with the same degradation per file.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::navigation::{NavigationGroup, NavigationManifest};
use super::RunContext;
use crate::context::ServiceContext;
use crate::ports::llm::CompletionRequest;
use crate::ports::repo::{EntryKind, RepoId, TreeEntry};

/// One documentation file (or directory) found during traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocFile {
    /// Path from the repository root.
    pub path: String,
    /// File or directory.
    pub kind: EntryKind,
    /// Category derived from the parent directory, when inside one.
    pub category: Option<String>,
    /// Other docs/code files this document mentions (best-effort).
    pub references: Vec<String>,
}

/// Snapshot of the documentation tree, built once per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocStructure {
    /// Documentation files found during traversal.
    pub files: Vec<DocFile>,
    /// Category names (direct child directories of the docs root).
    pub categories: BTreeSet<String>,
    /// Navigation groups parsed from the manifest, if one was found.
    pub navigation: Vec<NavigationGroup>,
    /// Where the manifest was found, for writing it back.
    pub manifest_path: Option<String>,
    /// The manifest's revision marker at read time.
    pub manifest_revision: Option<String>,
    /// Human-readable tree rendering.
    pub tree: String,
}

/// Indexes the documentation tree of the docs repository.
///
/// Populates `run.structure`.
///
/// # Errors
///
/// Returns an error if the navigation manifest lookup fails with anything
/// other than not-found, or if a found manifest cannot be parsed.
pub async fn index_structure(ctx: &ServiceContext, run: &mut RunContext) -> Result<(), String> {
    let mut structure =
        walk_tree(ctx, &run.docs_repo, &run.config.docs_path, &run.branch, &run.rules).await;

    load_manifest(ctx, run, &mut structure).await?;

    if run.config.extract_references {
        enrich_references(ctx, run, &mut structure).await;
    }

    info!(
        files = structure.files.len(),
        categories = structure.categories.len(),
        groups = structure.navigation.len(),
        "indexed documentation structure"
    );
    run.structure = Some(structure);
    Ok(())
}

/// Walks the docs tree depth-first, building the file list, category set,
/// and tree rendering. Listing failures degrade to empty subtrees.
async fn walk_tree(
    ctx: &ServiceContext,
    docs_repo: &RepoId,
    docs_path: &str,
    branch: &str,
    rules: &crate::pipeline::patterns::MatchRules,
) -> DocStructure {
    let mut structure = DocStructure::default();

    let root_entries = match ctx.repo.list_dir(docs_repo, docs_path, branch).await {
        Ok(Some(entries)) => entries,
        Ok(None) => {
            warn!(path = docs_path, "documentation root not found, starting from empty");
            return structure;
        }
        Err(e) => {
            warn!(path = docs_path, error = %e, "failed to list documentation root");
            return structure;
        }
    };

    // Explicit stack: entries are pushed in reverse so the rendering
    // preserves listing order depth-first.
    let mut stack: Vec<(TreeEntry, usize)> = Vec::new();
    push_sorted(&mut stack, root_entries, 0);

    while let Some((entry, depth)) = stack.pop() {
        match entry.kind {
            EntryKind::Dir => {
                let _ = writeln!(structure.tree, "{}{}/", "  ".repeat(depth), entry.name);
                if depth == 0 {
                    structure.categories.insert(entry.name.clone());
                }
                match ctx.repo.list_dir(docs_repo, &entry.path, branch).await {
                    Ok(Some(children)) => push_sorted(&mut stack, children, depth + 1),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(path = %entry.path, error = %e, "failed to list subdirectory, skipping subtree");
                    }
                }
            }
            EntryKind::File => {
                let _ = writeln!(structure.tree, "{}{}", "  ".repeat(depth), entry.name);
                if rules.is_doc_file(&entry.path) {
                    structure.files.push(DocFile {
                        category: parent_category(&entry.path, docs_path),
                        path: entry.path,
                        kind: EntryKind::File,
                        references: Vec::new(),
                    });
                }
            }
        }
    }

    structure
}

/// Pushes entries onto the stack sorted so they pop in name order.
fn push_sorted(stack: &mut Vec<(TreeEntry, usize)>, mut entries: Vec<TreeEntry>, depth: usize) {
    entries.sort_by(|a, b| b.name.cmp(&a.name));
    for entry in entries {
        stack.push((entry, depth));
    }
}

/// The parent directory name of `path`, unless the parent is the docs root.
fn parent_category(path: &str, docs_path: &str) -> Option<String> {
    let parent = path.rsplit_once('/').map(|(dir, _)| dir)?;
    if parent == docs_path {
        return None;
    }
    parent.rsplit('/').next().map(String::from)
}

/// Two-tier manifest lookup: `<docsRoot>/<manifestName>` first (monorepo
/// layout), then `<manifestName>` at the repository root (single-repo
/// layout). Not-found falls through; other errors propagate.
async fn load_manifest(
    ctx: &ServiceContext,
    run: &RunContext,
    structure: &mut DocStructure,
) -> Result<(), String> {
    let manifest_name = &run.config.manifest_name;
    let candidates =
        [format!("{}/{}", run.config.docs_path, manifest_name), manifest_name.clone()];

    for candidate in candidates {
        let found = ctx
            .repo
            .get_file(&run.docs_repo, &candidate, &run.branch)
            .await
            .map_err(|e| format!("Failed to read navigation manifest {candidate}: {e}"))?;
        if let Some(file) = found {
            let manifest: NavigationManifest = serde_json::from_str(&file.content)
                .map_err(|e| format!("Failed to parse navigation manifest {candidate}: {e}"))?;
            structure.navigation = manifest.navigation;
            structure.manifest_path = Some(candidate);
            structure.manifest_revision = Some(file.revision);
            return Ok(());
        }
    }

    Ok(())
}

/// Best-effort reference extraction for each documentation file. A
/// failure for one file leaves its reference list empty.
async fn enrich_references(ctx: &ServiceContext, run: &RunContext, structure: &mut DocStructure) {
    for file in &mut structure.files {
        let content = match ctx.repo.get_file(&run.docs_repo, &file.path, &run.branch).await {
            Ok(Some(remote)) => remote.content,
            Ok(None) => continue,
            Err(e) => {
                warn!(path = %file.path, error = %e, "failed to read doc for reference extraction");
                continue;
            }
        };

        let request = CompletionRequest {
            model: run.config.model.clone(),
            prompt: build_reference_prompt(&file.path, &content),
            max_tokens: 1024,
        };
        let response = match ctx.llm.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(path = %file.path, error = %e, "reference extraction failed, leaving empty");
                continue;
            }
        };

        match serde_json::from_str::<Vec<String>>(&response.text) {
            Ok(references) => file.references = references,
            Err(e) => {
                warn!(path = %file.path, error = %e, "unparsable reference list, leaving empty");
            }
        }
    }
}

/// Builds the LLM prompt for extracting referenced files from a document.
fn build_reference_prompt(path: &str, content: &str) -> String {
    format!(
        "List the documentation pages and source files this document references.\n\n\
         ## Document: {path}\n\n{content}\n\n\
         ## Instructions\n\n\
         Respond with a JSON array of path strings (no markdown fences). \
         Return [] if the document references nothing.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use crate::config::DocsConfig;
    use crate::pipeline::RunContext;
    use chrono::Utc;
    use serde_json::json;

    fn make_ctx(interactions: Vec<Interaction>) -> ServiceContext {
        let cassette = Cassette { name: "test".into(), recorded_at: Utc::now(), interactions };
        ServiceContext::replaying_from_cassette(&cassette)
    }

    fn interaction(seq: u64, method: &str, output: serde_json::Value) -> Interaction {
        Interaction {
            seq,
            port: "repo".into(),
            method: method.into(),
            input: json!({}),
            output,
        }
    }

    fn dir_entry(name: &str, path: &str) -> serde_json::Value {
        json!({"name": name, "path": path, "kind": "dir"})
    }

    fn file_entry(name: &str, path: &str) -> serde_json::Value {
        json!({"name": name, "path": path, "kind": "file"})
    }

    fn test_run() -> RunContext {
        let mut config = DocsConfig::default();
        config.extract_references = false;
        RunContext::bootstrap(config, "acme", "widgets", "main")
    }

    #[tokio::test]
    async fn walks_tree_and_registers_categories() {
        let ctx = make_ctx(vec![
            // docs root
            interaction(
                0,
                "list_dir",
                json!({"ok": [
                    dir_entry("guides", "docs/guides"),
                    file_entry("index.md", "docs/index.md"),
                ]}),
            ),
            // docs/guides
            interaction(
                1,
                "list_dir",
                json!({"ok": [file_entry("setup.md", "docs/guides/setup.md")]}),
            ),
            // manifest probe: docs/docs.json then docs.json, both missing
            interaction(2, "get_file", json!({"ok": null})),
            interaction(3, "get_file", json!({"ok": null})),
        ]);
        let mut run = test_run();

        index_structure(&ctx, &mut run).await.unwrap();
        let structure = run.structure.unwrap();

        assert!(structure.categories.contains("guides"));
        assert_eq!(structure.files.len(), 2);
        let setup = structure.files.iter().find(|f| f.path == "docs/guides/setup.md").unwrap();
        assert_eq!(setup.category.as_deref(), Some("guides"));
        let index = structure.files.iter().find(|f| f.path == "docs/index.md").unwrap();
        assert!(index.category.is_none());

        assert_eq!(structure.tree, "guides/\n  setup.md\nindex.md\n");
        assert!(structure.navigation.is_empty());
        assert!(structure.manifest_path.is_none());
    }

    #[tokio::test]
    async fn missing_docs_root_yields_empty_structure() {
        let ctx = make_ctx(vec![
            interaction(0, "list_dir", json!({"ok": null})),
            interaction(1, "get_file", json!({"ok": null})),
            interaction(2, "get_file", json!({"ok": null})),
        ]);
        let mut run = test_run();

        index_structure(&ctx, &mut run).await.unwrap();
        let structure = run.structure.unwrap();
        assert!(structure.files.is_empty());
        assert!(structure.tree.is_empty());
    }

    #[tokio::test]
    async fn failing_subdirectory_contributes_nothing() {
        let ctx = make_ctx(vec![
            interaction(
                0,
                "list_dir",
                json!({"ok": [
                    dir_entry("broken", "docs/broken"),
                    file_entry("index.md", "docs/index.md"),
                ]}),
            ),
            interaction(1, "list_dir", json!({"err": "server error"})),
            interaction(2, "get_file", json!({"ok": null})),
            interaction(3, "get_file", json!({"ok": null})),
        ]);
        let mut run = test_run();

        index_structure(&ctx, &mut run).await.unwrap();
        let structure = run.structure.unwrap();

        // The broken subtree is skipped, the rest of the index survives.
        assert!(structure.categories.contains("broken"));
        assert_eq!(structure.files.len(), 1);
        assert_eq!(structure.files[0].path, "docs/index.md");
    }

    #[tokio::test]
    async fn manifest_found_at_docs_root() {
        let manifest = json!({"navigation": [{"group": "Guides", "pages": ["docs/index.md"]}]});
        let ctx = make_ctx(vec![
            interaction(0, "list_dir", json!({"ok": []})),
            interaction(
                1,
                "get_file",
                json!({"ok": {"content": manifest.to_string(), "revision": "rev-1"}}),
            ),
        ]);
        let mut run = test_run();

        index_structure(&ctx, &mut run).await.unwrap();
        let structure = run.structure.unwrap();

        assert_eq!(structure.manifest_path.as_deref(), Some("docs/docs.json"));
        assert_eq!(structure.manifest_revision.as_deref(), Some("rev-1"));
        assert_eq!(structure.navigation.len(), 1);
        assert_eq!(structure.navigation[0].group, "Guides");
    }

    #[tokio::test]
    async fn manifest_falls_back_to_repository_root() {
        let manifest = json!({"navigation": []});
        let ctx = make_ctx(vec![
            interaction(0, "list_dir", json!({"ok": []})),
            // docs/docs.json missing, docs.json present
            interaction(1, "get_file", json!({"ok": null})),
            interaction(
                2,
                "get_file",
                json!({"ok": {"content": manifest.to_string(), "revision": "rev-root"}}),
            ),
        ]);
        let mut run = test_run();

        index_structure(&ctx, &mut run).await.unwrap();
        let structure = run.structure.unwrap();
        assert_eq!(structure.manifest_path.as_deref(), Some("docs.json"));
    }

    #[tokio::test]
    async fn unparsable_manifest_is_fatal() {
        let ctx = make_ctx(vec![
            interaction(0, "list_dir", json!({"ok": []})),
            interaction(
                1,
                "get_file",
                json!({"ok": {"content": "not json", "revision": "rev-1"}}),
            ),
        ]);
        let mut run = test_run();

        let result = index_structure(&ctx, &mut run).await;
        assert!(result.unwrap_err().contains("Failed to parse navigation manifest"));
    }

    #[tokio::test]
    async fn reference_extraction_failure_degrades_to_empty() {
        let mut run = test_run();
        run.config.extract_references = true;

        let ctx = make_ctx(vec![
            interaction(0, "list_dir", json!({"ok": [file_entry("index.md", "docs/index.md")]})),
            interaction(1, "get_file", json!({"ok": null})), // docs/docs.json
            interaction(2, "get_file", json!({"ok": null})), // docs.json
            // enrichment read of docs/index.md
            interaction(3, "get_file", json!({"ok": {"content": "# Hi", "revision": "r"}})),
            Interaction {
                seq: 4,
                port: "llm".into(),
                method: "complete".into(),
                input: json!({}),
                output: json!({"err": "overloaded"}),
            },
        ]);

        index_structure(&ctx, &mut run).await.unwrap();
        let structure = run.structure.unwrap();
        assert!(structure.files[0].references.is_empty());
    }

    #[tokio::test]
    async fn reference_extraction_fills_lists() {
        let mut run = test_run();
        run.config.extract_references = true;

        let ctx = make_ctx(vec![
            interaction(0, "list_dir", json!({"ok": [file_entry("index.md", "docs/index.md")]})),
            interaction(1, "get_file", json!({"ok": null})),
            interaction(2, "get_file", json!({"ok": null})),
            interaction(
                3,
                "get_file",
                json!({"ok": {"content": "See setup guide", "revision": "r"}}),
            ),
            Interaction {
                seq: 4,
                port: "llm".into(),
                method: "complete".into(),
                input: json!({}),
                output: json!({"ok": {
                    "text": "[\"docs/guides/setup.md\"]",
                    "prompt_tokens": 10,
                    "completion_tokens": 5
                }}),
            },
        ]);

        index_structure(&ctx, &mut run).await.unwrap();
        let structure = run.structure.unwrap();
        assert_eq!(structure.files[0].references, vec!["docs/guides/setup.md"]);
    }
}
