//! Configuration loading and startup credential validation.
//!
//! Configuration is resolved once before the pipeline runs and never
//! re-read mid-run. Credentials come from the environment (via dotenvy)
//! and are validated at startup; a missing credential is fatal and
//! non-retryable.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::pipeline::patterns::MatchRules;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "docsync.yaml";

/// Coordinates of the repository that hosts the documentation tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoCoordinates {
    /// Owning user or organization.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Base branch documentation changes target.
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    "main".into()
}

/// Templates used when publishing a change request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PublishTemplates {
    /// Prefix for generated branch names.
    pub branch_prefix: String,
    /// Title template; `{prNumber}` and `{prTitle}` are substituted.
    pub title: String,
    /// Body template; `{prNumber}` and `{changes}` are substituted.
    pub body: String,
}

impl Default for PublishTemplates {
    fn default() -> Self {
        Self {
            branch_prefix: "docsync/update-".into(),
            title: "docs: update documentation for PR #{prNumber}".into(),
            body: "Automated documentation updates for #{prNumber}.\n\n\
                   ## Changes\n\n{changes}\n"
                .into(),
        }
    }
}

impl PublishTemplates {
    /// The static prefix of the title template, used to recognize this
    /// system's own change requests in incoming events.
    #[must_use]
    pub fn title_prefix(&self) -> &str {
        self.title.split('{').next().unwrap_or(&self.title)
    }
}

/// Resolved configuration for one deployment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    /// Root of the documentation tree inside the docs repository.
    pub docs_path: String,
    /// When `true`, documentation lives in the triggering repository itself.
    pub monorepo: bool,
    /// Docs repository coordinates; required when `monorepo` is `false`.
    pub docs_repo: Option<RepoCoordinates>,
    /// File extensions recognized as documentation.
    pub doc_extensions: Vec<String>,
    /// Path-glob patterns whose files never need documentation.
    pub ignore_patterns: Vec<String>,
    /// Path-glob patterns whose files always matter; wins over ignores.
    pub important_patterns: Vec<String>,
    /// Optional source-prefix to docs-prefix rewrites for candidate paths.
    pub path_mappings: BTreeMap<String, String>,
    /// When `false`, push the branch but open no change request.
    pub create_pr: bool,
    /// Labels attached to created change requests.
    pub pr_labels: Vec<String>,
    /// Optional style guide text included in generation prompts.
    pub style_guide: Option<String>,
    /// Navigation manifest file name.
    pub manifest_name: String,
    /// Model identifier passed to the LLM collaborator.
    pub model: String,
    /// Upper bound on files planned per bootstrap run.
    pub max_bootstrap_files: usize,
    /// Enables best-effort per-file reference extraction during indexing.
    pub extract_references: bool,
    /// Publishing templates.
    pub templates: PublishTemplates,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            docs_path: "docs".into(),
            monorepo: true,
            docs_repo: None,
            doc_extensions: vec![".md".into(), ".mdx".into()],
            ignore_patterns: Vec::new(),
            important_patterns: Vec::new(),
            path_mappings: BTreeMap::new(),
            create_pr: true,
            pr_labels: vec!["documentation".into()],
            style_guide: None,
            manifest_name: "docs.json".into(),
            model: "claude-sonnet-4-20250514".into(),
            max_bootstrap_files: 50,
            extract_references: true,
            templates: PublishTemplates::default(),
        }
    }
}

impl DocsConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a
    /// non-monorepo configuration omits the docs repository coordinates.
    pub fn load(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        let config: Self = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
        if !config.monorepo && config.docs_repo.is_none() {
            return Err(format!(
                "Invalid config {}: docs_repo is required when monorepo is false",
                path.display()
            ));
        }
        Ok(config)
    }

    /// Resolves the configured pattern lists into immutable match rules.
    #[must_use]
    pub fn match_rules(&self) -> MatchRules {
        MatchRules::resolve(
            &self.doc_extensions,
            &self.ignore_patterns,
            &self.important_patterns,
            self.path_mappings.clone(),
        )
    }

    /// The primary documentation extension, used when deriving candidate
    /// documentation paths for source files.
    #[must_use]
    pub fn primary_doc_extension(&self) -> &str {
        self.doc_extensions.first().map_or(".md", String::as_str)
    }
}

/// External credentials, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Token for the source-hosting API.
    pub github_token: String,
    /// API key for the LLM collaborator.
    pub anthropic_api_key: String,
}

impl Credentials {
    /// Reads credentials from the environment (after loading `.env` if present).
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing variable.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();
        let github_token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| "GITHUB_TOKEN environment variable not set".to_string())?;
        let anthropic_api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| "ANTHROPIC_API_KEY environment variable not set".to_string())?;
        Ok(Self { github_token, anthropic_api_key })
    }
}
