//! The documentation-sync pipeline.
//!
//! One [`RunContext`] per triggering event, threaded through the stages
//! strictly in order. Each stage reads what its predecessors populated
//! and fails with a precondition error when invoked out of order.

pub mod cache;
pub mod classify;
pub mod generate;
pub mod navigation;
pub mod patterns;
pub mod plan;
pub mod publish;
pub mod structure;

use serde::{Deserialize, Serialize};

use crate::config::DocsConfig;
use crate::context::ServiceContext;
use crate::event::PullRequestEvent;
use crate::ports::repo::RepoId;
use cache::GenerationCache;
use classify::ChangeAnalysis;
use generate::GeneratedContent;
use patterns::MatchRules;
use plan::UpdatePlan;
use publish::PublishResult;
use structure::DocStructure;

/// The pull request that triggered a change run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPr {
    /// Pull request number in the source repository.
    pub number: u64,
    /// Pull request title, used in templates.
    pub title: String,
}

/// Mutable aggregate state threaded through one pipeline execution.
///
/// Created per triggering event, discarded when the run completes or
/// fails. The optional fields are populated progressively by the stages.
#[derive(Debug)]
pub struct RunContext {
    /// Repository whose changes triggered the run.
    pub source_repo: RepoId,
    /// Branch source files are read from.
    pub source_branch: String,
    /// Repository hosting the documentation tree.
    pub docs_repo: RepoId,
    /// Base branch documentation changes target.
    pub branch: String,
    /// Resolved configuration.
    pub config: DocsConfig,
    /// Resolved path-matching rules, immutable for the run.
    pub rules: MatchRules,
    /// The triggering pull request; absent for bootstrap runs.
    pub pr: Option<TriggerPr>,
    /// Output of the classification stage.
    pub analysis: Option<ChangeAnalysis>,
    /// Output of the indexing stage.
    pub structure: Option<DocStructure>,
    /// Output of the planning stage.
    pub plan: Option<UpdatePlan>,
    /// Output of the generation stage.
    pub content: Option<GeneratedContent>,
}

impl RunContext {
    /// Builds a run context for a pull-request event.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration requires a separate docs
    /// repository but does not name one.
    pub fn from_event(config: DocsConfig, event: &PullRequestEvent) -> Result<Self, String> {
        let source_repo = RepoId {
            owner: event.repository.owner.login.clone(),
            name: event.repository.name.clone(),
        };
        let source_branch = event.repository.default_branch.clone();
        let (docs_repo, branch) = docs_coordinates(&config, &source_repo, &source_branch)?;
        let rules = config.match_rules();

        Ok(Self {
            source_repo,
            source_branch,
            docs_repo,
            branch,
            rules,
            config,
            pr: Some(TriggerPr {
                number: event.pull_request.number,
                title: event.pull_request.title.clone(),
            }),
            analysis: None,
            structure: None,
            plan: None,
            content: None,
        })
    }

    /// Builds a run context for a bootstrap (initial bulk generation) run.
    #[must_use]
    pub fn bootstrap(config: DocsConfig, owner: &str, name: &str, branch: &str) -> Self {
        let source_repo = RepoId { owner: owner.into(), name: name.into() };
        let (docs_repo, docs_branch) =
            docs_coordinates(&config, &source_repo, branch).unwrap_or_else(|_| {
                (source_repo.clone(), branch.to_string())
            });
        let rules = config.match_rules();

        Self {
            source_repo,
            source_branch: branch.into(),
            docs_repo,
            branch: docs_branch,
            rules,
            config,
            pr: None,
            analysis: None,
            structure: None,
            plan: None,
            content: None,
        }
    }
}

/// Resolves where documentation lives: the source repository itself in
/// monorepo mode, the configured docs repository otherwise.
fn docs_coordinates(
    config: &DocsConfig,
    source_repo: &RepoId,
    source_branch: &str,
) -> Result<(RepoId, String), String> {
    if config.monorepo {
        return Ok((source_repo.clone(), source_branch.to_string()));
    }
    let coords = config
        .docs_repo
        .as_ref()
        .ok_or_else(|| "docs_repo is required when monorepo is false".to_string())?;
    Ok((RepoId { owner: coords.owner.clone(), name: coords.name.clone() }, coords.branch.clone()))
}

/// Runs the full change pipeline for a pull-request event.
///
/// # Errors
///
/// Returns the first stage failure; no stage after a failure runs.
pub async fn run_change_pipeline(
    ctx: &ServiceContext,
    run: &mut RunContext,
) -> Result<PublishResult, String> {
    classify::classify_changes(ctx, run).await?;
    structure::index_structure(ctx, run).await?;
    plan::plan_updates(ctx, run).await?;
    generate::generate_content(ctx, run, None).await?;
    publish::publish(ctx, run).await
}

/// Runs the bootstrap pipeline: index, plan initial coverage, generate
/// with the persisted cache, publish.
///
/// # Errors
///
/// Returns the first stage failure. Cache persistence is best-effort and
/// never fails the run.
pub async fn run_bootstrap_pipeline(
    ctx: &ServiceContext,
    run: &mut RunContext,
) -> Result<PublishResult, String> {
    structure::index_structure(ctx, run).await?;
    plan::plan_bootstrap(ctx, run).await?;
    let mut cache = GenerationCache::load(ctx, run).await?;
    generate::generate_content(ctx, run, Some(&mut cache)).await?;
    cache.persist(ctx, run).await;
    publish::publish(ctx, run).await
}
