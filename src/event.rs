//! Triggering-event model: a pull-request webhook payload and the filter
//! deciding whether it should start a run.

use serde::Deserialize;

use crate::config::DocsConfig;

/// A pull-request event payload, as delivered by the hosting webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    /// The event action (`opened`, `synchronize`, `closed`, ...).
    pub action: String,
    /// The pull request the event refers to.
    pub pull_request: PullRequest,
    /// The repository the event originated from.
    pub repository: Repository,
}

/// The pull request inside an event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    /// Pull request number.
    pub number: u64,
    /// Pull request title.
    pub title: String,
    /// Labels currently attached.
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// A label attached to a pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    /// Label name.
    pub name: String,
}

/// The repository inside an event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// Repository name.
    pub name: String,
    /// Repository owner.
    pub owner: Owner,
    /// The repository's default branch.
    pub default_branch: String,
}

/// The owner of a repository.
#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    /// Owner login.
    pub login: String,
}

impl PullRequestEvent {
    /// Parses an event from its JSON payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a valid pull-request event.
    pub fn from_json(payload: &str) -> Result<Self, String> {
        serde_json::from_str(payload).map_err(|e| format!("Failed to parse event payload: {e}"))
    }

    /// Decides whether this event should start a run.
    ///
    /// Only `opened` and `synchronize` actions are actionable, and events
    /// produced by this system's own prior output are skipped (recognized
    /// by the title prefix or by one of the configured labels).
    #[must_use]
    pub fn is_actionable(&self, config: &DocsConfig) -> bool {
        if self.action != "opened" && self.action != "synchronize" {
            return false;
        }
        if self.pull_request.title.starts_with(config.templates.title_prefix()) {
            return false;
        }
        let own_label = self
            .pull_request
            .labels
            .iter()
            .any(|label| config.pr_labels.iter().any(|own| own == &label.name));
        !own_label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(action: &str, title: &str, labels: &[&str]) -> PullRequestEvent {
        let labels: Vec<serde_json::Value> =
            labels.iter().map(|name| serde_json::json!({"name": name})).collect();
        let payload = serde_json::json!({
            "action": action,
            "pull_request": {
                "number": 42,
                "title": title,
                "labels": labels,
            },
            "repository": {
                "name": "widgets",
                "owner": {"login": "acme"},
                "default_branch": "main",
            },
        });
        PullRequestEvent::from_json(&payload.to_string()).unwrap()
    }

    #[test]
    fn opened_and_synchronize_are_actionable() {
        let config = DocsConfig::default();
        assert!(sample_event("opened", "Add billing", &[]).is_actionable(&config));
        assert!(sample_event("synchronize", "Add billing", &[]).is_actionable(&config));
    }

    #[test]
    fn other_actions_are_ignored() {
        let config = DocsConfig::default();
        assert!(!sample_event("closed", "Add billing", &[]).is_actionable(&config));
        assert!(!sample_event("labeled", "Add billing", &[]).is_actionable(&config));
    }

    #[test]
    fn own_output_is_skipped_by_title_prefix() {
        let config = DocsConfig::default();
        let event = sample_event("opened", "docs: update documentation for PR #7", &[]);
        assert!(!event.is_actionable(&config));
    }

    #[test]
    fn own_output_is_skipped_by_label() {
        let config = DocsConfig::default();
        let event = sample_event("opened", "Add billing", &["documentation"]);
        assert!(!event.is_actionable(&config));
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(PullRequestEvent::from_json("not json").is_err());
    }
}
