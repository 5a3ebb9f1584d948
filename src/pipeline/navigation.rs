//! Navigation manifest model and reconciliation.
//!
//! Changes are applied left-to-right. Adds and removes are idempotent;
//! moves are idempotent because the second application finds the page
//! already in the target and becomes a no-op. A page appearing in two
//! different groups is left alone — cross-group deduplication is
//! deliberately not performed.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A named navigation group with an ordered page list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationGroup {
    /// Display name of the group.
    pub group: String,
    /// Ordered pages; duplicates within a group are suppressed.
    pub pages: Vec<String>,
}

/// The navigation manifest document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationManifest {
    /// The navigation groups, in display order.
    pub navigation: Vec<NavigationGroup>,
}

/// The operation a navigation change performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavOperation {
    /// Add a page to a group, creating the group if needed.
    Add,
    /// Move a page from wherever it currently lives to a group.
    Move,
    /// Remove a page from a group.
    Remove,
}

/// One navigation edit. Applied in list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationChange {
    /// The operation to perform.
    pub operation: NavOperation,
    /// The page path.
    pub page: String,
    /// The target group name.
    pub group: String,
}

/// Finds a group index by case-insensitive name match.
fn find_group(groups: &[NavigationGroup], name: &str) -> Option<usize> {
    groups.iter().position(|g| g.group.eq_ignore_ascii_case(name))
}

/// Applies navigation changes to the group list, left-to-right.
///
/// An empty change list leaves the structure untouched.
pub fn apply_changes(groups: &mut Vec<NavigationGroup>, changes: &[NavigationChange]) {
    for change in changes {
        match change.operation {
            NavOperation::Add => apply_add(groups, change),
            NavOperation::Remove => apply_remove(groups, change),
            NavOperation::Move => apply_move(groups, change),
        }
    }
}

fn apply_add(groups: &mut Vec<NavigationGroup>, change: &NavigationChange) {
    let index = match find_group(groups, &change.group) {
        Some(index) => index,
        None => {
            groups.push(NavigationGroup { group: change.group.clone(), pages: Vec::new() });
            groups.len() - 1
        }
    };
    let pages = &mut groups[index].pages;
    if !pages.contains(&change.page) {
        pages.push(change.page.clone());
    }
}

fn apply_remove(groups: &mut Vec<NavigationGroup>, change: &NavigationChange) {
    let Some(index) = find_group(groups, &change.group) else {
        warn!(group = %change.group, page = %change.page, "remove: group not found, skipping");
        return;
    };
    groups[index].pages.retain(|page| page != &change.page);
    if groups[index].pages.is_empty() {
        groups.remove(index);
    }
}

fn apply_move(groups: &mut Vec<NavigationGroup>, change: &NavigationChange) {
    // The source is inferred: the first group that currently holds the page.
    let Some(source) = groups.iter().position(|g| g.pages.contains(&change.page)) else {
        return;
    };
    if groups[source].group.eq_ignore_ascii_case(&change.group) {
        return;
    }
    // Unlike add, move requires the target to already exist.
    if find_group(groups, &change.group).is_none() {
        warn!(group = %change.group, page = %change.page, "move: target group not found, skipping");
        return;
    }

    groups[source].pages.retain(|page| page != &change.page);
    if groups[source].pages.is_empty() {
        groups.remove(source);
    }

    let target = find_group(groups, &change.group).expect("target group checked above");
    let pages = &mut groups[target].pages;
    if !pages.contains(&change.page) {
        pages.push(change.page.clone());
    }
}
