use super::{TaskTreeNode, parent_ids};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which rendering of the hierarchy a visibility set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Wbs,
    Timeline,
}

/// The set of expanded task ids for one view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilitySet {
    expanded: HashSet<String>,
}

impl VisibilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collapsed for the WBS list, fully expanded for the timeline.
    pub fn default_for(view: ViewKind, forest: &[TaskTreeNode]) -> Self {
        let mut set = Self::new();
        if view == ViewKind::Timeline {
            set.expand_all(parent_ids(forest));
        }
        set
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Flips membership; returns whether `id` is expanded afterwards.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.to_string());
            true
        }
    }

    /// Replaces the expanded set with exactly `ids`.
    pub fn expand_all<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expanded = ids.into_iter().map(Into::into).collect();
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}

/// Pre-order walk emitting every node whose ancestors are all expanded.
pub fn flatten<'a>(forest: &'a [TaskTreeNode], visibility: &VisibilitySet) -> Vec<&'a TaskTreeNode> {
    let mut rows = Vec::new();
    let mut stack: Vec<&TaskTreeNode> = forest.iter().rev().collect();
    while let Some(node) = stack.pop() {
        rows.push(node);
        if node.has_children() && visibility.is_expanded(node.id()) {
            stack.extend(node.children.iter().rev());
        }
    }
    rows
}
