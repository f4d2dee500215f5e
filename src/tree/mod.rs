//! Hierarchy derived from a flat task list.
//!
//! The forest is rebuilt from scratch on every change to the task list and is
//! never mutated in place. Parent links are resolved through an id-to-index map
//! so the result is an owned tree with no back references.

use crate::task::Task;
use std::collections::HashMap;

pub mod visibility;

pub use visibility::{VisibilitySet, ViewKind, flatten};

#[derive(Debug, Clone, PartialEq)]
pub struct TaskTreeNode {
    pub task: Task,
    pub children: Vec<TaskTreeNode>,
    /// Depth in the forest; roots are level 0.
    pub level: usize,
}

impl TaskTreeNode {
    pub fn id(&self) -> &str {
        &self.task.id
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

impl Drop for TaskTreeNode {
    // Unlinks descendants onto a heap stack; the default drop recurses per level.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Builds the forest for `tasks`, ordering every sibling list by `order_index`.
///
/// Tasks whose parent is missing from `tasks`, or whose parent chain loops back
/// onto itself, are returned as roots. Ties in `order_index` keep input order.
pub fn build_tree(tasks: &[Task]) -> Vec<TaskTreeNode> {
    let mut index_by_id: HashMap<&str, usize> = HashMap::with_capacity(tasks.len());
    for (idx, task) in tasks.iter().enumerate() {
        index_by_id.entry(task.id.as_str()).or_insert(idx);
    }

    let mut parents: Vec<Option<usize>> = tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| {
            task.parent_id
                .as_deref()
                .and_then(|pid| index_by_id.get(pid).copied())
                .filter(|&parent_idx| parent_idx != idx)
        })
        .collect();

    let cyclic = break_cycles(&parents);
    if !cyclic.is_empty() {
        tracing::warn!(count = cyclic.len(), "parent cycle detected; promoting tasks to roots");
        for idx in cyclic {
            parents[idx] = None;
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
    let mut roots = Vec::new();
    for (idx, parent) in parents.iter().enumerate() {
        match parent {
            Some(parent_idx) => children[*parent_idx].push(idx),
            None => roots.push(idx),
        }
    }

    // `sort_by_key` is stable, so equal ranks keep their input order.
    roots.sort_by_key(|&idx| tasks[idx].order_index);
    for list in &mut children {
        list.sort_by_key(|&idx| tasks[idx].order_index);
    }

    assemble(tasks, &roots, &children)
}

/// Builds the nodes bottom-up so depth never turns into call depth.
fn assemble(tasks: &[Task], roots: &[usize], children: &[Vec<usize>]) -> Vec<TaskTreeNode> {
    let mut levels = vec![0usize; tasks.len()];
    let mut preorder = Vec::with_capacity(tasks.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(idx) = stack.pop() {
        preorder.push(idx);
        for &child in children[idx].iter().rev() {
            levels[child] = levels[idx] + 1;
            stack.push(child);
        }
    }

    // Descendants follow their ancestor in pre-order, so walking it backwards
    // finishes every child before its parent.
    let mut built: Vec<Option<TaskTreeNode>> = (0..tasks.len()).map(|_| None).collect();
    for &idx in preorder.iter().rev() {
        let node_children = children[idx]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[idx] = Some(TaskTreeNode {
            task: tasks[idx].clone(),
            children: node_children,
            level: levels[idx],
        });
    }

    roots.iter().filter_map(|&idx| built[idx].take()).collect()
}

/// Returns the indices of every task that sits on a parent cycle.
fn break_cycles(parents: &[Option<usize>]) -> Vec<usize> {
    let mut marks = vec![Mark::Unvisited; parents.len()];
    let mut cyclic = Vec::new();
    let mut path = Vec::new();

    for start in 0..parents.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        path.clear();
        let mut current = Some(start);
        while let Some(idx) = current {
            match marks[idx] {
                Mark::Done => break,
                Mark::OnPath => {
                    if let Some(pos) = path.iter().position(|&p| p == idx) {
                        cyclic.extend_from_slice(&path[pos..]);
                    }
                    break;
                }
                Mark::Unvisited => {
                    marks[idx] = Mark::OnPath;
                    path.push(idx);
                    current = parents[idx];
                }
            }
        }
        for &idx in &path {
            marks[idx] = Mark::Done;
        }
    }

    cyclic
}

/// Pre-order iterator over every node of the forest.
fn preorder(forest: &[TaskTreeNode]) -> impl Iterator<Item = &TaskTreeNode> {
    let mut stack: Vec<&TaskTreeNode> = forest.iter().rev().collect();
    std::iter::from_fn(move || {
        let node = stack.pop()?;
        stack.extend(node.children.iter().rev());
        Some(node)
    })
}

/// Total number of nodes in the forest.
pub fn node_count(forest: &[TaskTreeNode]) -> usize {
    preorder(forest).count()
}

/// Ids of every node that has at least one child, in pre-order.
pub fn parent_ids(forest: &[TaskTreeNode]) -> Vec<String> {
    preorder(forest)
        .filter(|node| node.has_children())
        .map(|node| node.task.id.clone())
        .collect()
}

/// Depth-first search for a node by task id.
pub fn find_node<'a>(forest: &'a [TaskTreeNode], id: &str) -> Option<&'a TaskTreeNode> {
    preorder(forest).find(|node| node.task.id == id)
}
