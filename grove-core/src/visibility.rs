use crate::tree::TreeNode;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// The visible projection of a tree under a collapse set and a filter.
///
/// Repos not in `collapsed` are expanded. Filtering is a case-insensitive
/// substring match on workspace labels; a repo stays visible while at least
/// one of its children matches.
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    nodes: &'a [TreeNode],
    collapsed: &'a BTreeSet<String>,
    filter: &'a str,
}

fn matches_filter(label: &str, needle: &str) -> bool {
    needle.is_empty() || label.to_lowercase().contains(needle)
}

impl<'a> View<'a> {
    pub fn new(nodes: &'a [TreeNode], collapsed: &'a BTreeSet<String>, filter: &'a str) -> Self {
        Self {
            nodes,
            collapsed,
            filter,
        }
    }

    /// Indices into the node sequence of every visible node, in order.
    pub fn visible(&self) -> Vec<usize> {
        let needle = self.filter.to_lowercase();
        let mut visible = Vec::new();

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Repo { name, .. } => {
                    if needle.is_empty() || self.matching_children(name, &needle) > 0 {
                        visible.push(idx);
                    }
                }
                TreeNode::Workspace { repo, label, .. } => {
                    if let Some(repo) = repo
                        && self.collapsed.contains(repo)
                    {
                        continue;
                    }
                    if matches_filter(label, &needle) {
                        visible.push(idx);
                    }
                }
            }
        }

        visible
    }

    fn matching_children(&self, repo: &str, needle: &str) -> usize {
        self.nodes
            .iter()
            .filter(|node| match node {
                TreeNode::Workspace {
                    repo: Some(r),
                    label,
                    ..
                } => r == repo && matches_filter(label, needle),
                _ => false,
            })
            .count()
    }

    /// Children of `repo` matching the current filter (all children when unfiltered).
    pub fn child_count(&self, repo: &str) -> usize {
        self.matching_children(repo, &self.filter.to_lowercase())
    }

    pub fn is_collapsed(&self, repo: &str) -> bool {
        self.collapsed.contains(repo)
    }

    /// Move one visible row from `current`.
    ///
    /// Stops at either end. When `current` is not visible (or unset) the first
    /// visible node is returned. `None` only when nothing is visible.
    pub fn move_cursor(&self, current: Option<usize>, direction: Direction) -> Option<usize> {
        let visible = self.visible();
        let first = *visible.first()?;
        let Some(pos) = current.and_then(|c| visible.iter().position(|&v| v == c)) else {
            return Some(first);
        };
        let next = match direction {
            Direction::Up => pos.saturating_sub(1),
            Direction::Down => (pos + 1).min(visible.len() - 1),
        };
        Some(visible[next])
    }

    /// Keep `current` if it is still visible, else fall back to the nearest
    /// visible node before it, else the first visible node.
    /// `None` only when nothing is visible.
    pub fn clamp_cursor(&self, current: Option<usize>) -> Option<usize> {
        let visible = self.visible();
        let Some(current) = current else {
            return visible.first().copied();
        };
        if visible.contains(&current) {
            return Some(current);
        }
        visible
            .iter()
            .rev()
            .find(|&&v| v < current)
            .or_else(|| visible.first())
            .copied()
    }

    pub fn first(&self) -> Option<usize> {
        self.visible().first().copied()
    }

    pub fn last(&self) -> Option<usize> {
        self.visible().last().copied()
    }
}
