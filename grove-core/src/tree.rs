use crate::store::{State, WorkspaceKind};

/// One row of the sidebar tree.
///
/// Workspace rows refer back to their record by index into
/// [`State::workspaces`]; the tree is rebuilt after every mutation so the
/// indices never outlive the document they were built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Repo {
        name: String,
        /// Total children, before any filter.
        child_count: usize,
    },
    Workspace {
        index: usize,
        repo: Option<String>,
        label: String,
    },
}

impl TreeNode {
    pub fn repo(&self) -> Option<&str> {
        match self {
            TreeNode::Repo { name, .. } => Some(name),
            TreeNode::Workspace { repo, .. } => repo.as_deref(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TreeNode::Repo { name, .. } => name,
            TreeNode::Workspace { label, .. } => label,
        }
    }

    pub fn workspace_index(&self) -> Option<usize> {
        match self {
            TreeNode::Workspace { index, .. } => Some(*index),
            TreeNode::Repo { .. } => None,
        }
    }

    pub fn is_repo(&self) -> bool {
        matches!(self, TreeNode::Repo { .. })
    }
}

/// Flatten the document into sidebar rows.
///
/// Repos appear in `repo_order` (the configured order), each followed by its
/// worktree workspaces in document order. Repos without workspaces get no
/// header. Plain workspaces come last, without a header. Worktree workspaces
/// whose repo is not in `repo_order` are omitted.
pub fn build_tree<S: AsRef<str>>(state: &State, repo_order: &[S]) -> Vec<TreeNode> {
    let mut nodes = Vec::new();

    for repo in repo_order {
        let repo = repo.as_ref();
        let children: Vec<TreeNode> = state
            .workspaces
            .iter()
            .enumerate()
            .filter_map(|(index, ws)| match &ws.kind {
                WorkspaceKind::Worktree {
                    repo: ws_repo,
                    branch,
                    ..
                } if ws_repo == repo => Some(TreeNode::Workspace {
                    index,
                    repo: Some(repo.to_string()),
                    label: branch.clone(),
                }),
                _ => None,
            })
            .collect();

        if children.is_empty() {
            continue;
        }
        nodes.push(TreeNode::Repo {
            name: repo.to_string(),
            child_count: children.len(),
        });
        nodes.extend(children);
    }

    nodes.extend(
        state
            .workspaces
            .iter()
            .enumerate()
            .filter(|(_, ws)| matches!(ws.kind, WorkspaceKind::Plain { .. }))
            .map(|(index, ws)| TreeNode::Workspace {
                index,
                repo: None,
                label: ws.name.clone(),
            }),
    );

    nodes
}
