//! Explicit traversal of folder subtrees.
//!
//! Subtrees are read into memory before anything is changed, so a walk
//! never observes its own writes.

use std::collections::HashSet;

use crate::tree::{FileEntry, Folder, FolderId, TreeStore};
use crate::{PortalError, Result};

/// Longest parent chain followed before the tree is treated as corrupt.
pub const MAX_ANCESTRY_DEPTH: usize = 1024;

/// One folder of a [`Subtree`] together with its files.
#[derive(Debug, Clone)]
pub struct SubtreeNode {
    /// The folder record.
    pub folder: Folder,
    /// Distance from the subtree root (0 for the root itself).
    pub depth: usize,
    /// Files stored directly in the folder.
    pub files: Vec<FileEntry>,
}

/// Pre-order snapshot of a folder and its descendants.
#[derive(Debug, Clone)]
pub struct Subtree {
    nodes: Vec<SubtreeNode>,
}

impl Subtree {
    /// Read the whole subtree under `root`.
    pub async fn snapshot(store: &dyn TreeStore, root: Folder) -> Result<Self> {
        Self::snapshot_to_depth(store, root, None).await
    }

    /// Read the subtree under `root`, stopping below `max_depth`.
    pub async fn snapshot_to_depth(
        store: &dyn TreeStore,
        root: Folder,
        max_depth: Option<usize>,
    ) -> Result<Self> {
        let mut nodes = Vec::new();
        let mut seen = HashSet::new();
        let mut pending = vec![(root, 0usize)];

        while let Some((folder, depth)) = pending.pop() {
            if !seen.insert(folder.id) {
                return Err(PortalError::State(format!(
                    "folder {} appears twice in its own subtree",
                    folder.id
                )));
            }

            let files = store.find_files(folder.id).await?;
            if max_depth.map_or(true, |max| depth < max) {
                let children = store.find_children(folder.id).await?;
                // Reversed so the first child is popped first.
                for child in children.into_iter().rev() {
                    pending.push((child, depth + 1));
                }
            }
            nodes.push(SubtreeNode { folder, depth, files });
        }

        Ok(Self { nodes })
    }

    /// The folder the snapshot was taken from.
    pub fn root(&self) -> &Folder {
        &self.nodes[0].folder
    }

    pub(crate) fn root_mut(&mut self) -> &mut Folder {
        &mut self.nodes[0].folder
    }

    /// Nodes in pre-order: every folder before its descendants.
    pub fn pre_order(&self) -> impl Iterator<Item = &SubtreeNode> {
        self.nodes.iter()
    }

    /// Nodes with every folder after its descendants.
    pub fn leaves_first(&self) -> impl Iterator<Item = &SubtreeNode> {
        self.nodes.iter().rev()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut SubtreeNode> {
        self.nodes.iter_mut()
    }

    /// Consume the snapshot, yielding nodes leaves first.
    pub fn into_leaves_first(self) -> impl Iterator<Item = SubtreeNode> {
        self.nodes.into_iter().rev()
    }

    /// Number of folders, the root included.
    pub fn folder_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of files across all folders.
    pub fn file_count(&self) -> usize {
        self.nodes.iter().map(|n| n.files.len()).sum()
    }

    /// Check whether a folder belongs to the snapshot.
    pub fn contains(&self, id: FolderId) -> bool {
        self.nodes.iter().any(|n| n.folder.id == id)
    }
}

/// Check whether `candidate` is `ancestor` or lies below it.
///
/// Follows parent links upwards from `candidate`, giving up with
/// [`PortalError::State`] after [`MAX_ANCESTRY_DEPTH`] steps.
pub async fn is_same_or_descendant(
    store: &dyn TreeStore,
    candidate: FolderId,
    ancestor: FolderId,
) -> Result<bool> {
    let mut current = Some(candidate);

    for _ in 0..MAX_ANCESTRY_DEPTH {
        let Some(id) = current else {
            return Ok(false);
        };
        if id == ancestor {
            return Ok(true);
        }
        current = store
            .find_folder(id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("folder {id}")))?
            .parent_id;
    }

    Err(PortalError::State(format!(
        "ancestry of folder {candidate} exceeds {MAX_ANCESTRY_DEPTH} levels"
    )))
}
