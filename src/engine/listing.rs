//! Read-only views of the tree.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use super::walk::Subtree;
use super::HierarchyEngine;
use crate::db::User;
use crate::permission::{self, Operation};
use crate::tree::{FileEntry, Folder, FolderId};
use crate::{PortalError, Result};

/// Sort key for [`TreeFilter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Name,
    Date,
    Size,
}

/// Sort direction for [`TreeFilter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Filters applied by [`HierarchyEngine::folder_tree`].
#[derive(Debug, Clone, Default)]
pub struct TreeFilter {
    /// Case-insensitive substring of folder or file names.
    pub name: Option<String>,
    /// File extension, without the dot.
    pub extension: Option<String>,
    /// Smallest file size in bytes.
    pub min_size: Option<u64>,
    /// Largest file size in bytes.
    pub max_size: Option<u64>,
    /// Deepest level to descend to (0 lists only the folder itself).
    pub max_depth: Option<usize>,
    /// Sort key.
    pub sort: SortKey,
    /// Sort direction.
    pub order: SortOrder,
}

impl TreeFilter {
    /// Create a filter that keeps everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep names containing `needle`.
    pub fn with_name(mut self, needle: impl Into<String>) -> Self {
        self.name = Some(needle.into());
        self
    }

    /// Keep files with extension `ext`.
    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = Some(ext.into());
        self
    }

    /// Keep files whose size lies in `min..=max`.
    pub fn with_size_range(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    /// Limit the depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set sort key and direction.
    pub fn sorted_by(mut self, sort: SortKey, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }

    fn name_matches(&self, name: &str) -> bool {
        match &self.name {
            Some(needle) => name.to_lowercase().contains(&needle.to_lowercase()),
            None => true,
        }
    }

    fn file_matches(&self, file: &FileEntry) -> bool {
        if !self.name_matches(&file.name) {
            return false;
        }
        if let Some(ext) = &self.extension {
            let wanted = ext.trim_start_matches('.').to_lowercase();
            if file.extension().as_deref() != Some(wanted.as_str()) {
                return false;
            }
        }
        self.min_size.map_or(true, |min| file.size >= min)
            && self.max_size.map_or(true, |max| file.size <= max)
    }

    fn apply_order(&self, ordering: Ordering) -> Ordering {
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// A folder with its visible files and subfolders.
#[derive(Debug, Clone, Serialize)]
pub struct FolderTree {
    /// The folder record.
    pub folder: Folder,
    /// Matching files stored directly in the folder.
    pub files: Vec<FileEntry>,
    /// Visible subfolders.
    pub children: Vec<FolderTree>,
    /// Bytes in all matching files of this subtree.
    pub total_size: u64,
}

impl FolderTree {
    fn is_empty(&self) -> bool {
        self.files.is_empty() && self.children.is_empty()
    }
}

impl HierarchyEngine {
    /// Root folders the user can see.
    pub async fn list_roots(&self, user: &User) -> Result<Vec<Folder>> {
        let member = if permission::is_admin(user) {
            None
        } else {
            Some(user.id)
        };
        self.store.find_root_folders(member).await
    }

    /// Folder contents visible to `user`, filtered and sorted.
    ///
    /// With a name search, subfolders that neither match nor contain
    /// anything that matches are left out.
    pub async fn folder_tree(&self, id: FolderId, user: &User, filter: &TreeFilter) -> Result<FolderTree> {
        let folder = self.load_folder(id).await?;
        self.authorize(user, Operation::View, Some(&folder))?;

        let subtree = Subtree::snapshot_to_depth(self.store(), folder, filter.max_depth).await?;

        let mut finished: HashMap<FolderId, Vec<FolderTree>> = HashMap::new();
        let mut top = None;

        for node in subtree.into_leaves_first() {
            let is_top = node.depth == 0;
            if !is_top && !permission::decide(user, Operation::View, Some(&node.folder)).is_allowed() {
                continue;
            }

            let mut files: Vec<FileEntry> = node
                .files
                .into_iter()
                .filter(|f| filter.file_matches(f))
                .collect();
            sort_files(&mut files, filter);

            let mut children = finished.remove(&node.folder.id).unwrap_or_default();
            sort_folders(&mut children, filter);

            let total_size = files.iter().map(|f| f.size).sum::<u64>()
                + children.iter().map(|c| c.total_size).sum::<u64>();
            let parent_id = node.folder.parent_id;
            let tree = FolderTree {
                folder: node.folder,
                files,
                children,
                total_size,
            };

            if is_top {
                top = Some(tree);
            } else if filter.name.is_none() || filter.name_matches(&tree.folder.name) || !tree.is_empty() {
                if let Some(parent_id) = parent_id {
                    finished.entry(parent_id).or_default().push(tree);
                }
            }
        }

        top.ok_or_else(|| PortalError::NotFound(format!("folder {id}")))
    }
}

fn sort_files(files: &mut [FileEntry], filter: &TreeFilter) {
    files.sort_by(|a, b| {
        let ordering = match filter.sort {
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::Date => a.created_at.cmp(&b.created_at),
            SortKey::Size => a.size.cmp(&b.size),
        };
        filter.apply_order(ordering)
    });
}

fn sort_folders(folders: &mut [FolderTree], filter: &TreeFilter) {
    folders.sort_by(|a, b| {
        let ordering = match filter.sort {
            SortKey::Name => a.folder.name.to_lowercase().cmp(&b.folder.name.to_lowercase()),
            SortKey::Date => a.folder.created_at.cmp(&b.folder.created_at),
            SortKey::Size => a.total_size.cmp(&b.total_size),
        };
        filter.apply_order(ordering)
    });
}
