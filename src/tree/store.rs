//! Metadata persistence abstraction for the document tree.

use std::path::Path;

use async_trait::async_trait;

use super::model::{FileEntry, FileId, Folder, FolderId, NewFile, NewFolder};
use crate::db::UserId;
use crate::Result;

/// Persistence for folder and file records.
///
/// Each call is atomic on its own; callers sequence multi-record
/// changes themselves.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Get a folder by ID.
    async fn find_folder(&self, id: FolderId) -> Result<Option<Folder>>;

    /// Get a file by ID.
    async fn find_file(&self, id: FileId) -> Result<Option<FileEntry>>;

    /// Direct child folders of `parent`, ordered by name.
    async fn find_children(&self, parent: FolderId) -> Result<Vec<Folder>>;

    /// Files stored directly in `folder`, ordered by name.
    async fn find_files(&self, folder: FolderId) -> Result<Vec<FileEntry>>;

    /// Files whose name contains `needle`, ignoring ASCII case, ordered by name.
    async fn search_files(&self, needle: &str) -> Result<Vec<FileEntry>>;

    /// Root folders; with `member` set, only those that list that user.
    async fn find_root_folders(&self, member: Option<UserId>) -> Result<Vec<Folder>>;

    /// Insert a folder record and return it with its new ID.
    async fn create_folder(&self, folder: &NewFolder) -> Result<Folder>;

    /// Persist every mutable field of `folder`, including its permitted set.
    async fn update_folder(&self, folder: &Folder) -> Result<()>;

    /// Delete a folder record. Returns false when it did not exist.
    async fn delete_folder(&self, id: FolderId) -> Result<bool>;

    /// Insert a file record and return it with its new ID.
    async fn create_file(&self, file: &NewFile) -> Result<FileEntry>;

    /// Persist every mutable field of `file`.
    async fn update_file(&self, file: &FileEntry) -> Result<()>;

    /// Delete a file record. Returns false when it did not exist.
    async fn delete_file(&self, id: FileId) -> Result<bool>;

    /// Check whether any folder or file record occupies `path`.
    async fn exists_by_path(&self, path: &Path) -> Result<bool>;
}
