//! Folder and file records of the document tree.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::UserId;

/// Typed folder identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FolderId(pub i64);

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Typed file identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FileId(pub i64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A folder in the document tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Folder {
    /// Unique folder ID.
    pub id: FolderId,
    /// Display name, as given by the user.
    pub name: String,
    /// Absolute directory path under the storage root.
    pub full_path: PathBuf,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<FolderId>,
    /// User that created the folder.
    pub created_by: UserId,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last changed.
    pub updated_at: DateTime<Utc>,
    /// Users allowed to see and work inside the folder.
    pub permitted_users: BTreeSet<UserId>,
}

impl Folder {
    /// Check whether this is a top-level folder.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check whether a user is in the permitted set.
    pub fn is_member(&self, user: UserId) -> bool {
        self.permitted_users.contains(&user)
    }
}

/// Data for creating a new folder record.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Display name.
    pub name: String,
    /// Absolute directory path.
    pub full_path: PathBuf,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<FolderId>,
    /// Creating user.
    pub created_by: UserId,
    /// Initial permitted set.
    pub permitted_users: BTreeSet<UserId>,
}

impl NewFolder {
    /// Create a new root folder record owned by `created_by`.
    pub fn new(name: impl Into<String>, full_path: impl Into<PathBuf>, created_by: UserId) -> Self {
        Self {
            name: name.into(),
            full_path: full_path.into(),
            parent_id: None,
            created_by,
            permitted_users: BTreeSet::new(),
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: FolderId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set the permitted users.
    pub fn with_members(mut self, members: impl IntoIterator<Item = UserId>) -> Self {
        self.permitted_users = members.into_iter().collect();
        self
    }
}

/// A file stored inside a folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    /// Unique file ID.
    pub id: FileId,
    /// Display name.
    pub name: String,
    /// Absolute path of the stored bytes.
    pub storage_path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// SHA-256 of the content, lowercase hex.
    pub hash: Option<String>,
    /// Guessed MIME type.
    pub mime: Option<String>,
    /// Owning folder.
    pub folder_id: FolderId,
    /// Uploading user.
    pub created_by: UserId,
    /// When the file was created.
    pub created_at: DateTime<Utc>,
    /// When the file was last changed.
    pub updated_at: DateTime<Utc>,
}

impl FileEntry {
    /// Lowercased extension of the display name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Display name.
    pub name: String,
    /// Absolute path of the stored bytes.
    pub storage_path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Content hash.
    pub hash: Option<String>,
    /// MIME type.
    pub mime: Option<String>,
    /// Owning folder.
    pub folder_id: FolderId,
    /// Uploading user.
    pub created_by: UserId,
}

impl NewFile {
    /// Create a new file record.
    pub fn new(
        folder_id: FolderId,
        name: impl Into<String>,
        storage_path: impl Into<PathBuf>,
        size: u64,
        created_by: UserId,
    ) -> Self {
        Self {
            name: name.into(),
            storage_path: storage_path.into(),
            size,
            hash: None,
            mime: None,
            folder_id,
            created_by,
        }
    }

    /// Set the content hash.
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Set the MIME type.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}
