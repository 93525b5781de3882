//! docportal - folder and file management for a document portal
//!
//! Keeps a tree of folders with per-folder member lists in SQLite and the
//! matching directory tree on disk in step.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod identity;
pub mod logging;
pub mod path;
pub mod permission;
pub mod session;
pub mod tree;

pub use config::Config;
pub use db::{Database, NewUser, Role, User, UserDirectory, UserId, UserRepository};
pub use engine::{
    CreateFolder, DeleteSummary, FileContent, FolderTree, HierarchyEngine, SortKey, SortOrder,
    TreeFilter,
};
pub use error::{ErrorClass, PortalError, Result};
pub use identity::{DirectoryIdentityResolver, IdentityResolver, RequestContext};
pub use path::PathResolver;
pub use permission::{Decision, Operation};
pub use session::SessionRegistry;
pub use tree::{FileEntry, FileId, Folder, FolderId, SqliteTreeStore, TreeStore};
