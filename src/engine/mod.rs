//! Structural operations on the document tree.
//!
//! Every operation follows the same order:
//! 1. load the records involved and authorize the acting user
//! 2. derive and check the physical paths
//! 3. change the filesystem
//! 4. change the metadata
//!
//! There is no two-phase commit between disk and store. A metadata failure
//! after a successful disk change is logged with the paths involved and
//! returned; only `create` and `upload_file` undo their own fresh entry.

mod copy;
mod delete;
mod files;
mod listing;
mod permissions;
mod physical;
mod structure;
pub mod walk;

pub use delete::DeleteSummary;
pub use files::FileContent;
pub use listing::{FolderTree, SortKey, SortOrder, TreeFilter};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, warn};

use crate::db::{User, UserDirectory, UserId};
use crate::path::PathResolver;
use crate::permission::{self, Operation};
use crate::tree::{FileEntry, FileId, Folder, FolderId, TreeStore};
use crate::{PortalError, Result};

/// Default maximum upload size (50 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Request data for creating a folder.
#[derive(Debug, Clone)]
pub struct CreateFolder {
    /// Display name.
    pub name: String,
    /// Parent folder (None for a root folder).
    pub parent: Option<FolderId>,
    /// Users to add on top of the inherited members.
    pub members: Vec<UserId>,
}

impl CreateFolder {
    /// Create a request for a root folder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            members: Vec::new(),
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent: FolderId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Add extra members.
    pub fn with_members(mut self, members: impl IntoIterator<Item = UserId>) -> Self {
        self.members.extend(members);
        self
    }
}

/// Orchestrates folder and file operations over a store and the disk.
pub struct HierarchyEngine {
    store: Arc<dyn TreeStore>,
    users: Arc<dyn UserDirectory>,
    paths: PathResolver,
    max_file_size: u64,
}

impl HierarchyEngine {
    /// Create a new engine.
    pub fn new(store: Arc<dyn TreeStore>, users: Arc<dyn UserDirectory>, paths: PathResolver) -> Self {
        Self {
            store,
            users,
            paths,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set the maximum upload size in bytes.
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Get the path resolver.
    pub fn paths(&self) -> &PathResolver {
        &self.paths
    }

    /// Get the metadata store.
    pub fn store(&self) -> &dyn TreeStore {
        self.store.as_ref()
    }

    async fn load_folder(&self, id: FolderId) -> Result<Folder> {
        self.store
            .find_folder(id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("folder {id}")))
    }

    async fn load_optional_folder(&self, id: Option<FolderId>) -> Result<Option<Folder>> {
        match id {
            Some(id) => Ok(Some(self.load_folder(id).await?)),
            None => Ok(None),
        }
    }

    async fn load_file(&self, id: FileId) -> Result<FileEntry> {
        self.store
            .find_file(id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("file {id}")))
    }

    fn authorize(&self, user: &User, operation: Operation, target: Option<&Folder>) -> Result<()> {
        let decision = permission::decide(user, operation, target);
        if !decision.is_allowed() {
            warn!(
                user_id = %user.id,
                operation = ?operation,
                folder_id = ?target.map(|f| f.id),
                "Operation denied"
            );
        }
        decision.into_result()
    }

    async fn admin_ids(&self) -> Result<BTreeSet<UserId>> {
        Ok(self.users.list_admins().await?.into_iter().map(|u| u.id).collect())
    }

    /// Directory that holds the children of `parent`.
    fn container_dir<'a>(&'a self, parent: Option<&'a Folder>) -> &'a Path {
        match parent {
            Some(folder) => &folder.full_path,
            None => self.paths.root(),
        }
    }

    /// Check a target path against both the disk and the store.
    async fn ensure_free(&self, path: &Path) -> Result<()> {
        if path.exists() || self.store.exists_by_path(path).await? {
            return Err(PortalError::Conflict(format!(
                "'{}' already exists",
                path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Check a path read back from the store before the disk is touched with it.
    fn stored_path(&self, path: &Path) -> Result<PathBuf> {
        self.paths.ensure_within_root(path).map_err(|e| {
            error!(path = %path.display(), "Stored path lies outside the storage root");
            e
        })
    }

    /// Paths of the folders and files already recorded in `dir`.
    async fn recorded_entries(&self, dir: Option<&Folder>) -> Result<BTreeSet<PathBuf>> {
        let mut taken = BTreeSet::new();
        match dir {
            Some(folder) => {
                for child in self.store.find_children(folder.id).await? {
                    taken.insert(child.full_path);
                }
                for file in self.store.find_files(folder.id).await? {
                    taken.insert(file.storage_path);
                }
            }
            None => {
                for root in self.store.find_root_folders(None).await? {
                    taken.insert(root.full_path);
                }
            }
        }
        Ok(taken)
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PortalError::Validation("name must not be empty".to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::HierarchyEngine;
    use crate::db::{NewUser, Role, User, UserId, UserRepository};
    use crate::path::PathResolver;
    use crate::tree::{
        FileEntry, FileId, Folder, FolderId, NewFile, NewFolder, SqliteTreeStore, TreeStore,
    };
    use crate::{Database, PortalError, Result};

    pub struct Fixture {
        pub _dir: TempDir,
        pub _db: Database,
        pub users: UserRepository,
        pub engine: HierarchyEngine,
        pub admin: User,
    }

    impl Fixture {
        pub async fn new() -> Self {
            Self::build(false).await
        }

        /// Fixture whose store reads normally but rejects every insert.
        pub async fn with_failing_inserts() -> Self {
            Self::build(true).await
        }

        async fn build(fail_inserts: bool) -> Self {
            let dir = TempDir::new().unwrap();
            let db = Database::open_in_memory().await.unwrap();
            let users = UserRepository::new(db.pool().clone());
            let inner = SqliteTreeStore::new(db.pool().clone());
            let store: Arc<dyn TreeStore> = Arc::new(InsertGate { inner, fail_inserts });
            let paths = PathResolver::new(dir.path()).unwrap();
            let engine = HierarchyEngine::new(store, Arc::new(users.clone()), paths);
            let admin = users
                .create(&NewUser::new("root1", "Root").with_role(Role::Admin))
                .await
                .unwrap();
            Self {
                _dir: dir,
                _db: db,
                users,
                engine,
                admin,
            }
        }

        pub async fn user(&self, username: &str, role: Role) -> User {
            self.users
                .create(&NewUser::new(username, username).with_role(role))
                .await
                .unwrap()
        }

        /// Insert a folder record directly, bypassing the engine.
        pub async fn seed_folder(&self, name: &str, path: &Path) -> Folder {
            SqliteTreeStore::new(self._db.pool().clone())
                .create_folder(&NewFolder::new(name, path, self.admin.id).with_members([self.admin.id]))
                .await
                .unwrap()
        }
    }

    struct InsertGate {
        inner: SqliteTreeStore,
        fail_inserts: bool,
    }

    impl InsertGate {
        fn check(&self) -> Result<()> {
            if self.fail_inserts {
                return Err(PortalError::Database("insert rejected".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TreeStore for InsertGate {
        async fn find_folder(&self, id: FolderId) -> Result<Option<Folder>> {
            self.inner.find_folder(id).await
        }
        async fn find_file(&self, id: FileId) -> Result<Option<FileEntry>> {
            self.inner.find_file(id).await
        }
        async fn find_children(&self, parent: FolderId) -> Result<Vec<Folder>> {
            self.inner.find_children(parent).await
        }
        async fn find_files(&self, folder: FolderId) -> Result<Vec<FileEntry>> {
            self.inner.find_files(folder).await
        }
        async fn search_files(&self, needle: &str) -> Result<Vec<FileEntry>> {
            self.inner.search_files(needle).await
        }
        async fn find_root_folders(&self, member: Option<UserId>) -> Result<Vec<Folder>> {
            self.inner.find_root_folders(member).await
        }
        async fn create_folder(&self, folder: &NewFolder) -> Result<Folder> {
            self.check()?;
            self.inner.create_folder(folder).await
        }
        async fn update_folder(&self, folder: &Folder) -> Result<()> {
            self.inner.update_folder(folder).await
        }
        async fn delete_folder(&self, id: FolderId) -> Result<bool> {
            self.inner.delete_folder(id).await
        }
        async fn create_file(&self, file: &NewFile) -> Result<FileEntry> {
            self.check()?;
            self.inner.create_file(file).await
        }
        async fn update_file(&self, file: &FileEntry) -> Result<()> {
            self.inner.update_file(file).await
        }
        async fn delete_file(&self, id: FileId) -> Result<bool> {
            self.inner.delete_file(id).await
        }
        async fn exists_by_path(&self, path: &Path) -> Result<bool> {
            self.inner.exists_by_path(path).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_folder_request() {
        let req = CreateFolder::new("Contracts")
            .with_parent(FolderId(3))
            .with_members([UserId(4), UserId(5)]);
        assert_eq!(req.parent, Some(FolderId(3)));
        assert_eq!(req.members.len(), 2);
    }

    #[tokio::test]
    async fn test_stored_path_outside_root_is_rejected() {
        let fx = test_support::Fixture::new().await;
        let inside = fx.engine.paths().root().join("A");

        assert_eq!(fx.engine.stored_path(&inside).unwrap(), inside);
        assert!(matches!(
            fx.engine.stored_path(Path::new("/etc/passwd")),
            Err(PortalError::Validation(_))
        ));
        assert!(matches!(
            fx.engine.stored_path(&inside.join("../../outside")),
            Err(PortalError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  2024 ").unwrap(), "2024");
        assert!(matches!(validate_name("   "), Err(PortalError::Validation(_))));
    }
}
