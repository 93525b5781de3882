//! Test helpers for integration tests.
//!
//! Provides TestPortal, a fully wired engine over a temporary storage root
//! and a file-backed database, plus user helpers.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use docportal::{
    CreateFolder, Database, Folder, HierarchyEngine, NewUser, PathResolver, Role, SqliteTreeStore,
    User, UserRepository,
};

/// A portal instance living in a temporary directory.
pub struct TestPortal {
    dir: TempDir,
    db: Database,
    users: UserRepository,
    engine: Arc<HierarchyEngine>,
    admin: User,
}

impl TestPortal {
    /// Create a portal with one administrator named `root1`.
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let storage = dir.path().join("storage");
        std::fs::create_dir_all(&storage).unwrap();

        let db = Database::open(dir.path().join("portal.db"), 4).await.unwrap();
        let users = UserRepository::new(db.pool().clone());
        let store = SqliteTreeStore::new(db.pool().clone());
        let paths = PathResolver::new(&storage).unwrap();
        let engine = Arc::new(HierarchyEngine::new(
            Arc::new(store),
            Arc::new(users.clone()),
            paths,
        ));

        let admin = users
            .create(&NewUser::new("root1", "Administrator").with_role(Role::Admin))
            .await
            .unwrap();

        Self {
            dir,
            db,
            users,
            engine,
            admin,
        }
    }

    pub fn engine(&self) -> &HierarchyEngine {
        &self.engine
    }

    pub fn shared_engine(&self) -> Arc<HierarchyEngine> {
        Arc::clone(&self.engine)
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn admin(&self) -> &User {
        &self.admin
    }

    pub fn storage_root(&self) -> PathBuf {
        self.engine.paths().root().to_path_buf()
    }

    pub fn temp_path(&self) -> &Path {
        self.dir.path()
    }

    /// Create a user with a single role.
    pub async fn create_user(&self, username: &str, role: Role) -> User {
        self.users
            .create(&NewUser::new(username, username).with_role(role))
            .await
            .unwrap()
    }

    /// Create a folder as the administrator.
    pub async fn admin_folder(&self, request: CreateFolder) -> Folder {
        self.engine.create_folder(&request, &self.admin).await.unwrap()
    }
}
