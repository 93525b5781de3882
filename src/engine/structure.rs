//! Create, rename and move.

use std::path::Path;

use tracing::{debug, error, info, warn};

use super::walk::{self, Subtree};
use super::{physical, validate_name, CreateFolder, HierarchyEngine};
use crate::db::{User, UserId};
use crate::path::PathResolver;
use crate::permission::Operation;
use crate::tree::{Folder, FolderId, NewFolder};
use crate::{PortalError, Result};

impl HierarchyEngine {
    /// Create a folder.
    ///
    /// Members are every administrator, the parent's members, the creator
    /// and any extra members named in the request.
    pub async fn create_folder(&self, request: &CreateFolder, user: &User) -> Result<Folder> {
        let name = validate_name(&request.name)?;
        let parent = self.load_optional_folder(request.parent).await?;
        self.authorize(user, Operation::CreateIn, parent.as_ref())?;

        let path = self
            .paths
            .resolve(self.container_dir(parent.as_ref()), name)?;
        self.ensure_free(&path).await?;

        let mut members = self.admin_ids().await?;
        if let Some(parent) = &parent {
            members.extend(parent.permitted_users.iter().copied());
        }
        members.insert(user.id);
        members.extend(self.existing_users(&request.members).await?);

        physical::create_dir(&path)?;

        let mut record = NewFolder::new(name, path.clone(), user.id).with_members(members);
        if let Some(parent) = &parent {
            record = record.with_parent(parent.id);
        }

        let folder = match self.store.create_folder(&record).await {
            Ok(folder) => folder,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Folder record not saved, removing directory");
                if let Err(cleanup) = physical::remove_dir(&path) {
                    warn!(path = %path.display(), error = %cleanup, "Leftover directory after failed create");
                }
                return Err(e);
            }
        };

        info!(
            folder_id = %folder.id,
            user_id = %user.id,
            path = %folder.full_path.display(),
            "Folder created"
        );
        Ok(folder)
    }

    /// Rename a folder within its parent.
    pub async fn rename_folder(&self, id: FolderId, new_name: &str, user: &User) -> Result<Folder> {
        let name = validate_name(new_name)?;
        let folder = self.load_folder(id).await?;
        self.authorize(user, Operation::Rename, Some(&folder))?;

        let parent_dir = folder.full_path.parent().ok_or_else(|| {
            PortalError::State(format!("folder {} has no parent directory", folder.id))
        })?;
        let new_path = self.paths.resolve(parent_dir, name)?;

        if new_path == folder.full_path {
            let mut folder = folder;
            folder.name = name.to_string();
            self.store.update_folder(&folder).await?;
            return Ok(folder);
        }
        self.ensure_free(&new_path).await?;

        let old_path = folder.full_path.clone();
        self.stored_path(&old_path)?;
        let mut subtree = Subtree::snapshot(self.store(), folder).await?;

        physical::rename(&old_path, &new_path)?;

        subtree.root_mut().name = name.to_string();
        self.rewrite_subtree(&mut subtree, &old_path, &new_path).await?;

        info!(
            folder_id = %id,
            user_id = %user.id,
            from = %old_path.display(),
            to = %new_path.display(),
            "Folder renamed"
        );
        Ok(subtree.root().clone())
    }

    /// Move a folder under a new parent, or to the top level.
    pub async fn move_folder(
        &self,
        id: FolderId,
        new_parent: Option<FolderId>,
        user: &User,
    ) -> Result<Folder> {
        let folder = self.load_folder(id).await?;
        self.authorize(user, Operation::Move, Some(&folder))?;

        let destination = self.load_optional_folder(new_parent).await?;
        self.authorize(user, Operation::CreateIn, destination.as_ref())?;

        if let Some(dest) = &destination {
            if walk::is_same_or_descendant(self.store(), dest.id, folder.id).await? {
                return Err(PortalError::State(
                    "cannot move a folder into itself or one of its subfolders".to_string(),
                ));
            }
        }

        if folder.parent_id == new_parent {
            debug!("Folder {} already under the requested parent", id);
            return Ok(folder);
        }

        let new_path = self
            .paths
            .resolve(self.container_dir(destination.as_ref()), &folder.name)?;
        self.ensure_free(&new_path).await?;

        let old_path = folder.full_path.clone();
        self.stored_path(&old_path)?;
        let mut subtree = Subtree::snapshot(self.store(), folder).await?;

        physical::rename(&old_path, &new_path)?;

        subtree.root_mut().parent_id = new_parent;
        self.rewrite_subtree(&mut subtree, &old_path, &new_path).await?;

        info!(
            folder_id = %id,
            user_id = %user.id,
            from = %old_path.display(),
            to = %new_path.display(),
            "Folder moved"
        );
        Ok(subtree.root().clone())
    }

    /// Rebase every stored path in `subtree` from `old` to `new` and persist it.
    async fn rewrite_subtree(&self, subtree: &mut Subtree, old: &Path, new: &Path) -> Result<()> {
        for node in subtree.nodes_mut() {
            node.folder.full_path = PathResolver::rebase(&node.folder.full_path, old, new)?;
            self.store.update_folder(&node.folder).await.map_err(|e| {
                error!(
                    folder_id = %node.folder.id,
                    path = %node.folder.full_path.display(),
                    error = %e,
                    "Directory moved but folder record not updated"
                );
                e
            })?;

            for file in &mut node.files {
                file.storage_path = PathResolver::rebase(&file.storage_path, old, new)?;
                self.store.update_file(file).await?;
            }
        }
        Ok(())
    }

    /// Keep the requested ids, failing if any of them is unknown.
    pub(super) async fn existing_users(&self, ids: &[UserId]) -> Result<Vec<UserId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<UserId> = self
            .users
            .find_users(ids)
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect();

        if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
            return Err(PortalError::NotFound(format!("user {missing}")));
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::db::Role;
    use crate::tree::TreeStore;

    #[tokio::test]
    async fn test_create_root_seeds_admins_and_creator() {
        let fx = Fixture::new().await;
        let basic = fx.user("basic1", Role::Basic).await;

        let folder = fx
            .engine
            .create_folder(&CreateFolder::new("Contracts").with_members([basic.id]), &fx.admin)
            .await
            .unwrap();

        assert!(folder.is_root());
        assert_eq!(folder.full_path, fx.engine.paths().root().join("Contracts"));
        assert!(folder.full_path.is_dir());
        assert!(folder.is_member(fx.admin.id));
        assert!(folder.is_member(basic.id));
    }

    #[tokio::test]
    async fn test_create_child_inherits_parent_members() {
        let fx = Fixture::new().await;
        let manager = fx.user("mgr1", Role::Manager).await;
        let root = fx
            .engine
            .create_folder(&CreateFolder::new("Contracts").with_members([manager.id]), &fx.admin)
            .await
            .unwrap();

        let child = fx
            .engine
            .create_folder(&CreateFolder::new("2024").with_parent(root.id), &manager)
            .await
            .unwrap();

        assert_eq!(child.parent_id, Some(root.id));
        assert_eq!(child.full_path, root.full_path.join("2024"));
        assert_eq!(child.permitted_users, root.permitted_users);
    }

    #[tokio::test]
    async fn test_non_admin_cannot_create_root() {
        let fx = Fixture::new().await;
        let manager = fx.user("mgr1", Role::Manager).await;

        let result = fx
            .engine
            .create_folder(&CreateFolder::new("Mine"), &manager)
            .await;
        assert!(matches!(result, Err(PortalError::Permission(_))));
        assert!(!fx.engine.paths().root().join("Mine").exists());
    }

    #[tokio::test]
    async fn test_create_rejects_empty_and_duplicate_names() {
        let fx = Fixture::new().await;
        let result = fx.engine.create_folder(&CreateFolder::new("  "), &fx.admin).await;
        assert!(matches!(result, Err(PortalError::Validation(_))));

        fx.engine
            .create_folder(&CreateFolder::new("Docs"), &fx.admin)
            .await
            .unwrap();
        let result = fx.engine.create_folder(&CreateFolder::new("Docs"), &fx.admin).await;
        assert!(matches!(result, Err(PortalError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_with_unknown_member_is_not_found() {
        let fx = Fixture::new().await;
        let result = fx
            .engine
            .create_folder(&CreateFolder::new("Docs").with_members([UserId(404)]), &fx.admin)
            .await;
        assert!(matches!(result, Err(PortalError::NotFound(_))));
        assert!(!fx.engine.paths().root().join("Docs").exists());
    }

    #[tokio::test]
    async fn test_rename_rewrites_descendants() {
        let fx = Fixture::new().await;
        let root = fx
            .engine
            .create_folder(&CreateFolder::new("A"), &fx.admin)
            .await
            .unwrap();
        let child = fx
            .engine
            .create_folder(&CreateFolder::new("x").with_parent(root.id), &fx.admin)
            .await
            .unwrap();

        let renamed = fx.engine.rename_folder(root.id, "B", &fx.admin).await.unwrap();
        let new_root = fx.engine.paths().root().join("B");
        assert_eq!(renamed.name, "B");
        assert_eq!(renamed.full_path, new_root);
        assert!(new_root.join("x").is_dir());
        assert!(!fx.engine.paths().root().join("A").exists());

        let child = fx.engine.store().find_folder(child.id).await.unwrap().unwrap();
        assert_eq!(child.full_path, new_root.join("x"));
    }

    #[tokio::test]
    async fn test_rename_collision_is_conflict() {
        let fx = Fixture::new().await;
        let a = fx
            .engine
            .create_folder(&CreateFolder::new("A"), &fx.admin)
            .await
            .unwrap();
        fx.engine
            .create_folder(&CreateFolder::new("B"), &fx.admin)
            .await
            .unwrap();

        let result = fx.engine.rename_folder(a.id, "B", &fx.admin).await;
        assert!(matches!(result, Err(PortalError::Conflict(_))));
        assert!(a.full_path.is_dir());
    }

    #[tokio::test]
    async fn test_move_into_own_subtree_is_state() {
        let fx = Fixture::new().await;
        let a = fx
            .engine
            .create_folder(&CreateFolder::new("A"), &fx.admin)
            .await
            .unwrap();
        let b = fx
            .engine
            .create_folder(&CreateFolder::new("B").with_parent(a.id), &fx.admin)
            .await
            .unwrap();

        let result = fx.engine.move_folder(a.id, Some(b.id), &fx.admin).await;
        assert!(matches!(result, Err(PortalError::State(_))));
        let result = fx.engine.move_folder(a.id, Some(a.id), &fx.admin).await;
        assert!(matches!(result, Err(PortalError::State(_))));
        assert!(b.full_path.is_dir());
    }

    #[tokio::test]
    async fn test_move_between_parents() {
        let fx = Fixture::new().await;
        let a = fx
            .engine
            .create_folder(&CreateFolder::new("A"), &fx.admin)
            .await
            .unwrap();
        let b = fx
            .engine
            .create_folder(&CreateFolder::new("B"), &fx.admin)
            .await
            .unwrap();
        let x = fx
            .engine
            .create_folder(&CreateFolder::new("x").with_parent(a.id), &fx.admin)
            .await
            .unwrap();

        let moved = fx.engine.move_folder(x.id, Some(b.id), &fx.admin).await.unwrap();
        assert_eq!(moved.parent_id, Some(b.id));
        assert_eq!(moved.full_path, b.full_path.join("x"));
        assert!(moved.full_path.is_dir());

        let to_root = fx.engine.move_folder(x.id, None, &fx.admin).await.unwrap();
        assert!(to_root.is_root());
        assert_eq!(to_root.full_path, fx.engine.paths().root().join("x"));
    }

    #[tokio::test]
    async fn test_move_with_record_outside_root_is_rejected() {
        let fx = Fixture::new().await;
        let outside = tempfile::TempDir::new().unwrap();
        let dest = fx
            .engine
            .create_folder(&CreateFolder::new("Dest"), &fx.admin)
            .await
            .unwrap();
        let mut folder = fx
            .engine
            .create_folder(&CreateFolder::new("A"), &fx.admin)
            .await
            .unwrap();
        folder.full_path = outside.path().to_path_buf();
        fx.engine.store().update_folder(&folder).await.unwrap();

        let result = fx.engine.move_folder(folder.id, Some(dest.id), &fx.admin).await;
        assert!(matches!(result, Err(PortalError::Validation(_))));
        assert!(outside.path().is_dir());
        assert!(!dest.full_path.join("A").exists());
    }

    #[tokio::test]
    async fn test_failed_record_insert_removes_directory() {
        let fx = Fixture::with_failing_inserts().await;

        let result = fx.engine.create_folder(&CreateFolder::new("A"), &fx.admin).await;
        assert!(matches!(result, Err(PortalError::Database(_))));
        assert!(!fx.engine.paths().root().join("A").exists());
    }
}
