//! Folder deletion.

use tracing::{debug, info};

use super::walk::Subtree;
use super::{physical, HierarchyEngine};
use crate::db::User;
use crate::permission::Operation;
use crate::tree::FolderId;
use crate::{PortalError, Result};

/// Counts of what a delete removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    /// Folders removed, the target included.
    pub folders: usize,
    /// Files removed.
    pub files: usize,
}

impl HierarchyEngine {
    /// Delete a folder.
    ///
    /// Without `cascade` the folder must have no subfolders and no files.
    /// With it, files go first, then folders leaves first, the target last.
    /// A failure stops the walk; what was already removed stays removed.
    pub async fn delete_folder(&self, id: FolderId, user: &User, cascade: bool) -> Result<DeleteSummary> {
        let folder = self.load_folder(id).await?;
        self.authorize(user, Operation::Delete, Some(&folder))?;

        let subtree = Subtree::snapshot(self.store(), folder).await?;
        if !cascade && (subtree.folder_count() > 1 || subtree.file_count() > 0) {
            return Err(PortalError::State(format!(
                "folder {id} is not empty; delete its contents first"
            )));
        }

        let path = subtree.root().full_path.clone();
        let summary = self.purge(subtree, true).await?;

        info!(
            folder_id = %id,
            user_id = %user.id,
            path = %path.display(),
            folders = summary.folders,
            files = summary.files,
            "Folder deleted"
        );
        Ok(summary)
    }

    /// Delete several folders in order.
    ///
    /// Stops at the first failure; earlier deletions are kept.
    pub async fn delete_batch(&self, ids: &[FolderId], user: &User, cascade: bool) -> Result<DeleteSummary> {
        if ids.is_empty() {
            return Err(PortalError::Validation("no folders selected".to_string()));
        }

        let mut total = DeleteSummary::default();
        for id in ids {
            let summary = self.delete_folder(*id, user, cascade).await?;
            total.folders += summary.folders;
            total.files += summary.files;
        }
        Ok(total)
    }

    /// Remove the files and folders of `subtree`, leaves first.
    ///
    /// With `include_root` false the root folder itself is kept and only
    /// its files and subfolders go.
    pub(super) async fn purge(&self, subtree: Subtree, include_root: bool) -> Result<DeleteSummary> {
        let mut summary = DeleteSummary::default();

        for node in subtree.into_leaves_first() {
            for file in &node.files {
                physical::remove_file(&self.stored_path(&file.storage_path)?)?;
                self.store.delete_file(file.id).await?;
                summary.files += 1;
            }

            if node.depth == 0 && !include_root {
                continue;
            }
            physical::remove_dir(&self.stored_path(&node.folder.full_path)?)?;
            self.store.delete_folder(node.folder.id).await?;
            summary.folders += 1;
            debug!("Deleted folder {}", node.folder.id);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::super::CreateFolder;
    use super::*;
    use crate::db::Role;
    use crate::tree::TreeStore;

    #[tokio::test]
    async fn test_non_cascade_delete_of_non_empty_is_state() {
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

        let result = fx.engine.delete_folder(a.id, &fx.admin, false).await;
        assert!(matches!(result, Err(PortalError::State(_))));
        assert!(b.full_path.is_dir());
        assert!(fx.engine.store().find_folder(b.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cascade_delete_removes_everything() {
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
        let file = fx
            .engine
            .upload_file(b.id, "x.txt", b"x", &fx.admin)
            .await
            .unwrap();

        let summary = fx.engine.delete_folder(a.id, &fx.admin, true).await.unwrap();
        assert_eq!(summary, DeleteSummary { folders: 2, files: 1 });
        assert!(!a.full_path.exists());
        assert!(fx.engine.store().find_folder(a.id).await.unwrap().is_none());
        assert!(fx.engine.store().find_folder(b.id).await.unwrap().is_none());
        assert!(fx.engine.store().find_file(file.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_empty_folder_without_cascade() {
        let fx = Fixture::new().await;
        let a = fx
            .engine
            .create_folder(&CreateFolder::new("A"), &fx.admin)
            .await
            .unwrap();

        fx.engine.delete_folder(a.id, &fx.admin, false).await.unwrap();
        assert!(!a.full_path.exists());
    }

    #[tokio::test]
    async fn test_manager_cannot_delete_root() {
        let fx = Fixture::new().await;
        let manager = fx.user("mgr1", Role::Manager).await;
        let root = fx
            .engine
            .create_folder(&CreateFolder::new("R").with_members([manager.id]), &fx.admin)
            .await
            .unwrap();

        let result = fx.engine.delete_folder(root.id, &manager, true).await;
        assert!(matches!(result, Err(PortalError::Permission(_))));
        assert!(root.full_path.is_dir());
    }

    #[tokio::test]
    async fn test_delete_batch() {
        let fx = Fixture::new().await;
        let result = fx.engine.delete_batch(&[], &fx.admin, true).await;
        assert!(matches!(result, Err(PortalError::Validation(_))));

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

        let result = fx
            .engine
            .delete_batch(&[a.id, FolderId(999), b.id], &fx.admin, true)
            .await;
        assert!(matches!(result, Err(PortalError::NotFound(_))));
        assert!(!a.full_path.exists());
        assert!(b.full_path.exists());
    }

    #[tokio::test]
    async fn test_record_pointing_outside_root_is_not_removed() {
        let fx = Fixture::new().await;
        let outside = tempfile::TempDir::new().unwrap();
        let victim = outside.path().join("keep.txt");
        std::fs::write(&victim, b"keep").unwrap();

        let a = fx
            .engine
            .create_folder(&CreateFolder::new("A"), &fx.admin)
            .await
            .unwrap();
        let mut file = fx
            .engine
            .upload_file(a.id, "x.txt", b"x", &fx.admin)
            .await
            .unwrap();
        file.storage_path = victim.clone();
        fx.engine.store().update_file(&file).await.unwrap();

        let result = fx.engine.delete_folder(a.id, &fx.admin, true).await;
        assert!(matches!(result, Err(PortalError::Validation(_))));
        assert!(victim.is_file());
        assert!(fx.engine.store().find_folder(a.id).await.unwrap().is_some());
    }
}
