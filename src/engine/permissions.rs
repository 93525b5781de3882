//! Folder membership changes.

use tracing::info;

use super::HierarchyEngine;
use crate::db::{User, UserId};
use crate::permission::{self, Operation};
use crate::tree::{Folder, FolderId};
use crate::Result;

impl HierarchyEngine {
    /// Add and remove members of a folder, then copy the resulting set to
    /// every folder below it.
    ///
    /// Allowed for administrators, the folder's creator and managers.
    /// Administrators and the creator cannot be removed.
    pub async fn update_permissions(
        &self,
        id: FolderId,
        add: &[UserId],
        remove: &[UserId],
        user: &User,
    ) -> Result<Folder> {
        let mut folder = self.load_folder(id).await?;
        self.authorize(user, Operation::UpdatePermissions, Some(&folder))?;

        let added = self.existing_users(add).await?;
        let admins = self.admin_ids().await?;

        permission::add_members(&mut folder, &added);
        permission::remove_members(&mut folder, remove, &admins)?;

        self.store.update_folder(&folder).await?;
        let descendants =
            permission::propagate_down(self.store(), folder.id, &folder.permitted_users).await?;

        info!(
            folder_id = %id,
            user_id = %user.id,
            added = added.len(),
            removed = remove.len(),
            descendants,
            "Folder members updated"
        );
        Ok(folder)
    }

    /// Users allowed into a folder.
    pub async fn list_members(&self, id: FolderId, user: &User) -> Result<Vec<User>> {
        let folder = self.load_folder(id).await?;
        self.authorize(user, Operation::View, Some(&folder))?;

        let ids: Vec<UserId> = folder.permitted_users.iter().copied().collect();
        self.users.find_users(&ids).await
    }
}
