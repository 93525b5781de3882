//! Recursive folder copy.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, info};

use super::walk::{self, Subtree};
use super::{physical, HierarchyEngine};
use crate::db::User;
use crate::permission::Operation;
use crate::tree::{Folder, FolderId, NewFile, NewFolder};
use crate::{PortalError, Result};

impl HierarchyEngine {
    /// Copy a folder with everything below it into `destination`.
    ///
    /// The copy gets the first free name among `name`, `name (2)`, ...
    /// Each copied folder keeps the members of its source and is owned by
    /// the acting user. Returns the top folder of the copy.
    pub async fn copy_folder(
        &self,
        id: FolderId,
        destination: Option<FolderId>,
        user: &User,
    ) -> Result<Folder> {
        let source = self.load_folder(id).await?;
        self.authorize(user, Operation::Copy, Some(&source))?;

        let dest = self.load_optional_folder(destination).await?;
        self.authorize(user, Operation::CreateIn, dest.as_ref())?;

        let dest_dir = self.container_dir(dest.as_ref()).to_path_buf();
        let taken = self.recorded_entries(dest.as_ref()).await?;
        let name = self
            .paths
            .generate_available_name_with(&source.name, &dest_dir, |p| taken.contains(p))?;

        // Read before writing so a copy into the source's own subtree
        // does not pick up the folders it creates.
        let subtree = Subtree::snapshot(self.store(), source).await?;

        let path = self.paths.resolve(&dest_dir, &name)?;
        physical::create_dir(&path)?;
        let mut members = subtree.root().permitted_users.clone();
        members.insert(user.id);
        let mut record = NewFolder::new(&name, path, user.id).with_members(members);
        if let Some(parent_id) = destination {
            record = record.with_parent(parent_id);
        }
        let top = self.store.create_folder(&record).await?;

        let files = self.copy_contents(&subtree, &top, user).await?;

        info!(
            source_id = %id,
            copy_id = %top.id,
            user_id = %user.id,
            folders = subtree.folder_count(),
            files,
            "Folder copied"
        );
        Ok(top)
    }

    /// Replace everything inside `target` with a copy of what `source` holds.
    ///
    /// `target` keeps its id, name and members. Its files and subfolders
    /// are deleted first, then the source's files and subfolders are
    /// copied in. Neither folder may lie inside the other.
    pub async fn replace_folder_content(
        &self,
        source: FolderId,
        target: FolderId,
        user: &User,
    ) -> Result<Folder> {
        let source = self.load_folder(source).await?;
        self.authorize(user, Operation::Copy, Some(&source))?;
        let target = self.load_folder(target).await?;
        self.authorize(user, Operation::ManageFiles, Some(&target))?;

        if walk::is_same_or_descendant(self.store(), target.id, source.id).await?
            || walk::is_same_or_descendant(self.store(), source.id, target.id).await?
        {
            return Err(PortalError::State(
                "source and target folders must not contain each other".to_string(),
            ));
        }
        self.stored_path(&target.full_path)?;

        let old = Subtree::snapshot(self.store(), target.clone()).await?;
        let removed = self.purge(old, false).await?;

        let subtree = Subtree::snapshot(self.store(), source).await?;
        let files = self.copy_contents(&subtree, &target, user).await?;

        info!(
            source_id = %subtree.root().id,
            target_id = %target.id,
            user_id = %user.id,
            removed_folders = removed.folders,
            removed_files = removed.files,
            files,
            "Folder content replaced"
        );
        Ok(target)
    }

    /// Copy the files and subfolders of `subtree` into the existing folder
    /// `top`, returning how many files were copied.
    ///
    /// Each copied subfolder keeps the members of its source plus the
    /// acting user, who becomes its creator.
    async fn copy_contents(&self, subtree: &Subtree, top: &Folder, user: &User) -> Result<usize> {
        let mut copied: HashMap<FolderId, (FolderId, PathBuf)> = HashMap::new();
        let mut file_count = 0usize;

        for node in subtree.pre_order() {
            let (folder_id, path) = if node.depth == 0 {
                (top.id, top.full_path.clone())
            } else {
                let source_parent = node.folder.parent_id.ok_or_else(|| {
                    PortalError::State(format!("folder {} lost its parent", node.folder.id))
                })?;
                let (new_parent, parent_dir) = copied.get(&source_parent).ok_or_else(|| {
                    PortalError::State(format!("parent of folder {} not copied", node.folder.id))
                })?;

                let path = self.paths.resolve(parent_dir, &node.folder.name)?;
                physical::create_dir(&path)?;

                let mut members = node.folder.permitted_users.clone();
                members.insert(user.id);
                let record = NewFolder::new(&node.folder.name, path.clone(), user.id)
                    .with_parent(*new_parent)
                    .with_members(members);
                let created = self.store.create_folder(&record).await?;
                debug!("Copied folder {} to {}", node.folder.id, created.id);
                (created.id, path)
            };

            for file in &node.files {
                let source_path = self.stored_path(&file.storage_path)?;
                let target = self.paths.resolve(&path, &file.name)?;
                physical::copy_file(&source_path, &target)?;

                let mut new_file = NewFile::new(folder_id, &file.name, target, file.size, user.id);
                new_file.hash = file.hash.clone();
                new_file.mime = file.mime.clone();
                self.store.create_file(&new_file).await?;
                file_count += 1;
            }

            copied.insert(node.folder.id, (folder_id, path));
        }
        Ok(file_count)
    }
}
