//! File operations inside folders.

use std::collections::HashMap;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{error, info, warn};

use super::{physical, validate_name, HierarchyEngine};
use crate::db::User;
use crate::permission::{self, Operation};
use crate::tree::{FileEntry, FileId, FolderId, NewFile};
use crate::{PortalError, Result};

/// A stored file together with its bytes.
#[derive(Debug)]
pub struct FileContent {
    /// File record.
    pub entry: FileEntry,
    /// File content.
    pub content: Vec<u8>,
}

fn content_hash(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name).first_or_octet_stream().to_string()
}

impl HierarchyEngine {
    /// Store a new file in a folder.
    ///
    /// Fails with `Validation` above the size limit and with `Conflict`
    /// when the folder already holds an entry with that name.
    pub async fn upload_file(
        &self,
        folder_id: FolderId,
        name: &str,
        content: &[u8],
        user: &User,
    ) -> Result<FileEntry> {
        self.check_size(content)?;
        let name = validate_name(name)?;

        let folder = self.load_folder(folder_id).await?;
        self.authorize(user, Operation::ManageFiles, Some(&folder))?;

        let path = self.paths.resolve(&folder.full_path, name)?;
        self.ensure_free(&path).await?;

        physical::write_new_file(&path, content)?;

        let record = NewFile::new(folder.id, name, path.clone(), content.len() as u64, user.id)
            .with_hash(content_hash(content))
            .with_mime(guess_mime(name));
        let entry = match self.store.create_file(&record).await {
            Ok(entry) => entry,
            Err(e) => {
                error!(path = %path.display(), error = %e, "File record not saved, removing file");
                if let Err(cleanup) = physical::remove_file(&path) {
                    warn!(path = %path.display(), error = %cleanup, "Leftover file after failed upload");
                }
                return Err(e);
            }
        };

        info!(
            file_id = %entry.id,
            folder_id = %folder.id,
            user_id = %user.id,
            size = entry.size,
            "File uploaded"
        );
        Ok(entry)
    }

    /// Read a file's record and bytes.
    pub async fn read_file(&self, id: FileId, user: &User) -> Result<FileContent> {
        let entry = self.load_file(id).await?;
        let folder = self.load_folder(entry.folder_id).await?;
        self.authorize(user, Operation::View, Some(&folder))?;

        let content = physical::read_file(&self.stored_path(&entry.storage_path)?)?;
        Ok(FileContent { entry, content })
    }

    /// Files stored directly in a folder.
    pub async fn list_files(&self, folder_id: FolderId, user: &User) -> Result<Vec<FileEntry>> {
        let folder = self.load_folder(folder_id).await?;
        self.authorize(user, Operation::View, Some(&folder))?;
        self.store.find_files(folder.id).await
    }

    /// Rename a file within its folder.
    pub async fn rename_file(&self, id: FileId, new_name: &str, user: &User) -> Result<FileEntry> {
        let name = validate_name(new_name)?;
        let mut entry = self.load_file(id).await?;
        let folder = self.load_folder(entry.folder_id).await?;
        self.authorize(user, Operation::ManageFiles, Some(&folder))?;

        let new_path = self.paths.resolve(&folder.full_path, name)?;
        if new_path != entry.storage_path {
            self.ensure_free(&new_path).await?;
            physical::rename(&self.stored_path(&entry.storage_path)?, &new_path)?;
        }

        entry.name = name.to_string();
        entry.mime = Some(guess_mime(name));
        self.relocate(entry, &new_path).await
    }

    /// Move a file into another folder.
    pub async fn move_file(&self, id: FileId, destination: FolderId, user: &User) -> Result<FileEntry> {
        let mut entry = self.load_file(id).await?;
        let source = self.load_folder(entry.folder_id).await?;
        self.authorize(user, Operation::ManageFiles, Some(&source))?;
        let dest = self.load_folder(destination).await?;
        self.authorize(user, Operation::ManageFiles, Some(&dest))?;

        if dest.id == source.id {
            return Ok(entry);
        }

        let new_path = self.paths.resolve(&dest.full_path, &entry.name)?;
        self.ensure_free(&new_path).await?;
        physical::rename(&self.stored_path(&entry.storage_path)?, &new_path)?;

        entry.folder_id = dest.id;
        self.relocate(entry, &new_path).await
    }

    /// Copy a file into a folder under a collision-free name.
    pub async fn copy_file(&self, id: FileId, destination: FolderId, user: &User) -> Result<FileEntry> {
        let entry = self.load_file(id).await?;
        let source = self.load_folder(entry.folder_id).await?;
        self.authorize(user, Operation::View, Some(&source))?;
        let dest = self.load_folder(destination).await?;
        self.authorize(user, Operation::ManageFiles, Some(&dest))?;

        let taken = self.recorded_entries(Some(&dest)).await?;
        let name = self.paths.generate_available_file_name_with(
            &entry.name,
            &dest.full_path,
            |p| taken.contains(p),
        )?;
        let target = self.paths.resolve(&dest.full_path, &name)?;

        let size = physical::copy_file(&self.stored_path(&entry.storage_path)?, &target)?;

        let mut record = NewFile::new(dest.id, name, target, size, user.id);
        record.hash = entry.hash.clone();
        record.mime = entry.mime.clone();
        let copy = self.store.create_file(&record).await?;

        info!(
            source_id = %id,
            copy_id = %copy.id,
            folder_id = %dest.id,
            user_id = %user.id,
            "File copied"
        );
        Ok(copy)
    }

    /// Delete a file and its bytes.
    pub async fn delete_file(&self, id: FileId, user: &User) -> Result<()> {
        let entry = self.load_file(id).await?;
        let folder = self.load_folder(entry.folder_id).await?;
        self.authorize(user, Operation::ManageFiles, Some(&folder))?;

        physical::remove_file(&self.stored_path(&entry.storage_path)?)?;
        self.store.delete_file(entry.id).await?;

        info!(file_id = %id, user_id = %user.id, "File deleted");
        Ok(())
    }

    /// Replace a file's content, and possibly its name, keeping its id.
    ///
    /// Size, hash and MIME type are recomputed. A new name must be free in
    /// the folder.
    pub async fn replace_file(
        &self,
        id: FileId,
        name: &str,
        content: &[u8],
        user: &User,
    ) -> Result<FileEntry> {
        self.check_size(content)?;
        let name = validate_name(name)?;
        let mut entry = self.load_file(id).await?;
        let folder = self.load_folder(entry.folder_id).await?;
        self.authorize(user, Operation::ManageFiles, Some(&folder))?;

        let old_path = self.stored_path(&entry.storage_path)?;
        let new_path = self.paths.resolve(&folder.full_path, name)?;

        if new_path == old_path {
            physical::overwrite_file(&new_path, content)?;
        } else {
            self.ensure_free(&new_path).await?;
            physical::write_new_file(&new_path, content)?;
            physical::remove_file(&old_path)?;
        }

        entry.name = name.to_string();
        entry.size = content.len() as u64;
        entry.hash = Some(content_hash(content));
        entry.mime = Some(guess_mime(name));
        let entry = self.relocate(entry, &new_path).await?;

        info!(file_id = %id, user_id = %user.id, size = entry.size, "File content replaced");
        Ok(entry)
    }

    /// Delete several files in order.
    ///
    /// Stops at the first failure; earlier deletions are kept.
    pub async fn delete_files(&self, ids: &[FileId], user: &User) -> Result<usize> {
        if ids.is_empty() {
            return Err(PortalError::Validation("no files selected".to_string()));
        }

        for id in ids {
            self.delete_file(*id, user).await?;
        }
        Ok(ids.len())
    }

    /// Delete every file stored directly in a folder. Subfolders are kept.
    pub async fn delete_folder_files(&self, folder_id: FolderId, user: &User) -> Result<usize> {
        let folder = self.load_folder(folder_id).await?;
        self.authorize(user, Operation::ManageFiles, Some(&folder))?;

        let files = self.store.find_files(folder.id).await?;
        for file in &files {
            physical::remove_file(&self.stored_path(&file.storage_path)?)?;
            self.store.delete_file(file.id).await?;
        }

        info!(folder_id = %folder_id, user_id = %user.id, files = files.len(), "Folder files deleted");
        Ok(files.len())
    }

    /// Files anywhere in the tree whose name contains `needle`, limited to
    /// folders the user can view.
    pub async fn search_files(&self, needle: &str, user: &User) -> Result<Vec<FileEntry>> {
        let needle = validate_name(needle)?;
        let matches = self.store.search_files(needle).await?;

        let mut visible: HashMap<FolderId, bool> = HashMap::new();
        let mut found = Vec::new();
        for file in matches {
            let allowed = match visible.get(&file.folder_id) {
                Some(allowed) => *allowed,
                None => {
                    let allowed = match self.store.find_folder(file.folder_id).await? {
                        Some(folder) => {
                            permission::decide(user, Operation::View, Some(&folder)).is_allowed()
                        }
                        None => false,
                    };
                    visible.insert(file.folder_id, allowed);
                    allowed
                }
            };
            if allowed {
                found.push(file);
            }
        }
        Ok(found)
    }

    fn check_size(&self, content: &[u8]) -> Result<()> {
        if content.len() as u64 > self.max_file_size {
            let max_mb = self.max_file_size / 1024 / 1024;
            return Err(PortalError::Validation(format!(
                "file is too large (max {max_mb} MB)"
            )));
        }
        Ok(())
    }

    async fn relocate(&self, mut entry: FileEntry, new_path: &Path) -> Result<FileEntry> {
        let old_path = std::mem::replace(&mut entry.storage_path, new_path.to_path_buf());
        self.store.update_file(&entry).await.map_err(|e| {
            error!(
                file_id = %entry.id,
                from = %old_path.display(),
                to = %new_path.display(),
                error = %e,
                "File moved but record not updated"
            );
            e
        })?;

        info!(
            file_id = %entry.id,
            from = %old_path.display(),
            to = %new_path.display(),
            "File relocated"
        );
        Ok(entry)
    }
}
