//! SQLite implementation of [`TreeStore`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::model::{FileEntry, FileId, Folder, FolderId, NewFile, NewFolder};
use super::store::TreeStore;
use crate::db::UserId;
use crate::{PortalError, Result};

const FOLDER_COLUMNS: &str = "id, name, full_path, parent_id, created_by, created_at, updated_at";
const FILE_COLUMNS: &str =
    "id, name, storage_path, size, hash, mime, folder_id, created_by, created_at, updated_at";

/// Tree store backed by the portal database.
#[derive(Clone)]
pub struct SqliteTreeStore {
    pool: SqlitePool,
}

impl SqliteTreeStore {
    /// Create a new store over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load_members(&self, folder_id: i64) -> Result<BTreeSet<UserId>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT user_id FROM folder_members WHERE folder_id = ?")
                .bind(folder_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().map(UserId).collect())
    }

    async fn hydrate(&self, row: FolderRow) -> Result<Folder> {
        let permitted_users = self.load_members(row.id).await?;
        Ok(row.into_folder(permitted_users))
    }

    async fn hydrate_all(&self, rows: Vec<FolderRow>) -> Result<Vec<Folder>> {
        let mut folders = Vec::with_capacity(rows.len());
        for row in rows {
            folders.push(self.hydrate(row).await?);
        }
        Ok(folders)
    }
}

async fn replace_members(
    tx: &mut Transaction<'_, Sqlite>,
    folder_id: i64,
    members: &BTreeSet<UserId>,
) -> Result<()> {
    sqlx::query("DELETE FROM folder_members WHERE folder_id = ?")
        .bind(folder_id)
        .execute(&mut **tx)
        .await?;

    for member in members {
        sqlx::query("INSERT INTO folder_members (folder_id, user_id) VALUES (?, ?)")
            .bind(folder_id)
            .bind(member.0)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[async_trait]
impl TreeStore for SqliteTreeStore {
    async fn find_folder(&self, id: FolderId) -> Result<Option<Folder>> {
        let query = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?");
        let row: Option<FolderRow> = sqlx::query_as(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_file(&self, id: FileId) -> Result<Option<FileEntry>> {
        let query = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?");
        let row: Option<FileRow> = sqlx::query_as(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(FileRow::into_entry))
    }

    async fn find_children(&self, parent: FolderId) -> Result<Vec<Folder>> {
        let query =
            format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE parent_id = ? ORDER BY name, id");
        let rows: Vec<FolderRow> = sqlx::query_as(&query)
            .bind(parent.0)
            .fetch_all(&self.pool)
            .await?;
        self.hydrate_all(rows).await
    }

    async fn find_files(&self, folder: FolderId) -> Result<Vec<FileEntry>> {
        let query =
            format!("SELECT {FILE_COLUMNS} FROM files WHERE folder_id = ? ORDER BY name, id");
        let rows: Vec<FileRow> = sqlx::query_as(&query)
            .bind(folder.0)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(FileRow::into_entry).collect())
    }

    async fn search_files(&self, needle: &str) -> Result<Vec<FileEntry>> {
        let pattern = format!("%{}%", escape_like(needle));
        let query = format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE name LIKE ? ESCAPE '\\' ORDER BY name, id"
        );
        let rows: Vec<FileRow> = sqlx::query_as(&query)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(FileRow::into_entry).collect())
    }

    async fn find_root_folders(&self, member: Option<UserId>) -> Result<Vec<Folder>> {
        let rows: Vec<FolderRow> = match member {
            Some(user) => {
                let query = format!(
                    "SELECT {FOLDER_COLUMNS} FROM folders
                     WHERE parent_id IS NULL
                       AND id IN (SELECT folder_id FROM folder_members WHERE user_id = ?)
                     ORDER BY name, id"
                );
                sqlx::query_as(&query)
                    .bind(user.0)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query = format!(
                    "SELECT {FOLDER_COLUMNS} FROM folders WHERE parent_id IS NULL ORDER BY name, id"
                );
                sqlx::query_as(&query).fetch_all(&self.pool).await?
            }
        };
        self.hydrate_all(rows).await
    }

    async fn create_folder(&self, folder: &NewFolder) -> Result<Folder> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO folders (name, full_path, parent_id, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&folder.name)
        .bind(path_text(&folder.full_path))
        .bind(folder.parent_id.map(|p| p.0))
        .bind(folder.created_by.0)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        replace_members(&mut tx, id, &folder.permitted_users).await?;
        tx.commit().await?;

        self.find_folder(FolderId(id))
            .await?
            .ok_or_else(|| PortalError::NotFound("folder".to_string()))
    }

    async fn update_folder(&self, folder: &Folder) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE folders SET name = ?, full_path = ?, parent_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&folder.name)
        .bind(path_text(&folder.full_path))
        .bind(folder.parent_id.map(|p| p.0))
        .bind(Utc::now())
        .bind(folder.id.0)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PortalError::NotFound(format!("folder {}", folder.id)));
        }

        replace_members(&mut tx, folder.id.0, &folder.permitted_users).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_folder(&self, id: FolderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_file(&self, file: &NewFile) -> Result<FileEntry> {
        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO files
                 (name, storage_path, size, hash, mime, folder_id, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&file.name)
        .bind(path_text(&file.storage_path))
        .bind(file.size as i64)
        .bind(&file.hash)
        .bind(&file.mime)
        .bind(file.folder_id.0)
        .bind(file.created_by.0)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        self.find_file(FileId(id))
            .await?
            .ok_or_else(|| PortalError::NotFound("file".to_string()))
    }

    async fn update_file(&self, file: &FileEntry) -> Result<()> {
        let result = sqlx::query(
            "UPDATE files SET name = ?, storage_path = ?, size = ?, hash = ?, mime = ?,
                 folder_id = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&file.name)
        .bind(path_text(&file.storage_path))
        .bind(file.size as i64)
        .bind(&file.hash)
        .bind(&file.mime)
        .bind(file.folder_id.0)
        .bind(Utc::now())
        .bind(file.id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PortalError::NotFound(format!("file {}", file.id)));
        }
        Ok(())
    }

    async fn delete_file(&self, id: FileId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn exists_by_path(&self, path: &Path) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM folders WHERE full_path = ?1)
                 OR EXISTS(SELECT 1 FROM files WHERE storage_path = ?1)",
        )
        .bind(path_text(path))
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Internal struct for mapping database rows to Folder.
#[derive(sqlx::FromRow)]
struct FolderRow {
    id: i64,
    name: String,
    full_path: String,
    parent_id: Option<i64>,
    created_by: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FolderRow {
    fn into_folder(self, permitted_users: BTreeSet<UserId>) -> Folder {
        Folder {
            id: FolderId(self.id),
            name: self.name,
            full_path: PathBuf::from(self.full_path),
            parent_id: self.parent_id.map(FolderId),
            created_by: UserId(self.created_by),
            created_at: self.created_at,
            updated_at: self.updated_at,
            permitted_users,
        }
    }
}

/// Internal struct for mapping database rows to FileEntry.
#[derive(sqlx::FromRow)]
struct FileRow {
    id: i64,
    name: String,
    storage_path: String,
    size: i64,
    hash: Option<String>,
    mime: Option<String>,
    folder_id: i64,
    created_by: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FileRow {
    fn into_entry(self) -> FileEntry {
        FileEntry {
            id: FileId(self.id),
            name: self.name,
            storage_path: PathBuf::from(self.storage_path),
            size: self.size.max(0) as u64,
            hash: self.hash,
            mime: self.mime,
            folder_id: FolderId(self.folder_id),
            created_by: UserId(self.created_by),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
