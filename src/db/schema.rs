//! Database schema and migrations for docportal.
//!
//! Migrations are applied sequentially when the database is first opened
//! or upgraded. The schema_version table tracks which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: Users and their roles
    r#"
CREATE TABLE users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    display_name  TEXT NOT NULL,
    is_active     INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL
);

CREATE TABLE user_roles (
    user_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role     TEXT NOT NULL,                  -- 'admin', 'manager', 'basic'
    PRIMARY KEY (user_id, role)
);

CREATE INDEX idx_user_roles_role ON user_roles(role);
"#,
    // v2: Folder tree and membership lists
    r#"
CREATE TABLE folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    full_path   TEXT NOT NULL UNIQUE,        -- absolute, under the storage root
    parent_id   INTEGER REFERENCES folders(id),
    created_by  INTEGER NOT NULL REFERENCES users(id),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX idx_folders_parent_id ON folders(parent_id);

CREATE TABLE folder_members (
    folder_id  INTEGER NOT NULL REFERENCES folders(id) ON DELETE CASCADE,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (folder_id, user_id)
);

CREATE INDEX idx_folder_members_user_id ON folder_members(user_id);
"#,
    // v3: Files stored inside folders
    r#"
CREATE TABLE files (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    storage_path  TEXT NOT NULL UNIQUE,
    size          INTEGER NOT NULL,
    hash          TEXT,                      -- SHA-256, lowercase hex
    mime          TEXT,
    folder_id     INTEGER NOT NULL REFERENCES folders(id),
    created_by    INTEGER NOT NULL REFERENCES users(id),
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE INDEX idx_files_folder_id ON files(folder_id);
"#,
];
