//! User repository for docportal.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::repository_traits::UserDirectory;
use super::user::{NewUser, Role, User, UserId};
use crate::{PortalError, Result};

/// Repository for user operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new UserRepository over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user together with its roles.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, display_name, created_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&new_user.username)
        .bind(&new_user.display_name)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for role in &new_user.roles {
            sqlx::query("INSERT INTO user_roles (user_id, role) VALUES (?, ?)")
                .bind(id)
                .bind(role.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.get_by_id(UserId(id))
            .await?
            .ok_or_else(|| PortalError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, display_name, is_active, created_at FROM users WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, display_name, is_active, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// List users holding a role.
    pub async fn list_by_role(&self, role: Role) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT u.id, u.username, u.display_name, u.is_active, u.created_at
             FROM users u JOIN user_roles r ON r.user_id = u.id
             WHERE r.role = ? ORDER BY u.id",
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(self.hydrate(row).await?);
        }
        Ok(users)
    }

    /// Activate or deactivate an account.
    pub async fn set_active(&self, id: UserId, is_active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn load_roles(&self, id: i64) -> Result<BTreeSet<Role>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = ?")
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        Ok(names.iter().filter_map(|name| name.parse().ok()).collect())
    }

    async fn hydrate(&self, row: UserRow) -> Result<User> {
        let roles = self.load_roles(row.id).await?;
        Ok(User {
            id: UserId(row.id),
            username: row.username,
            display_name: row.display_name,
            roles,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        self.get_by_id(id).await
    }

    async fn find_users(&self, ids: &[UserId]) -> Result<Vec<User>> {
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = self.get_by_id(*id).await? {
                users.push(user);
            }
        }
        Ok(users)
    }

    async fn list_admins(&self) -> Result<Vec<User>> {
        self.list_by_role(Role::Admin).await
    }
}

/// Internal struct for mapping database rows to User.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    display_name: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}
