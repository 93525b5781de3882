//! Repository trait definitions for docportal.
//!
//! The hierarchy engine consumes users only through [`UserDirectory`], so
//! any identity backend can stand behind it.

use async_trait::async_trait;

use crate::db::{User, UserId};
use crate::Result;

/// Read-only user lookups needed by the authorization rules.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Get a user by ID.
    async fn find_user(&self, id: UserId) -> Result<Option<User>>;

    /// Get every user whose ID is in `ids`; unknown IDs are skipped.
    async fn find_users(&self, ids: &[UserId]) -> Result<Vec<User>>;

    /// List every user holding the admin role.
    async fn list_admins(&self) -> Result<Vec<User>>;
}
