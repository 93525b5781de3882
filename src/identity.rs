//! Acting-user resolution.
//!
//! Credentials are checked upstream; by the time a request reaches the
//! core it carries at most an authenticated user id.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info_span, Span};
use uuid::Uuid;

use crate::db::{User, UserDirectory, UserId};
use crate::{PortalError, Result};

/// Per-request data handed in by the outer layer.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Authenticated user, if any.
    pub user_id: Option<UserId>,
    /// Correlation id for logs.
    pub request_id: Uuid,
}

impl RequestContext {
    /// Context for an authenticated user with a fresh request id.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            request_id: Uuid::new_v4(),
        }
    }

    /// Context with no authenticated user.
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            request_id: Uuid::new_v4(),
        }
    }

    /// Span carrying the request id, for `tracing::Instrument`.
    pub fn span(&self) -> Span {
        info_span!("request", request_id = %self.request_id)
    }
}

/// Resolves the user a request acts as.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Look up the acting user for the request.
    async fn resolve_acting_user(&self, ctx: &RequestContext) -> Result<User>;
}

/// Resolver that looks the context's user id up in a [`UserDirectory`].
pub struct DirectoryIdentityResolver {
    users: Arc<dyn UserDirectory>,
}

impl DirectoryIdentityResolver {
    /// Create a resolver over the given directory.
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl IdentityResolver for DirectoryIdentityResolver {
    async fn resolve_acting_user(&self, ctx: &RequestContext) -> Result<User> {
        let id = ctx
            .user_id
            .ok_or_else(|| PortalError::Permission("authentication required".to_string()))?;

        let user = self
            .users
            .find_user(id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("user {id}")))?;

        if !user.is_active {
            debug!(request_id = %ctx.request_id, user_id = %id, "Inactive user rejected");
            return Err(PortalError::Permission("account is inactive".to_string()));
        }
        Ok(user)
    }
}
