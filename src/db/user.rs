//! User model for docportal.
//!
//! This module defines the User struct and Role enum used for authorization.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Typed user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User role for permission management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular user; acts only inside folders they are a member of.
    #[default]
    Basic,
    /// Manager; may act inside subtrees but never structurally on root folders.
    Manager,
    /// Administrator; implicit access to every folder.
    Admin,
}

impl Role {
    /// Convert role to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Basic => "basic",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(Role::Basic),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// User entity.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login username (unique).
    pub username: String,
    /// Display name.
    pub display_name: String,
    /// Roles held by the user.
    pub roles: BTreeSet<Role>,
    /// Whether the account is active.
    pub is_active: bool,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Check if this user holds the given role.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Check if this user is an administrator.
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Check if this user is a manager.
    pub fn is_manager(&self) -> bool {
        self.has_role(Role::Manager)
    }
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login username.
    pub username: String,
    /// Display name.
    pub display_name: String,
    /// Roles (defaults to Basic).
    pub roles: BTreeSet<Role>,
}

impl NewUser {
    /// Create a new user with the Basic role.
    pub fn new(username: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: display_name.into(),
            roles: BTreeSet::from([Role::Basic]),
        }
    }

    /// Replace the role set with a single role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles = BTreeSet::from([role]);
        self
    }

    /// Add a role to the role set.
    pub fn add_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(roles: &[Role]) -> User {
        User {
            id: UserId(1),
            username: "alice".to_string(),
            display_name: "Alice".to_string(),
            roles: roles.iter().copied().collect(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_round_trip_strings() {
        for role in [Role::Basic, Role::Manager, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("sysop".parse::<Role>().is_err());
    }

    #[test]
    fn test_user_role_checks() {
        let admin = user_with(&[Role::Admin]);
        assert!(admin.is_admin());
        assert!(!admin.is_manager());

        let both = user_with(&[Role::Manager, Role::Basic]);
        assert!(both.is_manager());
        assert!(both.has_role(Role::Basic));
        assert!(!both.is_admin());
    }

    #[test]
    fn test_new_user_builder() {
        let user = NewUser::new("bob", "Bob").with_role(Role::Manager).add_role(Role::Basic);
        assert_eq!(user.username, "bob");
        assert_eq!(user.roles.len(), 2);
        assert!(user.roles.contains(&Role::Manager));

        let default = NewUser::new("carol", "Carol");
        assert_eq!(default.roles, BTreeSet::from([Role::Basic]));
    }
}
