//! Login tracking for the portal.
//!
//! Keeps two independent sets: users with an active session right now and
//! users who logged in at least once today. Nothing here persists.

use std::collections::HashSet;
use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::db::UserId;

static GLOBAL: OnceLock<SessionRegistry> = OnceLock::new();

/// Registry of active and today's logged-in users.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    active: RwLock<HashSet<UserId>>,
    today: RwLock<HashSet<UserId>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, created on first use.
    pub fn global() -> &'static SessionRegistry {
        GLOBAL.get_or_init(SessionRegistry::new)
    }

    /// Record a login. Adds the user to both sets.
    pub fn register_login(&self, user: UserId) {
        write(&self.active).insert(user);
        write(&self.today).insert(user);
        debug!("Registered login for user {}", user);
    }

    /// Drop the user's active session. Today's set is left alone.
    pub fn remove_active_session(&self, user: UserId) {
        if write(&self.active).remove(&user) {
            debug!("Removed active session for user {}", user);
        }
    }

    /// Check whether the user currently has an active session.
    pub fn is_active(&self, user: UserId) -> bool {
        read(&self.active).contains(&user)
    }

    /// Number of users with an active session.
    pub fn active_count(&self) -> usize {
        read(&self.active).len()
    }

    /// Number of distinct users that logged in today.
    pub fn today_count(&self) -> usize {
        read(&self.today).len()
    }

    /// Forget today's logins, typically at midnight.
    pub fn reset_daily(&self) {
        let mut today = write(&self.today);
        let cleared = today.len();
        today.clear();
        info!("Daily login set reset ({} users cleared)", cleared);
    }
}

// A poisoned set is still a valid set; recover it instead of failing.
fn read(lock: &RwLock<HashSet<UserId>>) -> RwLockReadGuard<'_, HashSet<UserId>> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write(lock: &RwLock<HashSet<UserId>>) -> RwLockWriteGuard<'_, HashSet<UserId>> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
