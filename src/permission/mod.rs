//! Authorization rules for the document tree.
//!
//! All checks go through [`decide`]; the helpers below are thin views
//! over it. Membership changes and downward propagation also live here.

use std::collections::BTreeSet;

use tracing::debug;

use crate::db::{User, UserId};
use crate::tree::{Folder, FolderId, TreeStore};
use crate::{PortalError, Result};

/// An action a user may attempt on a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// See the folder and its contents.
    View,
    /// Create a subfolder (or, with no target, a root folder).
    CreateIn,
    /// Rename the folder.
    Rename,
    /// Move the folder somewhere else.
    Move,
    /// Copy the folder subtree.
    Copy,
    /// Delete the folder.
    Delete,
    /// Upload, rename, move or delete files in the folder.
    ManageFiles,
    /// Change the folder's member list.
    UpdatePermissions,
}

impl Operation {
    /// Structural operations that managers may not apply to root folders.
    fn is_structural(self) -> bool {
        matches!(
            self,
            Operation::Rename | Operation::Move | Operation::Copy | Operation::Delete
        )
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The operation may proceed.
    Allow,
    /// The operation is refused, with the reason.
    Deny(&'static str),
}

impl Decision {
    /// Check whether the decision allows the operation.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Convert a denial into [`PortalError::Permission`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(PortalError::Permission(reason.to_string())),
        }
    }
}

/// Check if a user is an administrator.
pub fn is_admin(user: &User) -> bool {
    user.is_admin()
}

/// Decide whether `user` may perform `operation` on `target`.
///
/// `target` is `None` only for operations at the top level, where
/// creating a root folder is the single meaningful case.
pub fn decide(user: &User, operation: Operation, target: Option<&Folder>) -> Decision {
    if !user.is_active {
        return Decision::Deny("account is inactive");
    }
    if is_admin(user) {
        return Decision::Allow;
    }

    let Some(folder) = target else {
        return match operation {
            Operation::CreateIn => Decision::Deny("only administrators can create root folders"),
            _ => Decision::Deny("operation requires a folder"),
        };
    };

    if operation == Operation::UpdatePermissions {
        return if folder.created_by == user.id || user.is_manager() {
            Decision::Allow
        } else {
            Decision::Deny("only the creator or a manager can change folder members")
        };
    }

    if !folder.is_member(user.id) {
        return Decision::Deny("not a member of this folder");
    }

    if operation.is_structural() && folder.is_root() && user.is_manager() {
        return Decision::Deny("managers cannot change root folders");
    }

    Decision::Allow
}

/// Check whether `user` may create a folder under `parent` (or at the top level).
pub fn can_create_in(user: &User, parent: Option<&Folder>) -> bool {
    decide(user, Operation::CreateIn, parent).is_allowed()
}

/// Check whether `user` may rename, move, copy or delete `folder`.
pub fn can_mutate(user: &User, folder: &Folder) -> bool {
    [Operation::Rename, Operation::Move, Operation::Copy, Operation::Delete]
        .into_iter()
        .all(|op| decide(user, op, Some(folder)).is_allowed())
}

/// Add users to a folder's permitted set.
pub fn add_members(folder: &mut Folder, ids: &[UserId]) {
    folder.permitted_users.extend(ids.iter().copied());
}

/// Remove users from a folder's permitted set.
///
/// Fails without changing anything if any target is an administrator or
/// the folder's creator.
pub fn remove_members(folder: &mut Folder, ids: &[UserId], admins: &BTreeSet<UserId>) -> Result<()> {
    for id in ids {
        if admins.contains(id) {
            return Err(PortalError::Permission(format!(
                "user {id} is an administrator and cannot be removed"
            )));
        }
        if *id == folder.created_by {
            return Err(PortalError::Permission(format!(
                "user {id} created this folder and cannot be removed"
            )));
        }
    }

    for id in ids {
        folder.permitted_users.remove(id);
    }
    Ok(())
}

/// Overwrite the permitted set of every descendant of `folder`.
///
/// Returns the number of folders updated.
pub async fn propagate_down(
    store: &dyn TreeStore,
    folder: FolderId,
    members: &BTreeSet<UserId>,
) -> Result<usize> {
    let mut pending = vec![folder];
    let mut updated = 0;

    while let Some(parent) = pending.pop() {
        for mut child in store.find_children(parent).await? {
            pending.push(child.id);
            child.permitted_users = members.clone();
            store.update_folder(&child).await?;
            updated += 1;
        }
    }

    debug!("Propagated members of folder {} to {} descendants", folder, updated);
    Ok(updated)
}
