//! Access policy.
//!
//! Two checks cover every task endpoint:
//!
//! - [`require_role`] gates operations reserved for a role (listing all
//!   tasks, creating, assigning, admin delete). It runs before the handler.
//! - [`can_access`] gates operations on one specific task (read, update,
//!   status change, delete). Any new per-task operation must call it before
//!   acting.

use serde::{Deserialize, Serialize};

use crate::types::{Role, Task, UserId};

/// The authenticated identity an operation is performed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: UserId,
    pub role: Role,
}

impl Caller {
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

/// The caller lacks the rights for the requested operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("this operation requires the {required} role")]
    MissingRole { required: Role },
    #[error("you are not authorized to access this task")]
    NotAssigned,
}

/// Whether `caller` may read or change `task`.
///
/// True iff the caller is an admin or is one of the task's assignees.
#[must_use]
pub fn can_access(caller: &Caller, task: &Task) -> bool {
    caller.is_admin() || task.is_assigned_to(caller.id)
}

/// Like [`can_access`], as a `Result`.
///
/// # Errors
///
/// Returns [`PolicyError::NotAssigned`] when access is denied.
pub fn check_access(caller: &Caller, task: &Task) -> Result<(), PolicyError> {
    if can_access(caller, task) {
        Ok(())
    } else {
        Err(PolicyError::NotAssigned)
    }
}

/// Capability check: does `caller` hold at least the `required` role?
///
/// Admin satisfies every requirement; User satisfies only User.
///
/// # Errors
///
/// Returns [`PolicyError::MissingRole`] when the caller's role is too low.
pub const fn require_role(caller: &Caller, required: Role) -> Result<(), PolicyError> {
    match (caller.role, required) {
        (Role::Admin, _) | (Role::User, Role::User) => Ok(()),
        (Role::User, Role::Admin) => Err(PolicyError::MissingRole { required }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::types::{TaskId, TaskPriority, TaskStatus};

    fn task_assigned_to(ids: &[i32]) -> Task {
        Task {
            id: TaskId::new(10),
            title: "t".to_owned(),
            description: None,
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            due_date: None,
            assigned_to: ids.iter().copied().map(UserId::new).collect(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_admin_accesses_any_task() {
        let admin = Caller::new(UserId::new(1), Role::Admin);
        assert!(can_access(&admin, &task_assigned_to(&[])));
        assert!(can_access(&admin, &task_assigned_to(&[5, 6])));
    }

    #[test]
    fn test_user_accesses_only_assigned_tasks() {
        let user = Caller::new(UserId::new(5), Role::User);
        assert!(can_access(&user, &task_assigned_to(&[5])));
        assert!(can_access(&user, &task_assigned_to(&[4, 5, 6])));
        assert!(!can_access(&user, &task_assigned_to(&[4, 6])));
        assert!(!can_access(&user, &task_assigned_to(&[])));
        assert_eq!(
            check_access(&user, &task_assigned_to(&[4])),
            Err(PolicyError::NotAssigned)
        );
    }

    #[test]
    fn test_require_role() {
        let admin = Caller::new(UserId::new(1), Role::Admin);
        let user = Caller::new(UserId::new(2), Role::User);

        assert!(require_role(&admin, Role::Admin).is_ok());
        assert!(require_role(&admin, Role::User).is_ok());
        assert!(require_role(&user, Role::User).is_ok());
        assert_eq!(
            require_role(&user, Role::Admin),
            Err(PolicyError::MissingRole {
                required: Role::Admin
            })
        );
    }
}
