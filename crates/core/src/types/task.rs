//! The task record.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{TaskId, TaskPriority, TaskStatus, UserId};

/// Maximum title length accepted by [`TaskFields::validate`].
pub const MAX_TITLE_LENGTH: usize = 200;

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Server-assigned ID.
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Calendar day the task is due, if any.
    pub due_date: Option<NaiveDate>,
    /// Users the task is assigned to. Ordered and free of duplicates.
    pub assigned_to: BTreeSet<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether `user` is one of the task's assignees.
    #[must_use]
    pub fn is_assigned_to(&self, user: UserId) -> bool {
        self.assigned_to.contains(&user)
    }
}

/// The caller-editable fields of a task.
///
/// Used both when creating a task and when replacing one wholesale. The
/// assignee set is deliberately absent: it only changes through assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFields {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl TaskFields {
    /// Create fields with a title and defaults for everything else.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            due_date: None,
        }
    }

    /// Trim text fields and check the title.
    ///
    /// Blank descriptions collapse to `None`.
    ///
    /// # Errors
    ///
    /// Returns a message when the title is blank or longer than
    /// [`MAX_TITLE_LENGTH`] characters.
    pub fn validate(mut self) -> Result<Self, String> {
        self.title = self.title.trim().to_owned();
        if self.title.is_empty() {
            return Err("title cannot be empty".to_owned());
        }
        if self.title.chars().count() > MAX_TITLE_LENGTH {
            return Err(format!(
                "title must be at most {MAX_TITLE_LENGTH} characters"
            ));
        }
        self.description = self
            .description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());
        Ok(self)
    }
}
