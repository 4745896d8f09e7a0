//! Task query construction.
//!
//! [`TaskFilter::build`] turns the raw `status`, `priority` and `dueDate`
//! query parameters into a validated filter scoped to the caller. The
//! assignee restriction lives in a private field that only the constructors
//! set, so a filter for a non-admin can never be widened afterwards.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::policy::Caller;
use crate::types::{Task, TaskPriority, TaskStatus, UserId};

/// Invalid filter input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid status value: {0}")]
    InvalidStatus(String),
    #[error("Invalid priority value: {0}")]
    InvalidPriority(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),
}

/// Due-date constraint of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DueDate {
    /// Due exactly on this day.
    On(NaiveDate),
    /// Due within `[start, end]`, both ends inclusive.
    Between(NaiveDate, NaiveDate),
}

impl DueDate {
    /// Parse `"YYYY-MM-DD"` or `"YYYY-MM-DD,YYYY-MM-DD"`.
    ///
    /// Each date may also be an RFC 3339 timestamp, in which case its UTC
    /// calendar day is used.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidDate`] for an unparsable single date and
    /// [`QueryError::InvalidDateRange`] for a bad range: more than two parts,
    /// an unparsable end, or a start after the end.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [single] => parse_day(single)
                .map(Self::On)
                .ok_or_else(|| QueryError::InvalidDate(raw.to_owned())),
            [start, end] => {
                let range_err = || QueryError::InvalidDateRange(raw.to_owned());
                let start = parse_day(start).ok_or_else(range_err)?;
                let end = parse_day(end).ok_or_else(range_err)?;
                if start > end {
                    return Err(range_err());
                }
                Ok(Self::Between(start, end))
            }
            _ => Err(QueryError::InvalidDateRange(raw.to_owned())),
        }
    }

    /// Inclusive bounds of the constraint.
    #[must_use]
    pub const fn bounds(&self) -> (NaiveDate, NaiveDate) {
        match *self {
            Self::On(day) => (day, day),
            Self::Between(start, end) => (start, end),
        }
    }

    #[must_use]
    pub fn contains(&self, day: NaiveDate) -> bool {
        let (start, end) = self.bounds();
        start <= day && day <= end
    }
}

fn parse_day(s: &str) -> Option<NaiveDate> {
    s.parse::<NaiveDate>().ok().or_else(|| {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

/// A validated, caller-scoped task filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    assignee: Option<UserId>,
    status: Option<TaskStatus>,
    priority: Option<TaskPriority>,
    due: Option<DueDate>,
}

impl TaskFilter {
    /// A filter with no criteria beyond the caller's scope.
    ///
    /// Admins get every task; anyone else only tasks assigned to them.
    #[must_use]
    pub const fn for_caller(caller: &Caller) -> Self {
        Self {
            assignee: if caller.is_admin() {
                None
            } else {
                Some(caller.id)
            },
            status: None,
            priority: None,
            due: None,
        }
    }

    /// Build a filter from raw query parameters.
    ///
    /// Absent and empty parameters impose no constraint.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] naming the first invalid parameter.
    pub fn build(
        status: Option<&str>,
        priority: Option<&str>,
        due_date: Option<&str>,
        caller: &Caller,
    ) -> Result<Self, QueryError> {
        let mut filter = Self::for_caller(caller);

        if let Some(raw) = non_empty(status) {
            filter.status = Some(
                raw.parse()
                    .map_err(|_| QueryError::InvalidStatus(raw.to_owned()))?,
            );
        }

        if let Some(raw) = non_empty(priority) {
            filter.priority = Some(
                raw.parse()
                    .map_err(|_| QueryError::InvalidPriority(raw.to_owned()))?,
            );
        }

        if let Some(raw) = non_empty(due_date) {
            filter.due = Some(DueDate::parse(raw)?);
        }

        Ok(filter)
    }

    /// The user the results are restricted to, if any.
    #[must_use]
    pub const fn assignee(&self) -> Option<UserId> {
        self.assignee
    }

    #[must_use]
    pub const fn status(&self) -> Option<TaskStatus> {
        self.status
    }

    #[must_use]
    pub const fn priority(&self) -> Option<TaskPriority> {
        self.priority
    }

    #[must_use]
    pub const fn due(&self) -> Option<DueDate> {
        self.due
    }

    /// Evaluate the filter against a task.
    ///
    /// A due-date constraint never matches a task without a due date.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.assignee.is_none_or(|id| task.is_assigned_to(id))
            && self.status.is_none_or(|s| task.status == s)
            && self.priority.is_none_or(|p| task.priority == p)
            && self
                .due
                .is_none_or(|due| task.due_date.is_some_and(|day| due.contains(day)))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Role, TaskId};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn admin() -> Caller {
        Caller::new(UserId::new(1), Role::Admin)
    }

    fn user(id: i32) -> Caller {
        Caller::new(UserId::new(id), Role::User)
    }

    fn task(assignees: &[i32], status: TaskStatus, due: Option<NaiveDate>) -> Task {
        Task {
            id: TaskId::new(1),
            title: "t".to_owned(),
            description: None,
            status,
            priority: TaskPriority::Medium,
            due_date: due,
            assigned_to: assignees.iter().copied().map(UserId::new).collect(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_non_admin_filter_is_always_scoped() {
        let combos = [
            (None, None, None),
            (Some("completed"), None, None),
            (None, Some("low"), Some("2024-01-01")),
            (Some(""), Some(""), Some("")),
        ];
        for (status, priority, due) in combos {
            let filter = TaskFilter::build(status, priority, due, &user(7)).unwrap();
            assert_eq!(filter.assignee(), Some(UserId::new(7)));
        }
    }

    #[test]
    fn test_admin_filter_is_unscoped() {
        let filter = TaskFilter::build(None, None, None, &admin()).unwrap();
        assert_eq!(filter.assignee(), None);
        assert!(filter.matches(&task(&[], TaskStatus::Pending, None)));
    }

    #[test]
    fn test_status_accepts_full_task_status_set() {
        for status in TaskStatus::ALL {
            let filter = TaskFilter::build(Some(status.as_str()), None, None, &admin()).unwrap();
            assert_eq!(filter.status(), Some(*status));
        }
    }

    #[test]
    fn test_invalid_status_and_priority() {
        assert_eq!(
            TaskFilter::build(Some("bogus"), None, None, &admin()),
            Err(QueryError::InvalidStatus("bogus".to_owned()))
        );
        assert_eq!(
            TaskFilter::build(Some("open"), None, None, &admin()),
            Err(QueryError::InvalidStatus("open".to_owned()))
        );
        assert_eq!(
            TaskFilter::build(None, Some("urgent"), None, &admin()),
            Err(QueryError::InvalidPriority("urgent".to_owned()))
        );
    }

    #[test]
    fn test_due_date_single_and_range() {
        assert_eq!(
            DueDate::parse("2024-01-01").unwrap(),
            DueDate::On(day(2024, 1, 1))
        );
        assert_eq!(
            DueDate::parse("2024-01-01, 2024-01-31").unwrap(),
            DueDate::Between(day(2024, 1, 1), day(2024, 1, 31))
        );
        assert_eq!(
            DueDate::parse("2024-01-05T23:30:00-02:00").unwrap(),
            DueDate::On(day(2024, 1, 6))
        );
    }

    #[test]
    fn test_due_date_rejects_garbage() {
        assert!(matches!(
            DueDate::parse("tomorrow"),
            Err(QueryError::InvalidDate(_))
        ));
        assert!(matches!(
            DueDate::parse("2024-01-01,nope"),
            Err(QueryError::InvalidDateRange(_))
        ));
        assert!(matches!(
            DueDate::parse("2024-02-01,2024-01-01"),
            Err(QueryError::InvalidDateRange(_))
        ));
        assert!(matches!(
            DueDate::parse("2024-01-01,2024-01-02,2024-01-03"),
            Err(QueryError::InvalidDateRange(_))
        ));
    }

    #[test]
    fn test_range_is_inclusive() {
        let filter =
            TaskFilter::build(None, None, Some("2024-01-01,2024-01-31"), &admin()).unwrap();
        let on = |d| task(&[], TaskStatus::Pending, Some(d));
        assert!(filter.matches(&on(day(2024, 1, 1))));
        assert!(filter.matches(&on(day(2024, 1, 31))));
        assert!(!filter.matches(&on(day(2023, 12, 31))));
        assert!(!filter.matches(&on(day(2024, 2, 1))));
        assert!(!filter.matches(&task(&[], TaskStatus::Pending, None)));
    }

    #[test]
    fn test_matches_combines_criteria() {
        let filter = TaskFilter::build(Some("completed"), None, None, &user(3)).unwrap();
        assert!(filter.matches(&task(&[3], TaskStatus::Completed, None)));
        assert!(!filter.matches(&task(&[3], TaskStatus::Pending, None)));
        assert!(!filter.matches(&task(&[4], TaskStatus::Completed, None)));
    }
}
