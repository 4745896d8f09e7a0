//! Status enums for users and tasks.

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value: {value}")]
pub struct UnknownVariant {
    /// Which enum was being parsed (`status`, `priority`, `role`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Generates `as_str`, `Display`, `FromStr` and `ALL` for a kebab-case enum.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire name of this variant.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

/// User role.
///
/// Admins see and change every task; regular users only the tasks they are
/// assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

string_enum!(Role, "role", {
    Admin => "admin",
    User => "user",
});

/// Task lifecycle status.
///
/// The nominal flow is `not-started` → `pending`/`in-progress` →
/// `completed`/`on-hold`/`cancelled`, with `on-hold` able to resume to
/// `in-progress`. Transitions are not enforced: any caller with access may
/// set any status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "task_status", rename_all = "kebab-case")
)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    Pending,
    InProgress,
    Completed,
    OnHold,
    Cancelled,
}

string_enum!(TaskStatus, "status", {
    NotStarted => "not-started",
    Pending => "pending",
    InProgress => "in-progress",
    Completed => "completed",
    OnHold => "on-hold",
    Cancelled => "cancelled",
});

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "task_priority", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

string_enum!(TaskPriority, "priority", {
    Low => "low",
    Medium => "medium",
    High => "high",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names_match_serde() {
        for status in TaskStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn test_status_rejects_legacy_open() {
        let err = "open".parse::<TaskStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid status value: open");
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("high".parse::<TaskPriority>().unwrap(), TaskPriority::High);
        assert!("urgent".parse::<TaskPriority>().is_err());
        assert!("High".parse::<TaskPriority>().is_err());
    }

    #[test]
    fn test_role_defaults_to_user() {
        assert_eq!(Role::default(), Role::User);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(TaskStatus::default(), TaskStatus::NotStarted);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    }
}
