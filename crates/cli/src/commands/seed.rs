//! Seed the database with tasks from a YAML file.
//!
//! # File Format
//!
//! ```yaml
//! tasks:
//!   - title: Write quarterly report
//!     description: Numbers from finance first
//!     status: in-progress
//!     priority: high
//!     dueDate: 2024-01-15
//!     assignees: [alice@example.com, bob@example.com]
//!   - title: Order coffee
//! ```
//!
//! Assignees are given by email and must already exist. The whole file is
//! validated before anything is written.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use taskmaster_api::db::{PgTaskStore, PgUserStore, TaskStore, UserStore};
use taskmaster_core::{Email, TaskFields, UserId};

use super::{CliError, connect};

/// Top level of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub tasks: Vec<SeedTask>,
}

/// One task in a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedTask {
    #[serde(flatten)]
    pub fields: TaskFields,
    #[serde(default)]
    pub assignees: Vec<String>,
}

/// A seed task that passed validation.
#[derive(Debug)]
struct ValidTask {
    fields: TaskFields,
    assignees: Vec<Email>,
}

/// Parse and validate a seed file without touching the database.
fn parse(content: &str) -> Result<Vec<ValidTask>, CliError> {
    let file: SeedFile = serde_yaml::from_str(content)?;

    file.tasks
        .into_iter()
        .enumerate()
        .map(|(index, task)| {
            let invalid = |reason: String| CliError::InvalidSeed { index, reason };
            let fields = task.fields.validate().map_err(invalid)?;
            let assignees = task
                .assignees
                .iter()
                .map(|raw| Email::parse(raw).map_err(|e| invalid(format!("{raw}: {e}"))))
                .collect::<Result<_, _>>()?;
            Ok(ValidTask { fields, assignees })
        })
        .collect()
}

/// Insert every task in `file_path`.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, an assignee does
/// not exist, or a database operation fails.
pub async fn tasks(file_path: &str) -> Result<(), CliError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading tasks from file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: file_path.to_owned(),
            source,
        })?;
    let seeds = parse(&content)?;
    info!(tasks = seeds.len(), "Seed file validated");

    let pool = connect().await?;
    let users = PgUserStore::new(pool.clone());
    let store = PgTaskStore::new(pool);

    let inserted = insert_all(&users, &store, seeds).await?;
    info!("Seeding complete! {inserted} tasks inserted");
    Ok(())
}

/// Resolve every assignee email to a user id.
///
/// Runs to completion before any insert so an unknown assignee leaves the
/// database untouched.
async fn resolve(
    users: &dyn UserStore,
    seeds: Vec<ValidTask>,
) -> Result<Vec<(TaskFields, BTreeSet<UserId>)>, CliError> {
    let mut resolved = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let mut assigned_to = BTreeSet::new();
        for email in &seed.assignees {
            let user = users
                .get_by_email(email)
                .await?
                .ok_or_else(|| CliError::UnknownUser(email.to_string()))?;
            assigned_to.insert(user.id);
        }
        resolved.push((seed.fields, assigned_to));
    }
    Ok(resolved)
}

async fn insert_all(
    users: &dyn UserStore,
    store: &dyn TaskStore,
    seeds: Vec<ValidTask>,
) -> Result<usize, CliError> {
    let resolved = resolve(users, seeds).await?;

    let mut inserted = 0usize;
    for (fields, assigned_to) in resolved {
        let task = store.insert(fields, assigned_to).await?;
        info!(task_id = %task.id, title = %task.title, "Inserted task");
        inserted += 1;
    }
    Ok(inserted)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::NaiveDate;
    use taskmaster_api::db::MemoryStore;
    use taskmaster_api::services::auth::prepare_user;
    use taskmaster_core::{Role, TaskPriority, TaskStatus};

    use super::*;

    async fn store_with_alice() -> (MemoryStore, UserId) {
        let store = MemoryStore::new();
        let alice = prepare_user("alice", "a@x.com", "secret1", Role::User).unwrap();
        let alice = UserStore::insert(&store, alice).await.unwrap();
        (store, alice.id)
    }

    #[test]
    fn test_parse_full_and_minimal_tasks() {
        let yaml = r"
tasks:
  - title: Write report
    description: quarterly
    status: in-progress
    priority: high
    dueDate: 2024-01-15
    assignees: [A@X.com]
  - title: Order coffee
";
        let tasks = parse(yaml).unwrap();
        assert_eq!(tasks.len(), 2);

        let first = &tasks[0];
        assert_eq!(first.fields.title, "Write report");
        assert_eq!(first.fields.status, TaskStatus::InProgress);
        assert_eq!(first.fields.priority, TaskPriority::High);
        assert_eq!(first.fields.due_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(first.assignees[0].as_str(), "a@x.com");

        let second = &tasks[1];
        assert_eq!(second.fields.status, TaskStatus::NotStarted);
        assert!(second.assignees.is_empty());
    }

    #[test]
    fn test_blank_title_names_the_task() {
        let yaml = "tasks:\n  - title: ok\n  - title: '  '\n";
        assert!(matches!(
            parse(yaml),
            Err(CliError::InvalidSeed { index: 1, .. })
        ));
    }

    #[test]
    fn test_bad_assignee_email() {
        let yaml = "tasks:\n  - title: ok\n    assignees: [nope]\n";
        assert!(matches!(
            parse(yaml),
            Err(CliError::InvalidSeed { index: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_status_is_a_yaml_error() {
        let yaml = "tasks:\n  - title: ok\n    status: open\n";
        assert!(matches!(parse(yaml), Err(CliError::Yaml(_))));
    }

    #[tokio::test]
    async fn test_resolve_maps_emails_to_ids() {
        let (store, alice) = store_with_alice().await;
        let seeds = parse("tasks:\n  - title: one\n    assignees: [A@X.com]\n").unwrap();

        let resolved = resolve(&store, seeds).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].1, BTreeSet::from([alice]));
    }

    #[tokio::test]
    async fn test_unknown_assignee_writes_nothing() {
        let (store, _) = store_with_alice().await;
        let yaml = "tasks:\n  - title: one\n    assignees: [a@x.com]\n  - title: two\n    assignees: [ghost@x.com]\n";
        let seeds = parse(yaml).unwrap();

        let result = insert_all(&store, &store, seeds).await;
        assert!(matches!(result, Err(CliError::UnknownUser(ref email)) if email == "ghost@x.com"));
        assert!(TaskStore::list(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_all_inserts_every_task() {
        let (store, _) = store_with_alice().await;
        let seeds = parse("tasks:\n  - title: one\n  - title: two\n").unwrap();

        assert_eq!(insert_all(&store, &store, seeds).await.unwrap(), 2);
        assert_eq!(TaskStore::list(&store).await.unwrap().len(), 2);
    }
}
