use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::datetime::iso_date_serde;
use crate::storage::KeyValueStore;
use crate::task::{Task, TaskId, TaskStatus};

/// Slot holding the task snapshot.
pub const TASKS_KEY: &str = "tasks";

/// On-disk shape of one task. Older snapshots lack `status` and
/// `comments`, and may carry `null` where a value is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, with = "iso_date_serde::option")]
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    comments: Option<String>,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            title: task.title.clone(),
            completed: task.is_completed(),
            status: Some(task.status.as_str().to_string()),
            due_date: task.due_date,
            comments: Some(task.comments.clone()),
        }
    }
}

impl TaskRecord {
    fn into_task(self) -> Task {
        let derived = if self.completed {
            TaskStatus::Completed
        } else {
            TaskStatus::Todo
        };

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => derived,
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                warn!(id = %self.id, error = %err, "unknown stored status; using completion flag");
                derived
            }),
        };

        Task {
            id: TaskId::from(self.id),
            title: self.title,
            status,
            due_date: self.due_date,
            comments: self.comments.unwrap_or_default(),
        }
    }
}

pub fn encode_tasks(tasks: &[Task]) -> anyhow::Result<String> {
    let records: Vec<TaskRecord> = tasks.iter().map(TaskRecord::from).collect();
    serde_json::to_string(&records).context("failed to serialize task snapshot")
}

/// Decodes a snapshot, upgrading legacy records on the way.
pub fn decode_tasks(raw: &str) -> anyhow::Result<Vec<Task>> {
    let records: Vec<TaskRecord> =
        serde_json::from_str(raw).context("failed to parse task snapshot")?;
    Ok(records.into_iter().map(TaskRecord::into_task).collect())
}

/// Reads the snapshot once at startup. Missing, unreadable or malformed
/// content yields an empty list.
#[tracing::instrument(skip(storage))]
pub fn load_tasks<S: KeyValueStore + ?Sized>(storage: &S) -> Vec<Task> {
    let raw = match storage.get_item(TASKS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("no saved tasks");
            return Vec::new();
        }
        Err(err) => {
            error!(error = %format!("{err:#}"), "error reading saved tasks");
            return Vec::new();
        }
    };

    match decode_tasks(&raw) {
        Ok(tasks) => {
            debug!(count = tasks.len(), "loaded saved tasks");
            tasks
        }
        Err(err) => {
            error!(error = %format!("{err:#}"), "error parsing saved tasks");
            Vec::new()
        }
    }
}

#[tracing::instrument(skip(storage, tasks), fields(count = tasks.len()))]
pub fn save_tasks<S: KeyValueStore + ?Sized>(
    storage: &mut S,
    tasks: &[Task],
) -> anyhow::Result<()> {
    let encoded = encode_tasks(tasks)?;
    storage
        .set_item(TASKS_KEY, &encoded)
        .context("failed to write task snapshot")
}
