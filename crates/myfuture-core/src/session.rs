use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::filter::{self, FilterMode, TaskCounts};
use crate::persist::{load_tasks, save_tasks};
use crate::reminder::{NotificationPermission, PERMISSION_KEY};
use crate::storage::KeyValueStore;
use crate::store::TaskStore;
use crate::task::{Task, TaskId, TaskStatus};

/// Result of one session mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub changed: bool,
    /// Short confirmation line for the user, if the action has one.
    pub feedback: Option<String>,
    /// The task as it stands after the mutation (before, for removals).
    pub task: Option<Task>,
}

impl Outcome {
    pub fn unchanged() -> Self {
        Self::default()
    }

    fn changed(task: Option<Task>) -> Self {
        Self {
            changed: true,
            feedback: None,
            task,
        }
    }

    fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }
}

/// Owner of the canonical task list for one application run. Every
/// mutation goes through here and is persisted before it returns.
pub struct Session<S: KeyValueStore> {
    storage: S,
    store: TaskStore,
}

impl<S: KeyValueStore> Session<S> {
    #[tracing::instrument(skip(storage))]
    pub fn open(storage: S) -> Self {
        let store = TaskStore::from_tasks(load_tasks(&storage));
        info!(count = store.len(), "session opened");
        Self { storage, store }
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.store.get(id)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn counts(&self) -> TaskCounts {
        TaskCounts::from_tasks(self.store.tasks())
    }

    pub fn visible(&self, mode: FilterMode) -> Vec<&Task> {
        filter::project(self.store.tasks(), mode)
    }

    #[tracing::instrument(skip(self, title, now))]
    pub fn add(
        &mut self,
        title: &str,
        due_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Outcome> {
        let Some(task) = self.store.add(title, due_date, now).cloned() else {
            return Ok(Outcome::unchanged());
        };
        self.persist()?;
        Ok(Outcome::changed(Some(task)).with_feedback("Task added successfully"))
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn toggle_complete(&mut self, id: &TaskId) -> anyhow::Result<Outcome> {
        let Some(task) = self.store.toggle_complete(id).cloned() else {
            return Ok(Outcome::unchanged());
        };
        self.persist()?;
        Ok(Outcome::changed(Some(task)))
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn set_status(&mut self, id: &TaskId, status: TaskStatus) -> anyhow::Result<Outcome> {
        let Some(task) = self.store.set_status(id, status).cloned() else {
            return Ok(Outcome::unchanged());
        };
        self.persist()?;
        Ok(Outcome::changed(Some(task)).with_feedback(format!("Task marked as {}", status.label())))
    }

    #[tracing::instrument(skip(self, text), fields(id = %id))]
    pub fn set_comments(&mut self, id: &TaskId, text: &str) -> anyhow::Result<Outcome> {
        let Some(task) = self.store.set_comments(id, text).cloned() else {
            return Ok(Outcome::unchanged());
        };
        self.persist()?;
        Ok(Outcome::changed(Some(task)))
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn set_due_date(
        &mut self,
        id: &TaskId,
        due_date: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Outcome> {
        let Some(task) = self.store.set_due_date(id, due_date).cloned() else {
            return Ok(Outcome::unchanged());
        };
        self.persist()?;
        Ok(Outcome::changed(Some(task)))
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn remove(&mut self, id: &TaskId) -> anyhow::Result<Outcome> {
        let Some(task) = self.store.remove(id) else {
            return Ok(Outcome::unchanged());
        };
        self.persist()?;
        Ok(Outcome::changed(Some(task)).with_feedback("Task deleted"))
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_completed(&mut self) -> anyhow::Result<Outcome> {
        let removed = self.store.clear_completed();
        if removed == 0 {
            return Ok(Outcome::unchanged());
        }
        self.persist()?;
        let noun = if removed == 1 { "task" } else { "tasks" };
        Ok(Outcome::changed(None).with_feedback(format!("{removed} completed {noun} cleared")))
    }

    /// Re-reads the snapshot, picking up writes made by another process.
    /// Returns true when the list differs from what was held.
    #[tracing::instrument(skip(self))]
    pub fn reload(&mut self) -> bool {
        let fresh = TaskStore::from_tasks(load_tasks(&self.storage));
        if fresh == self.store {
            return false;
        }
        debug!(before = self.store.len(), after = fresh.len(), "reloaded tasks changed");
        self.store = fresh;
        true
    }

    /// Permission remembered from an earlier run, if any.
    pub fn load_permission(&self) -> Option<NotificationPermission> {
        let raw = match self.storage.get_item(PERMISSION_KEY) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "error reading notification permission");
                return None;
            }
        };
        match raw.parse() {
            Ok(permission) => Some(permission),
            Err(err) => {
                warn!(error = %err, "ignoring stored notification permission");
                None
            }
        }
    }

    pub fn save_permission(&mut self, permission: NotificationPermission) -> anyhow::Result<()> {
        self.storage
            .set_item(PERMISSION_KEY, permission.as_str())
            .context("failed to write notification permission")
    }

    fn persist(&mut self) -> anyhow::Result<()> {
        save_tasks(&mut self.storage, self.store.tasks())
    }
}
