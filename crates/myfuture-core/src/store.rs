use chrono::{DateTime, Utc};
use tracing::debug;

use crate::task::{Task, TaskId, TaskStatus};

/// Canonical ordered task list, newest first.
///
/// Lookups that miss return `None` and leave the list untouched. Only
/// [`TaskStore::add`] changes the relative order of tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    #[tracing::instrument(skip(self, title, now), fields(due = ?due_date))]
    pub fn add(
        &mut self,
        title: &str,
        due_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<&Task> {
        let title = title.trim();
        if title.is_empty() {
            debug!("rejected blank title");
            return None;
        }

        let id = self.next_id(now);
        debug!(id = %id, "task added");
        self.tasks.insert(0, Task::new(id, title, due_date));
        self.tasks.first()
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn toggle_complete(&mut self, id: &TaskId) -> Option<&Task> {
        let task = self.find_mut(id)?;
        task.toggle_complete();
        debug!(status = %task.status, "toggled completion");
        Some(&*task)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn set_status(&mut self, id: &TaskId, status: TaskStatus) -> Option<&Task> {
        let task = self.find_mut(id)?;
        task.status = status;
        Some(&*task)
    }

    #[tracing::instrument(skip(self, text), fields(id = %id))]
    pub fn set_comments(&mut self, id: &TaskId, text: &str) -> Option<&Task> {
        let task = self.find_mut(id)?;
        task.comments = text.to_string();
        Some(&*task)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn set_due_date(
        &mut self,
        id: &TaskId,
        due_date: Option<DateTime<Utc>>,
    ) -> Option<&Task> {
        let task = self.find_mut(id)?;
        task.due_date = due_date;
        Some(&*task)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let idx = self.tasks.iter().position(|task| &task.id == id)?;
        Some(self.tasks.remove(idx))
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.is_completed());
        let removed = before - self.tasks.len();
        debug!(removed, remaining = self.tasks.len(), "cleared completed tasks");
        removed
    }

    fn find_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| &task.id == id)
    }

    /// Creation timestamp in milliseconds, bumped past any existing
    /// timestamp id so two adds in the same millisecond stay distinct.
    fn next_id(&self, now: DateTime<Utc>) -> TaskId {
        let now_ms = now.timestamp_millis();
        let newest = self.tasks.iter().filter_map(|task| task.id.millis()).max();
        let candidate = match newest {
            Some(existing) if existing >= now_ms => existing.checked_add(1),
            _ => Some(now_ms),
        };
        match candidate {
            Some(ms) => TaskId::from_millis(ms),
            None => self.free_id_from(now_ms),
        }
    }

    /// First unused id counting up from `start`, wrapping past the top of the
    /// range. Only reached when a stored id sits at `i64::MAX`.
    fn free_id_from(&self, start: i64) -> TaskId {
        let mut ms = start;
        loop {
            let id = TaskId::from_millis(ms);
            if self.tasks.iter().all(|task| task.id != id) {
                return id;
            }
            ms = ms.checked_add(1).unwrap_or(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::TaskStore;
    use crate::task::{Task, TaskId, TaskStatus};

    fn assert_consistent(store: &TaskStore) {
        for task in store.tasks() {
            assert_eq!(
                task.is_completed(),
                task.status == TaskStatus::Completed,
                "completion out of sync for {}",
                task.id
            );
        }
    }

    fn sample() -> TaskStore {
        let mut a = Task::new(TaskId::from("3"), "water plants", None);
        a.status = TaskStatus::Completed;
        let b = Task::new(TaskId::from("2"), "call mom", None);
        let mut c = Task::new(TaskId::from("1"), "file taxes", None);
        c.status = TaskStatus::Completed;
        TaskStore::from_tasks(vec![a, b, c])
    }

    #[test]
    fn blank_titles_are_rejected() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 8, 0, 0).unwrap();
        let mut store = sample();
        let before = store.clone();

        assert!(store.add("", None, now).is_none());
        assert!(store.add("   ", None, now).is_none());
        assert_eq!(store, before);
    }

    #[test]
    fn add_prepends_a_fresh_todo() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 8, 0, 0).unwrap();
        let mut store = sample();

        let added = store.add("  Buy milk ", None, now).cloned().unwrap();
        assert_eq!(store.tasks()[0], added);
        assert_eq!(added.title, "Buy milk");
        assert_eq!(added.status, TaskStatus::Todo);
        assert!(!added.is_completed());
        assert_eq!(added.comments, "");
        assert_eq!(added.id, TaskId::from_millis(now.timestamp_millis()));
        assert_eq!(store.len(), 4);
        assert_consistent(&store);
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 8, 0, 0).unwrap();
        let mut store = TaskStore::new();

        let first = store.add("one", None, now).unwrap().id.clone();
        let second = store.add("two", None, now).unwrap().id.clone();
        let third = store.add("three", None, now - Duration::seconds(5)).unwrap().id.clone();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(second.millis(), first.millis().map(|ms| ms + 1));
    }

    #[test]
    fn largest_stored_id_does_not_overflow_the_next_one() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 8, 0, 0).unwrap();
        let mut store = TaskStore::from_tasks(vec![Task::new(
            TaskId::from_millis(i64::MAX),
            "from the far future",
            None,
        )]);

        let added = store.add("Buy milk", None, now).unwrap().id.clone();
        assert_eq!(added, TaskId::from_millis(now.timestamp_millis()));

        let again = store.add("Buy bread", None, now).unwrap().id.clone();
        assert_ne!(again, added);
        assert_ne!(again, TaskId::from_millis(i64::MAX));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn mutations_keep_completion_consistent() {
        let mut store = sample();
        let id = TaskId::from("2");

        store.toggle_complete(&id);
        assert_eq!(store.get(&id).unwrap().status, TaskStatus::Completed);
        assert_consistent(&store);

        store.toggle_complete(&id);
        assert_eq!(store.get(&id).unwrap().status, TaskStatus::Todo);
        assert_consistent(&store);

        store.set_status(&id, TaskStatus::InProgress);
        assert!(!store.get(&id).unwrap().is_completed());
        assert_consistent(&store);

        store.set_status(&id, TaskStatus::Completed);
        assert!(store.get(&id).unwrap().is_completed());
        assert_consistent(&store);

        store.set_status(&id, TaskStatus::Todo);
        assert!(!store.get(&id).unwrap().is_completed());
        assert_consistent(&store);
    }

    #[test]
    fn repeated_set_operations_are_idempotent() {
        let mut store = sample();
        let id = TaskId::from("2");

        store.set_status(&id, TaskStatus::InProgress);
        let once = store.clone();
        store.set_status(&id, TaskStatus::InProgress);
        assert_eq!(store, once);

        store.set_comments(&id, "ask about the weekend");
        let once = store.clone();
        store.set_comments(&id, "ask about the weekend");
        assert_eq!(store, once);
    }

    #[test]
    fn unknown_ids_are_noops() {
        let mut store = sample();
        let before = store.clone();
        let missing = TaskId::from("404");

        assert!(store.toggle_complete(&missing).is_none());
        assert!(store.set_status(&missing, TaskStatus::Completed).is_none());
        assert!(store.set_comments(&missing, "x").is_none());
        assert!(store.set_due_date(&missing, None).is_none());
        assert!(store.remove(&missing).is_none());
        assert_eq!(store, before);
    }

    #[test]
    fn remove_and_clear_preserve_order() {
        let mut store = sample();
        store.add("newest", None, Utc::now());

        let removed = store.remove(&TaskId::from("3")).unwrap();
        assert_eq!(removed.title, "water plants");

        let titles: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["newest", "call mom", "file taxes"]);

        assert_eq!(store.clear_completed(), 1);
        let titles: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["newest", "call mom"]);
    }

    #[test]
    fn clear_completed_reports_count() {
        let mut store = sample();
        assert_eq!(store.clear_completed(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.clear_completed(), 0);
    }
}
