use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [Self::Todo, Self::InProgress, Self::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }

    /// Human form used in feedback lines, e.g. "in progress".
    pub fn label(self) -> String {
        self.as_str().replace('-', " ")
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(Self::Todo),
            "in-progress" | "in_progress" | "inprogress" | "in progress" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(anyhow!(
                "unknown status '{other}' (expected todo, in-progress or completed)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of a timestamp-shaped id. Ids written by other tools may
    /// not be numeric.
    pub fn millis(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A single to-do record. `status` is the only completion state; callers ask
/// [`Task::is_completed`] instead of reading a separate flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub comments: String,
}

impl Task {
    pub fn new(id: TaskId, title: impl Into<String>, due_date: Option<DateTime<Utc>>) -> Self {
        Self {
            id,
            title: title.into(),
            status: TaskStatus::Todo,
            due_date,
            comments: String::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn toggle_complete(&mut self) {
        self.status = if self.is_completed() {
            TaskStatus::Todo
        } else {
            TaskStatus::Completed
        };
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed() && self.due_date.map(|due| due < now).unwrap_or(false)
    }

    pub fn is_due_soon(&self, now: DateTime<Utc>, window: Duration) -> bool {
        if self.is_completed() {
            return false;
        }
        self.due_date
            .map(|due| due >= now && due - now <= window)
            .unwrap_or(false)
    }

    /// Due date still ahead of `now`, i.e. one a reminder can be armed for.
    pub fn future_due(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.due_date.filter(|due| *due > now)
    }
}
