use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::task::{Task, TaskId};

/// Heading of every reminder notification.
pub const REMINDER_TITLE: &str = "Task Reminder";

/// Slot holding the last known notification permission.
pub const PERMISSION_KEY: &str = "notification-permission";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    /// Not decided yet; the shell may prompt.
    Default,
    Granted,
    /// Refused. Never prompt again.
    Denied,
    /// The runtime cannot show notifications at all.
    Unsupported,
}

impl NotificationPermission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Self::Default => "Permission not requested",
            Self::Granted => "Permission granted",
            Self::Denied => "Permission denied",
            Self::Unsupported => "Notifications unsupported",
        }
    }

    pub fn allows_scheduling(self) -> bool {
        self == Self::Granted
    }

    pub fn should_prompt(self) -> bool {
        self == Self::Default
    }
}

impl fmt::Display for NotificationPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationPermission {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "granted" => Ok(Self::Granted),
            "denied" => Ok(Self::Denied),
            "unsupported" => Ok(Self::Unsupported),
            other => Err(anyhow!("unknown notification permission '{other}'")),
        }
    }
}

/// What a fired reminder shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub task_id: TaskId,
    pub title: String,
    pub due: DateTime<Utc>,
}

impl Reminder {
    pub fn for_task(task: &Task, due: DateTime<Utc>) -> Self {
        Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            due,
        }
    }

    pub fn heading(&self) -> &'static str {
        REMINDER_TITLE
    }

    pub fn body(&self) -> String {
        format!("It's time to complete: {}", self.title)
    }
}

/// Platform timer plus delivery. `arm` must fire the reminder once after
/// `delay` unless the returned handle is passed to `disarm` first.
pub trait ReminderDriver {
    type Handle;

    fn permission(&self) -> NotificationPermission;

    fn arm(&mut self, delay: StdDuration, reminder: Reminder) -> Self::Handle;

    fn disarm(&mut self, handle: Self::Handle);
}

struct Armed<H> {
    due: DateTime<Utc>,
    handle: H,
}

/// One pending reminder per task. Rescheduling replaces the previous
/// handle, so a task never has two reminders in flight.
pub struct ReminderScheduler<D: ReminderDriver> {
    driver: D,
    permission: NotificationPermission,
    armed: HashMap<TaskId, Armed<D::Handle>>,
}

impl<D: ReminderDriver> ReminderScheduler<D> {
    pub fn new(driver: D) -> Self {
        let permission = driver.permission();
        debug!(%permission, "reminder scheduler created");
        Self {
            driver,
            permission,
            armed: HashMap::new(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn permission(&self) -> NotificationPermission {
        self.permission
    }

    pub fn set_permission(&mut self, permission: NotificationPermission) {
        if self.permission == permission {
            return;
        }
        info!(from = %self.permission, to = %permission, "notification permission changed");
        self.permission = permission;
        if !permission.allows_scheduling() {
            self.cancel_all();
        }
    }

    pub fn pending(&self) -> usize {
        self.armed.len()
    }

    pub fn is_armed(&self, id: &TaskId) -> bool {
        self.armed.contains_key(id)
    }

    /// Arms a reminder for `task` at `due`. Returns false, arming nothing,
    /// when permission is missing or `due` is not after `now`.
    #[tracing::instrument(skip(self, task, now), fields(id = %task.id))]
    pub fn schedule(&mut self, task: &Task, due: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if !self.permission.allows_scheduling() {
            debug!(permission = %self.permission, "scheduling skipped");
            return false;
        }

        let Ok(delay) = (due - now).to_std() else {
            debug!("due date already passed");
            return false;
        };
        if delay.is_zero() {
            debug!("due date already passed");
            return false;
        }

        self.cancel(&task.id);
        let handle = self.driver.arm(delay, Reminder::for_task(task, due));
        info!(title = %task.title, due = %due, "reminder scheduled");
        self.armed.insert(task.id.clone(), Armed { due, handle });
        true
    }

    pub fn cancel(&mut self, id: &TaskId) -> bool {
        match self.armed.remove(id) {
            Some(armed) => {
                debug!(id = %id, "reminder cancelled");
                self.driver.disarm(armed.handle);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, armed) in self.armed.drain() {
            self.driver.disarm(armed.handle);
        }
    }

    /// Brings armed reminders in line with `tasks`. Reminders for removed
    /// or completed tasks, and for changed or passed due dates, are
    /// cancelled. Every incomplete task with a future due date ends up
    /// with exactly one reminder. Returns how many were newly armed.
    #[tracing::instrument(skip(self, tasks, now), fields(count = tasks.len()))]
    pub fn sync(&mut self, tasks: &[Task], now: DateTime<Utc>) -> usize {
        let wanted: HashMap<&TaskId, DateTime<Utc>> = tasks
            .iter()
            .filter(|task| !task.is_completed())
            .filter_map(|task| task.future_due(now).map(|due| (&task.id, due)))
            .collect();

        let stale: Vec<TaskId> = self
            .armed
            .iter()
            .filter(|(id, armed)| wanted.get(id) != Some(&armed.due))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            self.cancel(id);
        }

        let mut newly_armed = 0;
        for task in tasks {
            let Some(due) = wanted.get(&task.id).copied() else {
                continue;
            };
            if self.armed.contains_key(&task.id) {
                continue;
            }
            if self.schedule(task, due, now) {
                newly_armed += 1;
            }
        }

        debug!(
            cancelled = stale.len(),
            armed = newly_armed,
            pending = self.armed.len(),
            "reminders synced"
        );
        newly_armed
    }
}

impl<D: ReminderDriver> Drop for ReminderScheduler<D> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
