use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{
  Deserialize,
  Serialize
};

use crate::task::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
  #[default]
  All,
  Active,
  Completed
}

impl FilterMode {
  pub const ALL: [FilterMode; 3] = [
    Self::All,
    Self::Active,
    Self::Completed
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | Self::All => "all",
      | Self::Active => "active",
      | Self::Completed => "completed"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Self::All => "All",
      | Self::Active => "Active",
      | Self::Completed => "Completed"
    }
  }

  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Active => {
        !task.is_completed()
      }
      | Self::Completed => {
        task.is_completed()
      }
    }
  }
}

impl fmt::Display for FilterMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for FilterMode {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(Self::All),
      | "active" | "pending" => {
        Ok(Self::Active)
      }
      | "completed" | "done" => {
        Ok(Self::Completed)
      }
      | other => Err(anyhow!(
        "unknown filter '{other}' \
         (expected all, active or \
         completed)"
      ))
    }
  }
}

/// Visible subset for `mode`, in store
/// order.
#[must_use]
pub fn project(
  tasks: &[Task],
  mode: FilterMode
) -> Vec<&Task> {
  tasks
    .iter()
    .filter(|task| mode.matches(task))
    .collect()
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub struct TaskCounts {
  pub all:       usize,
  pub active:    usize,
  pub completed: usize
}

impl TaskCounts {
  #[must_use]
  pub fn from_tasks(
    tasks: &[Task]
  ) -> Self {
    let completed = tasks
      .iter()
      .filter(|task| task.is_completed())
      .count();
    Self {
      all: tasks.len(),
      active: tasks.len() - completed,
      completed
    }
  }

  pub fn count(
    &self,
    mode: FilterMode
  ) -> usize {
    match mode {
      | FilterMode::All => self.all,
      | FilterMode::Active => {
        self.active
      }
      | FilterMode::Completed => {
        self.completed
      }
    }
  }

  pub fn can_clear_completed(
    &self
  ) -> bool {
    self.completed > 0
  }
}

/// Placeholder line for an empty view,
/// or `None` when something is visible.
#[must_use]
pub fn empty_message(
  total: usize,
  visible: usize,
  mode: FilterMode
) -> Option<String> {
  if total == 0 {
    return Some(
      "No tasks yet. Add your first \
       task above!"
        .to_string()
    );
  }
  if visible == 0 {
    return Some(format!(
      "No {mode} tasks found."
    ));
  }
  None
}
