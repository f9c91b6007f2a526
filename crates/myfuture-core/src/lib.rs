pub mod datetime;
pub mod filter;
pub mod persist;
pub mod reminder;
pub mod session;
pub mod storage;
pub mod store;
pub mod task;

pub use filter::{
  FilterMode,
  TaskCounts
};
pub use reminder::{
  NotificationPermission,
  Reminder,
  ReminderDriver,
  ReminderScheduler
};
pub use session::{
  Outcome,
  Session
};
pub use storage::{
  KeyValueStore,
  MemoryStorage
};
pub use store::TaskStore;
pub use task::{
  Task,
  TaskId,
  TaskStatus
};
