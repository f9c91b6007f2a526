use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};
use myfuture_core::filter::{FilterMode, empty_message};
use myfuture_core::persist::TASKS_KEY;
use myfuture_core::reminder::{NotificationPermission, Reminder, ReminderDriver, ReminderScheduler};
use myfuture_core::storage::{KeyValueStore, MemoryStorage};
use myfuture_core::{Session, TaskStatus};

#[derive(Default)]
struct Recorder {
    armed: Vec<(StdDuration, Reminder)>,
    disarmed: usize,
}

impl ReminderDriver for Recorder {
    type Handle = usize;

    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn arm(&mut self, delay: StdDuration, reminder: Reminder) -> usize {
        self.armed.push((delay, reminder));
        self.armed.len()
    }

    fn disarm(&mut self, _handle: usize) {
        self.disarmed += 1;
    }
}

#[test]
fn legacy_snapshot_to_reminders() {
    let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
    let legacy = r#"[
        {"id":"1760000000003","title":"Pick up parcel","completed":false,"dueDate":"2026-10-18T11:00:00.000Z"},
        {"id":"1760000000002","title":"Old chore","completed":true},
        {"id":"1760000000001","title":"Book dentist","completed":false,"dueDate":null}
    ]"#;
    let storage = MemoryStorage::new().with_item(TASKS_KEY, legacy);

    let mut session = Session::open(storage);
    assert_eq!(session.tasks()[1].status, TaskStatus::Completed);
    assert_eq!(session.tasks()[1].comments, "");

    let mut reminders = ReminderScheduler::new(Recorder::default());
    assert_eq!(reminders.sync(session.tasks(), now), 1);
    let (delay, reminder) = &reminders.driver().armed[0];
    assert_eq!(*delay, StdDuration::from_secs(2 * 3600));
    assert_eq!(reminder.title, "Pick up parcel");

    let parcel = session.tasks()[0].id.clone();
    session.toggle_complete(&parcel).expect("toggle");
    reminders.sync(session.tasks(), now);
    assert_eq!(reminders.pending(), 0);
    assert_eq!(reminders.driver().disarmed, 1);

    let counts = session.counts();
    assert_eq!((counts.all, counts.active, counts.completed), (3, 1, 2));

    let cleared = session.clear_completed().expect("clear");
    assert_eq!(cleared.feedback.as_deref(), Some("2 completed tasks cleared"));
    assert_eq!(session.visible(FilterMode::Completed).len(), 0);
    assert_eq!(
        empty_message(session.tasks().len(), 0, FilterMode::Completed).as_deref(),
        Some("No completed tasks found.")
    );

    let raw = session.storage().get_item(TASKS_KEY).expect("read").expect("slot");
    assert!(raw.contains("\"status\":\"todo\""));
    assert!(raw.contains("\"comments\":\"\""));
}

#[test]
fn new_due_task_is_scheduled_after_add() {
    let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
    let mut session = Session::open(MemoryStorage::new());
    let mut reminders = ReminderScheduler::new(Recorder::default());

    session
        .add("Stand-up", Some(now + Duration::minutes(30)), now)
        .expect("add");
    session.add("Someday", None, now).expect("add");
    assert_eq!(reminders.sync(session.tasks(), now), 1);

    let id = session.tasks()[1].id.clone();
    session
        .set_due_date(&id, Some(now + Duration::minutes(45)))
        .expect("due");
    assert_eq!(reminders.sync(session.tasks(), now), 1);
    assert_eq!(reminders.pending(), 1);
    assert_eq!(reminders.driver().disarmed, 1);

    let (delay, _) = reminders.driver().armed.last().expect("armed");
    assert_eq!(*delay, StdDuration::from_secs(45 * 60));
}
