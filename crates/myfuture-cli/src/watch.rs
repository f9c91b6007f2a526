use std::future::Future;
use std::io::{self, Write};
use std::time::Duration as StdDuration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use myfuture_core::reminder::{NotificationPermission, Reminder, ReminderScheduler};
use myfuture_core::{KeyValueStore, Session, Task};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::notify::{self, TerminalNotifier, TimerDriver};
use crate::render::Renderer;

/// Blocks until Ctrl-C, delivering reminders for the tasks in `session`
/// as they fall due. Storage is re-read every poll so edits made by other
/// invocations are picked up.
#[tracing::instrument(skip_all)]
pub fn run<S: KeyValueStore, W: Write>(
    session: &mut Session<S>,
    cfg: &Config,
    renderer: &mut Renderer<W>,
) -> anyhow::Result<()> {
    let permission = notify::resolve_permission(cfg, session)?;
    if !permission.allows_scheduling() {
        return renderer.line(&format!("{}; no reminders will be shown.", permission.as_label()));
    }

    let poll = cfg.poll_interval()?;
    let sound = cfg.get_bool("reminder.sound").unwrap_or(true);
    let mut notifier = TerminalNotifier::new(io::stderr(), sound);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the reminder runtime")?;

    renderer.line("Watching for due tasks. Press Ctrl-C to stop.")?;
    let delivered = runtime.block_on(watch_loop(
        session,
        &mut notifier,
        permission,
        poll,
        Utc::now,
        ctrl_c(),
    ))?;
    renderer.line(&format!("Stopped after {delivered} reminder(s)."))
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for Ctrl-C; stop the process another way");
        std::future::pending::<()>().await;
    }
}

/// Runs until `shutdown` resolves and returns how many reminders were
/// delivered. Every armed timer is cancelled on the way out.
pub async fn watch_loop<S, W, C, F>(
    session: &mut Session<S>,
    notifier: &mut TerminalNotifier<W>,
    permission: NotificationPermission,
    poll: StdDuration,
    clock: C,
    shutdown: F,
) -> anyhow::Result<usize>
where
    S: KeyValueStore,
    W: Write,
    C: Fn() -> DateTime<Utc>,
    F: Future<Output = ()>,
{
    let (driver, mut fired) = TimerDriver::channel(permission);
    let mut scheduler = ReminderScheduler::new(driver);
    let armed = scheduler.sync(session.tasks(), clock());
    info!(tasks = session.tasks().len(), armed, "watch started");

    let mut ticker = tokio::time::interval_at(Instant::now() + poll, poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(shutdown);
    let mut delivered = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("shutdown requested");
                break;
            }
            Some(reminder) = fired.recv() => {
                // another invocation may have changed the task since the last poll
                session.reload();
                if still_due(session.tasks(), &reminder) {
                    notifier.deliver(&reminder)?;
                    delivered += 1;
                } else {
                    debug!(id = %reminder.task_id, "dropping reminder for a changed task");
                }
                scheduler.sync(session.tasks(), clock());
            }
            _ = ticker.tick() => {
                if session.reload() {
                    info!(tasks = session.tasks().len(), "tasks changed on disk");
                }
                scheduler.sync(session.tasks(), clock());
            }
        }
    }

    scheduler.cancel_all();
    info!(delivered, "watch stopped");
    Ok(delivered)
}

/// True while the task behind `reminder` exists, is open and still has
/// the due date the reminder was armed for.
fn still_due(tasks: &[Task], reminder: &Reminder) -> bool {
    tasks
        .iter()
        .find(|task| task.id == reminder.task_id)
        .is_some_and(|task| !task.is_completed() && task.due_date == Some(reminder.due))
}
