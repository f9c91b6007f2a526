use std::io::{BufRead, IsTerminal, Write};
use std::time::Duration as StdDuration;

use anyhow::Context;
use myfuture_core::reminder::{NotificationPermission, Reminder, ReminderDriver};
use myfuture_core::{KeyValueStore, Session};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Config, NotifyMode};

const BELL: &str = "\x07";

/// Arms reminders as tokio timers. A fired reminder is sent down the
/// channel handed out by [`TimerDriver::channel`].
pub struct TimerDriver {
    permission: NotificationPermission,
    fired: mpsc::UnboundedSender<Reminder>,
}

impl TimerDriver {
    pub fn channel(
        permission: NotificationPermission,
    ) -> (Self, mpsc::UnboundedReceiver<Reminder>) {
        let (fired, rx) = mpsc::unbounded_channel();
        (Self { permission, fired }, rx)
    }
}

/// A sleeping reminder task. Disarming aborts it, unless its deadline
/// has already been reached: a resync racing the timer at the due
/// instant must not swallow the reminder.
pub struct TimerHandle {
    task: JoinHandle<()>,
    deadline: Instant,
}

impl ReminderDriver for TimerDriver {
    type Handle = TimerHandle;

    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn arm(&mut self, delay: StdDuration, reminder: Reminder) -> TimerHandle {
        let fired = self.fired.clone();
        let deadline = Instant::now() + delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            debug!(id = %reminder.task_id, "reminder timer fired");
            if fired.send(reminder).is_err() {
                debug!("reminder receiver gone");
            }
        });
        TimerHandle { task, deadline }
    }

    fn disarm(&mut self, handle: TimerHandle) {
        if Instant::now() < handle.deadline {
            handle.task.abort();
        } else {
            debug!("reminder already due; leaving it to deliver");
        }
    }
}

/// Shows reminders on a terminal stream, optionally ringing the bell.
pub struct TerminalNotifier<W: Write> {
    out: W,
    sound: bool,
}

impl<W: Write> TerminalNotifier<W> {
    pub fn new(out: W, sound: bool) -> Self {
        Self { out, sound }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    #[tracing::instrument(skip(self, reminder), fields(id = %reminder.task_id))]
    pub fn deliver(&mut self, reminder: &Reminder) -> anyhow::Result<()> {
        writeln!(self.out, "{}: {}", reminder.heading(), reminder.body())?;
        self.out.flush()?;
        info!(title = %reminder.title, "reminder delivered");

        if self.sound
            && let Err(err) = self.play_sound()
        {
            debug!(error = %err, "reminder sound failed");
        }
        Ok(())
    }

    fn play_sound(&mut self) -> std::io::Result<()> {
        self.out.write_all(BELL.as_bytes())?;
        self.out.flush()
    }
}

/// Permission to use before any prompt. `Default` means the user has to
/// be asked.
pub fn decide_permission(
    mode: NotifyMode,
    stored: Option<NotificationPermission>,
    interactive: bool,
) -> NotificationPermission {
    match mode {
        NotifyMode::On => NotificationPermission::Granted,
        NotifyMode::Off => NotificationPermission::Denied,
        NotifyMode::Ask => match stored {
            Some(p @ (NotificationPermission::Granted | NotificationPermission::Denied)) => p,
            _ if interactive => NotificationPermission::Default,
            _ => NotificationPermission::Unsupported,
        },
    }
}

/// Asks a yes/no question on `out` and reads the answer from `input`.
/// Anything but a yes is a refusal.
pub fn prompt_permission<R: BufRead, W: Write>(
    mut input: R,
    mut out: W,
) -> anyhow::Result<NotificationPermission> {
    write!(out, "Show reminders when tasks fall due? [y/N] ")?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer).context("failed to read answer")?;

    Ok(match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => NotificationPermission::Granted,
        _ => NotificationPermission::Denied,
    })
}

/// Resolves the permission for this run, prompting on the terminal when
/// needed. A prompted answer is remembered in storage.
#[tracing::instrument(skip(cfg, session))]
pub fn resolve_permission<S: KeyValueStore>(
    cfg: &Config,
    session: &mut Session<S>,
) -> anyhow::Result<NotificationPermission> {
    let interactive = std::io::stdin().is_terminal() && std::io::stderr().is_terminal();
    let decided = decide_permission(cfg.notify_mode()?, session.load_permission(), interactive);
    if !decided.should_prompt() {
        debug!(permission = %decided, "notification permission decided");
        return Ok(decided);
    }

    let answer = prompt_permission(std::io::stdin().lock(), std::io::stderr())?;
    if let Err(err) = session.save_permission(answer) {
        warn!(error = %format!("{err:#}"), "could not remember notification permission");
    }
    info!(permission = %answer, "notification permission answered");
    Ok(answer)
}
