use std::io::Write;

use anyhow::anyhow;
use chrono::{
  DateTime,
  Utc
};
use myfuture_core::filter::{
  FilterMode,
  empty_message
};
use myfuture_core::{
  KeyValueStore,
  Session,
  TaskId,
  TaskStatus
};
use tracing::{
  debug,
  info,
  instrument
};

use crate::cli::Command;
use crate::config::Config;
use crate::datetime::parse_due_expr;
use crate::render::Renderer;
use crate::watch;

#[instrument(skip(
  session, cfg, renderer, command,
  now
))]
pub fn dispatch<
  S: KeyValueStore,
  W: Write
>(
  session: &mut Session<S>,
  cfg: &Config,
  renderer: &mut Renderer<W>,
  command: Command,
  now: DateTime<Utc>
) -> anyhow::Result<()> {
  debug!(?command, "dispatching");

  match command {
    | Command::Add {
      title,
      due
    } => cmd_add(
      session,
      renderer,
      &title.join(" "),
      due.as_deref(),
      now
    ),
    | Command::List {
      filter
    } => {
      let mode = match filter {
        | Some(raw) => {
          raw.parse::<FilterMode>()?
        }
        | None => cfg.default_filter()?
      };
      cmd_list(
        session, renderer, mode, now
      )
    }
    | Command::Info {
      id
    } => {
      let id = resolve_id(session, &id)?;
      let task =
        session.get(&id).ok_or_else(
          || no_match(id.as_str())
        )?;
      renderer.print_task_info(task, now)
    }
    | Command::Toggle {
      id
    } => {
      let id = resolve_id(session, &id)?;
      let outcome =
        session.toggle_complete(&id)?;
      let status = outcome
        .task
        .map(|task| task.status)
        .ok_or_else(|| {
          no_match(id.as_str())
        })?;
      renderer.line(&format!(
        "Task marked as {}",
        status.label()
      ))
    }
    | Command::Status {
      id,
      status
    } => {
      let id = resolve_id(session, &id)?;
      let status: TaskStatus =
        status.parse()?;
      let outcome =
        session.set_status(&id, status)?;
      report(renderer, outcome.feedback)
    }
    | Command::Comment {
      id,
      text
    } => {
      let id = resolve_id(session, &id)?;
      let text = text.join(" ");
      session.set_comments(&id, &text)?;
      renderer.line(
        if text.is_empty() {
          "Comments cleared"
        } else {
          "Comments saved"
        }
      )
    }
    | Command::Due {
      id,
      when
    } => {
      let id = resolve_id(session, &id)?;
      let due = parse_due_expr(
        &when,
        now,
        renderer.zone()
      )?;
      session.set_due_date(&id, due)?;
      match due {
        | Some(due) => {
          let shown = renderer
            .zone()
            .format(due, "%Y-%m-%d %H:%M");
          renderer.line(&format!(
            "Due date set to {shown}"
          ))
        }
        | None => {
          renderer.line("Due date cleared")
        }
      }
    }
    | Command::Rm {
      id
    } => {
      let id = resolve_id(session, &id)?;
      let outcome = session.remove(&id)?;
      report(renderer, outcome.feedback)
    }
    | Command::ClearCompleted => {
      let outcome =
        session.clear_completed()?;
      if outcome.changed {
        report(renderer, outcome.feedback)
      } else {
        renderer.line(
          "No completed tasks to clear"
        )
      }
    }
    | Command::Counts => {
      let counts = session.counts();
      renderer.print_counts(&counts, None)
    }
    | Command::Watch => {
      watch::run(session, cfg, renderer)
    }
  }
}

#[instrument(skip(
  session, renderer, title, due, now
))]
fn cmd_add<
  S: KeyValueStore,
  W: Write
>(
  session: &mut Session<S>,
  renderer: &mut Renderer<W>,
  title: &str,
  due: Option<&str>,
  now: DateTime<Utc>
) -> anyhow::Result<()> {
  info!("command add");

  let due = match due {
    | Some(raw) => parse_due_expr(
      raw,
      now,
      renderer.zone()
    )?,
    | None => None
  };

  let outcome =
    session.add(title, due, now)?;
  let Some(task) = outcome.task else {
    return Err(anyhow!(
      "task title cannot be empty"
    ));
  };

  debug!(id = %task.id, "task added");
  report(renderer, outcome.feedback)?;
  renderer.line(&format!(
    "Created task {}.",
    task.id
  ))
}

#[instrument(skip(
  session, renderer, now
))]
fn cmd_list<
  S: KeyValueStore,
  W: Write
>(
  session: &Session<S>,
  renderer: &mut Renderer<W>,
  mode: FilterMode,
  now: DateTime<Utc>
) -> anyhow::Result<()> {
  let visible = session.visible(mode);
  renderer.print_counts(
    &session.counts(),
    Some(mode)
  )?;

  if let Some(message) = empty_message(
    session.tasks().len(),
    visible.len(),
    mode
  ) {
    return renderer.line(&message);
  }

  renderer.print_task_table(&visible, now)
}

/// Finds the task a user typed. An exact id wins; otherwise any unique
/// suffix will do, so the last few digits of a timestamp id are enough.
pub fn resolve_id<S: KeyValueStore>(
  session: &Session<S>,
  raw: &str
) -> anyhow::Result<TaskId> {
  let wanted = raw.trim();
  if wanted.is_empty() {
    return Err(anyhow!(
      "task id cannot be empty"
    ));
  }

  let exact = TaskId::from(wanted);
  if session.get(&exact).is_some() {
    return Ok(exact);
  }

  let mut matches = session
    .tasks()
    .iter()
    .filter(|task| {
      task.id.as_str().ends_with(wanted)
    })
    .map(|task| task.id.clone());

  let Some(first) = matches.next() else {
    return Err(no_match(wanted));
  };
  let extra = matches.count();
  if extra > 0 {
    return Err(anyhow!(
      "'{wanted}' matches {} tasks; \
       give more digits",
      extra + 1
    ));
  }
  Ok(first)
}

fn no_match(id: &str) -> anyhow::Error {
  anyhow!("no task matches '{id}'")
}

fn report<W: Write>(
  renderer: &mut Renderer<W>,
  feedback: Option<String>
) -> anyhow::Result<()> {
  match feedback {
    | Some(line) => renderer.line(&line),
    | None => Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Duration,
    TimeZone,
    Utc
  };
  use myfuture_core::{
    MemoryStorage,
    Session,
    TaskStatus
  };

  use super::{
    dispatch,
    resolve_id
  };
  use crate::cli::Command;
  use crate::config::Config;
  use crate::datetime::Zone;
  use crate::render::Renderer;

  fn renderer() -> Renderer<Vec<u8>> {
    Renderer::new(
      Vec::new(),
      false,
      Zone::Named(chrono_tz::UTC),
      Duration::hours(24)
    )
  }

  fn run(
    session: &mut Session<MemoryStorage>,
    command: Command
  ) -> anyhow::Result<String> {
    let now = Utc
      .with_ymd_and_hms(
        2026, 10, 18, 9, 0, 0
      )
      .unwrap();
    let mut r = renderer();
    dispatch(
      session,
      &Config::defaults(),
      &mut r,
      command,
      now
    )?;
    Ok(
      String::from_utf8(r.into_inner())
        .unwrap()
    )
  }

  #[test]
  fn add_then_list_and_status() {
    let mut session =
      Session::open(MemoryStorage::new());
    let out = run(
      &mut session,
      Command::Add {
        title: vec![
          "Renew".to_string(),
          "passport".to_string()
        ],
        due: Some("+2h".to_string())
      }
    )
    .unwrap();
    assert!(out.starts_with(
      "Task added successfully\n"
    ));

    let id =
      session.tasks()[0].id.to_string();
    let out = run(
      &mut session,
      Command::Status {
        id: id.clone(),
        status: "in-progress".to_string()
      }
    )
    .unwrap();
    assert_eq!(
      out,
      "Task marked as in progress\n"
    );
    assert_eq!(
      session.tasks()[0].status,
      TaskStatus::InProgress
    );

    let out = run(
      &mut session,
      Command::List {
        filter: Some("active".to_string())
      }
    )
    .unwrap();
    assert!(out.starts_with(
      "All 1 | Active 1 | Completed 0\n"
    ));
    assert!(out.contains(
      "2026-10-18 11:00 (soon)"
    ));
    assert!(out.contains("Renew passport"));
  }

  #[test]
  fn empty_views_print_placeholders() {
    let mut session =
      Session::open(MemoryStorage::new());
    let out = run(
      &mut session,
      Command::List {
        filter: None
      }
    )
    .unwrap();
    assert!(out.ends_with(
      "No tasks yet. Add your first task above!\n"
    ));

    run(
      &mut session,
      Command::Add {
        title: vec!["x".to_string()],
        due: None
      }
    )
    .unwrap();
    let out = run(
      &mut session,
      Command::List {
        filter: Some(
          "completed".to_string()
        )
      }
    )
    .unwrap();
    assert!(out.ends_with(
      "No completed tasks found.\n"
    ));
  }

  #[test]
  fn ids_resolve_by_unique_suffix() {
    let mut session =
      Session::open(MemoryStorage::new());
    let now = Utc
      .with_ymd_and_hms(
        2026, 10, 18, 9, 0, 0
      )
      .unwrap();
    session.add("a", None, now).unwrap();
    session.add("b", None, now).unwrap();
    let newest =
      session.tasks()[0].id.to_string();
    let oldest =
      session.tasks()[1].id.to_string();

    let last = &newest[newest.len() - 1..];
    assert_eq!(
      resolve_id(&session, last)
        .unwrap()
        .to_string(),
      newest
    );
    assert_eq!(
      resolve_id(&session, &oldest)
        .unwrap()
        .to_string(),
      oldest
    );

    let err =
      resolve_id(&session, "nope")
        .unwrap_err();
    assert_eq!(
      err.to_string(),
      "no task matches 'nope'"
    );
    assert!(
      run(
        &mut session,
        Command::Rm {
          id: "nope".to_string()
        }
      )
      .is_err()
    );
  }

  #[test]
  fn blank_titles_and_bad_dates_fail() {
    let mut session =
      Session::open(MemoryStorage::new());
    assert!(
      run(
        &mut session,
        Command::Add {
          title: vec!["  ".to_string()],
          due: None
        }
      )
      .is_err()
    );
    assert!(
      run(
        &mut session,
        Command::Add {
          title: vec!["x".to_string()],
          due: Some("someday".to_string())
        }
      )
      .is_err()
    );
    assert!(session.tasks().is_empty());
  }

  #[test]
  fn clear_completed_reports_count() {
    let mut session =
      Session::open(MemoryStorage::new());
    let out = run(
      &mut session,
      Command::ClearCompleted
    )
    .unwrap();
    assert_eq!(
      out,
      "No completed tasks to clear\n"
    );

    let now = Utc
      .with_ymd_and_hms(
        2026, 10, 18, 9, 0, 0
      )
      .unwrap();
    session.add("done", None, now).unwrap();
    let id = session.tasks()[0].id.to_string();
    run(
      &mut session,
      Command::Toggle {
        id
      }
    )
    .unwrap();
    let out = run(
      &mut session,
      Command::ClearCompleted
    )
    .unwrap();
    assert_eq!(
      out,
      "1 completed task cleared\n"
    );
  }
}
