use std::cell::RefCell;
use std::rc::Rc;

use chrono::Utc;
use gloo::timers::callback::{
  Interval,
  Timeout
};
use myfuture_core::datetime::due_soon_window;
use myfuture_core::filter::{
  FilterMode,
  TaskCounts
};
use myfuture_core::reminder::{
  NotificationPermission,
  ReminderScheduler
};
use myfuture_core::{
  Outcome,
  Session,
  Task,
  TaskId,
  TaskStatus
};
use yew::{
  Callback,
  Html,
  MouseEvent,
  UseStateHandle,
  function_component,
  html,
  use_effect_with,
  use_mut_ref,
  use_state
};

use crate::components::{
  NewTask,
  TaskFilter,
  TaskInput,
  TaskList
};
use crate::notify::{
  self,
  BrowserDriver
};
use crate::storage::LocalStorage;

const FEEDBACK_MS: u32 = 3_000;
const CLOCK_TICK_MS: u32 = 60_000;
const SAVE_FAILED: &str =
  "Could not save your tasks";

type SharedSession =
  Rc<RefCell<Session<LocalStorage>>>;

#[function_component(App)]
pub fn app() -> Html {
  let session = use_mut_ref(|| {
    Session::open(LocalStorage::open())
  });
  let tasks = {
    let session = session.clone();
    use_state(move || {
      session.borrow().tasks().to_vec()
    })
  };
  let filter =
    use_state(FilterMode::default);
  let permission =
    use_state(notify::browser_permission);
  let feedback =
    use_state(|| None::<String>);
  let now = use_state(Utc::now);
  let reminders = use_mut_ref(|| {
    ReminderScheduler::new(BrowserDriver)
  });

  {
    let permission = permission.clone();
    use_effect_with((), move |_| {
      notify::request_permission(
        Callback::from(
          move |answer| {
            permission.set(answer)
          }
        )
      );
      || ()
    });
  }

  {
    let now = now.clone();
    use_effect_with((), move |_| {
      let clock =
        Interval::new(CLOCK_TICK_MS, move || {
          now.set(Utc::now())
        });
      move || drop(clock)
    });
  }

  {
    let reminders = reminders.clone();
    use_effect_with(
      ((*tasks).clone(), *permission),
      move |(tasks, permission)| {
        let mut reminders =
          reminders.borrow_mut();
        reminders
          .set_permission(*permission);
        let armed = reminders
          .sync(tasks, Utc::now());
        tracing::debug!(
          armed,
          pending = reminders.pending(),
          "reminders synced"
        );
        || ()
      }
    );
  }

  {
    let feedback_handle =
      feedback.clone();
    use_effect_with(
      (*feedback).clone(),
      move |current| {
        let dismiss =
          current.as_ref().map(|_| {
            Timeout::new(
              FEEDBACK_MS,
              move || {
                feedback_handle.set(None)
              }
            )
          });
        move || drop(dismiss)
      }
    );
  }

  let on_add = {
    let ctx = Ctx::new(
      &session, &tasks, &feedback
    );
    Callback::from(
      move |new: NewTask| {
        ctx.apply(|session| {
          session.add(
            &new.title,
            new.due_date,
            Utc::now()
          )
        })
      }
    )
  };

  let on_toggle = {
    let ctx = Ctx::new(
      &session, &tasks, &feedback
    );
    Callback::from(move |id: TaskId| {
      ctx.apply(|session| {
        session.toggle_complete(&id)
      })
    })
  };

  let on_status = {
    let ctx = Ctx::new(
      &session, &tasks, &feedback
    );
    Callback::from(
      move |(id, status): (
        TaskId,
        TaskStatus
      )| {
        ctx.apply(|session| {
          session.set_status(&id, status)
        })
      }
    )
  };

  let on_comments = {
    let ctx = Ctx::new(
      &session, &tasks, &feedback
    );
    Callback::from(
      move |(id, text): (
        TaskId,
        String
      )| {
        ctx.apply(|session| {
          session.set_comments(&id, &text)
        })
      }
    )
  };

  let on_delete = {
    let ctx = Ctx::new(
      &session, &tasks, &feedback
    );
    Callback::from(move |id: TaskId| {
      ctx.apply(|session| {
        session.remove(&id)
      })
    })
  };

  let on_clear_completed = {
    let ctx = Ctx::new(
      &session, &tasks, &feedback
    );
    Callback::from(
      move |_: MouseEvent| {
        ctx.apply(|session| {
          session.clear_completed()
        })
      }
    )
  };

  let on_filter = {
    let filter = filter.clone();
    Callback::from(
      move |mode: FilterMode| {
        filter.set(mode)
      }
    )
  };

  let counts =
    TaskCounts::from_tasks(&tasks);
  let visible: Vec<Task> =
    myfuture_core::filter::project(
      &tasks, *filter
    )
    .into_iter()
    .cloned()
    .collect();

  html! {
      <main class="app">
          <header>
              <h1>{ "My Future" }</h1>
              <p class="subtitle">{ "Plan today, get reminded on time." }</p>
              {
                  if *permission == NotificationPermission::Granted {
                      html! {}
                  } else {
                      html! { <p class="permission">{ permission.as_label() }</p> }
                  }
              }
          </header>
          <TaskInput on_add={on_add} />
          <TaskFilter
              current={*filter}
              counts={counts}
              on_change={on_filter}
              on_clear_completed={on_clear_completed}
          />
          <TaskList
              tasks={visible}
              total={tasks.len()}
              mode={*filter}
              now={*now}
              due_soon={due_soon_window()}
              on_toggle={on_toggle}
              on_status={on_status}
              on_comments={on_comments}
              on_delete={on_delete}
          />
          {
              match &*feedback {
                  Some(line) => html! { <div class="feedback" role="status">{ line.clone() }</div> },
                  None => html! {},
              }
          }
      </main>
  }
}

/// What every task callback needs:
/// the session to mutate and the state
/// handles to refresh afterwards.
#[derive(Clone)]
struct Ctx {
  session:  SharedSession,
  tasks:    UseStateHandle<Vec<Task>>,
  feedback: UseStateHandle<Option<String>>
}

impl Ctx {
  fn new(
    session: &SharedSession,
    tasks: &UseStateHandle<Vec<Task>>,
    feedback: &UseStateHandle<
      Option<String>
    >
  ) -> Self {
    Self {
      session:  session.clone(),
      tasks:    tasks.clone(),
      feedback: feedback.clone()
    }
  }

  fn apply(
    &self,
    action: impl FnOnce(
      &mut Session<LocalStorage>
    ) -> anyhow::Result<Outcome>
  ) {
    let result =
      action(&mut self.session.borrow_mut());

    // the in-memory list changed even
    // when the write failed
    self.tasks.set(
      self.session.borrow().tasks().to_vec()
    );

    match result {
      | Ok(outcome) => {
        if let Some(line) =
          outcome.feedback
        {
          self.feedback.set(Some(line));
        }
      }
      | Err(err) => {
        tracing::error!(
          error = %format!("{err:#}"),
          "task update failed"
        );
        self.feedback.set(Some(
          SAVE_FAILED.to_string()
        ));
      }
    }
  }
}
