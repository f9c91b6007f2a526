use chrono::{
  DateTime,
  Duration,
  Local,
  Utc
};
use myfuture_core::{
  Task,
  TaskId,
  TaskStatus
};
use yew::{
  Callback,
  Event,
  Html,
  Properties,
  TargetCast,
  classes,
  function_component,
  html
};

#[derive(Properties, PartialEq)]
pub struct TaskItemProps {
  pub task:        Task,
  pub now:         DateTime<Utc>,
  pub due_soon:    Duration,
  pub on_toggle:   Callback<TaskId>,
  pub on_status:
    Callback<(TaskId, TaskStatus)>,
  pub on_comments:
    Callback<(TaskId, String)>,
  pub on_delete:   Callback<TaskId>
}

#[function_component(TaskItem)]
pub fn task_item(
  props: &TaskItemProps
) -> Html {
  let task = &props.task;
  let completed = task.is_completed();
  let overdue = task.is_overdue(props.now);
  let due_soon = task
    .is_due_soon(props.now, props.due_soon);

  let on_toggle = {
    let id = task.id.clone();
    let on_toggle =
      props.on_toggle.clone();
    move |_: yew::MouseEvent| {
      on_toggle.emit(id.clone())
    }
  };

  let on_status = {
    let id = task.id.clone();
    let on_status =
      props.on_status.clone();
    move |e: Event| {
      let select: web_sys::HtmlSelectElement =
        e.target_unchecked_into();
      match select
        .value()
        .parse::<TaskStatus>()
      {
        | Ok(status) => on_status
          .emit((id.clone(), status)),
        | Err(err) => tracing::warn!(
          error = %err,
          "ignoring unknown status choice"
        )
      }
    }
  };

  let on_comments = {
    let id = task.id.clone();
    let on_comments =
      props.on_comments.clone();
    let current = task.comments.clone();
    move |e: Event| {
      let area: web_sys::HtmlTextAreaElement =
        e.target_unchecked_into();
      let text = area.value();
      if text != current {
        on_comments
          .emit((id.clone(), text));
      }
    }
  };

  let on_delete = {
    let id = task.id.clone();
    let on_delete =
      props.on_delete.clone();
    move |_: yew::MouseEvent| {
      on_delete.emit(id.clone())
    }
  };

  let due = task.due_date.map(|due| {
    due
      .with_timezone(&Local)
      .format("%b %-d, %Y %H:%M")
      .to_string()
  });

  html! {
      <li class={classes!(
          "task-item",
          completed.then_some("completed"),
          due_soon.then_some("due-soon"),
          overdue.then_some("overdue")
      )}>
          <input type="checkbox" checked={completed} onclick={on_toggle} />
          <div class="body">
              <div class="title">{ &task.title }</div>
              {
                  match due {
                      Some(due) => html! {
                          <div class="due">
                              { format!("Due {due}") }
                              { if overdue { " (overdue)" } else if due_soon { " (soon)" } else { "" } }
                          </div>
                      },
                      None => html! {},
                  }
              }
              <select class="status" onchange={on_status}>
                  {
                      for TaskStatus::ALL.into_iter().map(|status| html! {
                          <option value={status.as_str()} selected={status == task.status}>
                              { status.label() }
                          </option>
                      })
                  }
              </select>
              <textarea
                  class="comments"
                  placeholder="Comments"
                  value={task.comments.clone()}
                  onchange={on_comments}
              />
          </div>
          <button class="btn danger" onclick={on_delete}>{ "Delete" }</button>
      </li>
  }
}
