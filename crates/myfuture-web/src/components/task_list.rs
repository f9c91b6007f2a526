use chrono::{
  DateTime,
  Duration,
  Utc
};
use myfuture_core::filter::{
  FilterMode,
  empty_message
};
use myfuture_core::{
  Task,
  TaskId,
  TaskStatus
};
use yew::{
  Callback,
  Html,
  Properties,
  function_component,
  html
};

use super::TaskItem;

#[derive(Properties, PartialEq)]
pub struct TaskListProps {
  /// Already filtered, in store order.
  pub tasks:       Vec<Task>,
  pub total:       usize,
  pub mode:        FilterMode,
  pub now:         DateTime<Utc>,
  pub due_soon:    Duration,
  pub on_toggle:   Callback<TaskId>,
  pub on_status:
    Callback<(TaskId, TaskStatus)>,
  pub on_comments:
    Callback<(TaskId, String)>,
  pub on_delete:   Callback<TaskId>
}

#[function_component(TaskList)]
pub fn task_list(
  props: &TaskListProps
) -> Html {
  if let Some(message) = empty_message(
    props.total,
    props.tasks.len(),
    props.mode
  ) {
    return html! {
        <p class="empty">{ message }</p>
    };
  }

  html! {
      <ul class="task-list">
          {
              for props.tasks.iter().cloned().map(|task| {
                  let key = task.id.to_string();
                  html! {
                  <TaskItem
                      key={key}
                      task={task}
                      now={props.now}
                      due_soon={props.due_soon}
                      on_toggle={props.on_toggle.clone()}
                      on_status={props.on_status.clone()}
                      on_comments={props.on_comments.clone()}
                      on_delete={props.on_delete.clone()}
                  />
                  }
              })
          }
      </ul>
  }
}
