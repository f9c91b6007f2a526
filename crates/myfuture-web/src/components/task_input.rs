use chrono::{
  DateTime,
  Local,
  NaiveDateTime,
  TimeZone,
  Utc
};
use yew::{
  Callback,
  Html,
  Properties,
  SubmitEvent,
  TargetCast,
  function_component,
  html,
  use_state
};

/// Form payload for a new task.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
  pub title:    String,
  pub due_date: Option<DateTime<Utc>>
}

#[derive(Properties, PartialEq)]
pub struct TaskInputProps {
  pub on_add: Callback<NewTask>
}

#[function_component(TaskInput)]
pub fn task_input(
  props: &TaskInputProps
) -> Html {
  let title = use_state(String::new);
  let due = use_state(String::new);

  let on_title = {
    let title = title.clone();
    Callback::from(
      move |e: yew::InputEvent| {
        let input: web_sys::HtmlInputElement =
          e.target_unchecked_into();
        title.set(input.value());
      }
    )
  };

  let on_due = {
    let due = due.clone();
    Callback::from(
      move |e: yew::InputEvent| {
        let input: web_sys::HtmlInputElement =
          e.target_unchecked_into();
        due.set(input.value());
      }
    )
  };

  let on_submit = {
    let title = title.clone();
    let due = due.clone();
    let on_add = props.on_add.clone();
    Callback::from(
      move |e: SubmitEvent| {
        e.prevent_default();
        if title.trim().is_empty() {
          return;
        }
        on_add.emit(NewTask {
          title:    (*title).clone(),
          due_date: parse_local_input(
            &due
          )
        });
        title.set(String::new());
        due.set(String::new());
      }
    )
  };

  html! {
      <form class="task-input" onsubmit={on_submit}>
          <input
              type="text"
              class="title"
              placeholder="What do you need to do?"
              value={(*title).clone()}
              oninput={on_title}
          />
          <input
              type="datetime-local"
              class="due"
              value={(*due).clone()}
              oninput={on_due}
          />
          <button type="submit" class="btn" disabled={title.trim().is_empty()}>{ "Add" }</button>
      </form>
  }
}

/// Reads a `datetime-local` value as
/// local wall-clock time.
fn parse_local_input(
  raw: &str
) -> Option<DateTime<Utc>> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }
  let naive = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
    .iter()
    .find_map(|fmt| {
      NaiveDateTime::parse_from_str(
        trimmed, fmt
      )
      .ok()
    });
  let Some(naive) = naive else {
    tracing::warn!(
      input = trimmed,
      "ignoring unreadable due date"
    );
    return None;
  };
  Local
    .from_local_datetime(&naive)
    .earliest()
    .map(|dt| dt.with_timezone(&Utc))
}
