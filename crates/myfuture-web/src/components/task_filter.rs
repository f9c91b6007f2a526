use myfuture_core::filter::{
  FilterMode,
  TaskCounts
};
use yew::{
  Callback,
  Html,
  MouseEvent,
  Properties,
  classes,
  function_component,
  html
};

#[derive(Properties, PartialEq)]
pub struct TaskFilterProps {
  pub current:  FilterMode,
  pub counts:   TaskCounts,
  pub on_change:
    Callback<FilterMode>,
  pub on_clear_completed:
    Callback<MouseEvent>
}

#[function_component(TaskFilter)]
pub fn task_filter(
  props: &TaskFilterProps
) -> Html {
  let make_tab = |mode: FilterMode| {
    let active = props.current == mode;
    let count = props.counts.count(mode);
    let on_change =
      props.on_change.clone();
    html! {
        <button
            class={classes!("tab", active.then_some("active"))}
            onclick={move |_| on_change.emit(mode)}
        >
            { mode.label() }
            {
                if count > 0 {
                    html! { <span class="badge">{ count.to_string() }</span> }
                } else {
                    html! {}
                }
            }
        </button>
    }
  };

  html! {
      <div class="task-filter">
          <div class="tabs">
              { for FilterMode::ALL.into_iter().map(make_tab) }
          </div>
          <button
              class="btn subtle"
              disabled={!props.counts.can_clear_completed()}
              onclick={props.on_clear_completed.clone()}
          >
              { "Clear completed" }
          </button>
      </div>
  }
}
