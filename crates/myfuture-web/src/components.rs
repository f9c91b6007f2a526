mod task_filter;
mod task_input;
mod task_item;
mod task_list;

pub use task_filter::TaskFilter;
pub use task_input::{
  NewTask,
  TaskInput
};
pub use task_item::TaskItem;
pub use task_list::TaskList;
