//! Task and workflow data model.

mod results;
mod status;
mod task;
mod workflow;

pub use results::ResultStore;
pub use status::RunStatus;
pub use task::Task;
pub use workflow::{Workflow, CANCELLED_MARKER};
