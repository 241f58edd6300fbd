//! Workflow execution.
//!
//! [`WorkflowEngine::execute`] runs a workflow's tasks strictly in order,
//! resolving each task's parameters against the results of earlier tasks,
//! and reports how the run ended as a [`RunOutcome`].

mod context;
mod executor;
mod observer;
mod outcome;

pub use context::{CancelHandle, RunContext};
pub use executor::WorkflowEngine;
pub use observer::{
    ChannelObserver, RunEvent, RunEventReceiver, RunEventSender, RunObserver, TracingObserver,
};
pub use outcome::RunOutcome;
