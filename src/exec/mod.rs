// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] provides the `TaskEngine` trait the runtime talks to, and
//!   the production `ProcessEngine`. Tests replace it with a fake engine.
//! - [`task_runner`] runs one target's tasks, in order, as shell commands
//!   and reports the outcome back as `RuntimeEvent::RunFinished`.

pub mod backend;
pub mod task_runner;

pub use backend::{ProcessEngine, TaskEngine};
