//! # Worker
//!
//! Turns tasks into results. Workers share nothing in-process; run as many
//! as the task queue needs.

pub mod task_handler;
#[allow(clippy::module_inception)]
pub mod worker;

pub use task_handler::{CountTweetsHandler, TaskHandler, TaskHandlerRegistry};
pub use worker::Worker;
