//! # Orchestration
//!
//! Scatter-gather core for region aggregates.
//!
//! ## Core Components
//!
//! - **Orchestrator**: decomposes a region, creates its job, enqueues one
//!   task per sub-area
//! - **Reducer**: folds results from the result queue into their jobs
//! - **ResultHandle**: reads a job back and encodes it once finished
//!
//! Orchestrators and reducers share no in-process state. Everything they
//! coordinate on goes through the queues and the job store, so any number
//! of each can run side by side.

pub mod orchestrator;
pub mod reducer;
pub mod result_handle;

pub use orchestrator::Orchestrator;
pub use reducer::Reducer;
pub use result_handle::{ResultHandle, DEFAULT_POLL_INTERVAL};
