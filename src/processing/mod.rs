//! # Processing
//!
//! Cooperative poll loops with bounded backoff and item-level fault
//! isolation.

pub mod backoff;
pub mod run_loop;

pub use backoff::{Backoff, BackoffPolicy, LoopBackoff};
pub use run_loop::{run_until_cancelled, ItemProcessor, LoopStats, PollOutcome};
