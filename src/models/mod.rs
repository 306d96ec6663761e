//! # Data Models
//!
//! Records persisted through the [`JobStore`](crate::store::JobStore).

pub mod job;

pub use job::{Job, JobRecord};
