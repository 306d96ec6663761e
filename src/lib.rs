#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, GeoJSON in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Geotally
//!
//! Queue-driven scatter-gather engine for geospatial aggregate queries.
//!
//! ## Overview
//!
//! A request asks for an aggregate (today: a tweet count) over a rectangular
//! region. The region is decomposed into sub-areas, one task per sub-area is
//! put on a queue, independent workers compute each value, and reducers fold
//! the values back into a durable job record. Once every sub-area has
//! reported, the job is encoded as a styled GeoJSON feature collection.
//!
//! ## Architecture
//!
//! All coordination goes through three at-least-once queues and the job
//! store; no component shares memory with another:
//!
//! ```text
//! AnalyticsApi ─▶ RequestQueue ─▶ RequestProcessor ─▶ Orchestrator ─▶ TaskQueue
//!                                                                        │
//!  ResultHandle ◀─ JobStore ◀─ Reducer ◀─ ResultQueue ◀─ Worker ◀────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`regions`] / [`styles`] - pluggable decomposition and styling strategies
//! - [`registry`] - variant-tag reconstruction of stored strategies
//! - [`messaging`] - queue transports and typed work queues
//! - [`models`] / [`store`] - job aggregation and its record store
//! - [`source`] - the data workers aggregate over
//! - [`worker`] / [`orchestration`] / [`intake`] - the processes
//! - [`processing`] - shared cancellable poll loop with backoff
//! - [`config`] / [`logging`] / [`error`] - ambient plumbing
//!
//! ## Quick Start
//!
//! ```rust
//! use geotally::geo::CoordinateBox;
//! use geotally::messaging::{InMemoryMessagingService, TaskQueue};
//! use geotally::orchestration::Orchestrator;
//! use geotally::regions::SimpleGrid;
//! use geotally::store::InMemoryJobStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> geotally::Result<()> {
//! let service = Arc::new(InMemoryMessagingService::with_queues(&["geotally_tasks"]));
//! let tasks = Arc::new(TaskQueue::new(service, "geotally_tasks", Duration::from_secs(30)));
//! let orchestrator = Orchestrator::new(Arc::new(InMemoryJobStore::new()), tasks);
//!
//! let region = SimpleGrid::new(CoordinateBox::new(0.0, 0.0, 1.0, 1.0)?, 0.5)?;
//! let job_id = orchestrator.request_count_in_region(&region).await?;
//! # let _ = job_id;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod geo;
pub mod intake;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod processing;
pub mod regions;
pub mod registry;
pub mod source;
pub mod store;
pub mod styles;
pub mod worker;

pub use config::{ConfigManager, GeotallyConfig};
pub use error::{GeotallyError, Result};
pub use geo::{CoordinateBox, SubAreaResult};
pub use intake::{AnalyticsApi, RequestProcessor};
pub use models::{Job, JobRecord};
pub use orchestration::{Orchestrator, Reducer, ResultHandle};
pub use processing::{run_until_cancelled, ItemProcessor, LoopBackoff, LoopStats, PollOutcome};
pub use regions::{RegionRegistry, RegionStrategy, SimpleGrid};
pub use styles::{ColorSwatch, HeatMapStyle, StyleRegistry, StyleStrategy};
pub use worker::{TaskHandler, TaskHandlerRegistry, Worker};
