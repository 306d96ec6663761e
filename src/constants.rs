//! # System Constants
//!
//! Task tags, strategy variant names and default queue names shared across
//! the orchestrator, worker and reducer.

/// Task tags understood by the worker pool.
pub mod tasks {
    /// Count tweets whose coordinates fall inside a sub-area.
    pub const COUNT_TWEETS: &str = "count_tweets";
}

/// Variant tags written into serialized strategy records.
pub mod variants {
    /// Key holding the variant tag in every tagged record.
    pub const VARIANT_KEY: &str = "variant";

    pub const SIMPLE_GRID: &str = "simple_grid";
    pub const HEAT_MAP: &str = "heat_map";
    pub const COLOR_SWATCH: &str = "color_swatch";
}

/// Default queue names.
pub mod queues {
    pub const TASK_QUEUE: &str = "geotally_tasks";
    pub const RESULT_QUEUE: &str = "geotally_results";
    pub const REQUEST_QUEUE: &str = "geotally_requests";
}

/// Subtask names recorded in a job's run times.
pub mod run_times {
    pub const DECOMPOSE: &str = "decompose";
}

/// Bounds on caller-supplied shapes.
pub mod limits {
    /// Most cells a single grid may decompose into. Every cell becomes one
    /// task message and one stored result.
    pub const MAX_GRID_CELLS: usize = 1_000_000;
}
