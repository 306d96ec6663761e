#![allow(dead_code)]

pub mod strategies;

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use geotally::geo::CoordinateBox;
use geotally::intake::{AnalyticsApi, RequestProcessor};
use geotally::messaging::{InMemoryMessagingService, RequestQueue, ResultQueue, TaskQueue};
use geotally::orchestration::{Orchestrator, Reducer};
use geotally::processing::{ItemProcessor, PollOutcome};
use geotally::source::{InMemoryTweetSource, Tweet};
use geotally::store::InMemoryJobStore;
use geotally::styles::{ColorSwatch, HeatMapStyle, StyleStrategy};
use geotally::worker::{TaskHandlerRegistry, Worker};

pub const TASKS: &str = "geotally_tasks";
pub const RESULTS: &str = "geotally_results";
pub const REQUESTS: &str = "geotally_requests";

/// Every component wired over in-memory backends.
pub struct Cluster {
    pub service: Arc<InMemoryMessagingService>,
    pub store: Arc<InMemoryJobStore>,
    pub source: Arc<InMemoryTweetSource>,
    pub tasks: Arc<TaskQueue>,
    pub results: Arc<ResultQueue>,
    pub requests: Arc<RequestQueue>,
    pub orchestrator: Arc<Orchestrator>,
    pub worker: Arc<Worker>,
    pub reducer: Arc<Reducer>,
    pub request_processor: Arc<RequestProcessor>,
    pub api: AnalyticsApi,
}

impl Cluster {
    /// Zero visibility timeout: a released item is visible again at once
    pub fn new() -> Self {
        Self::with_visibility_timeout(Duration::ZERO)
    }

    pub fn with_visibility_timeout(visibility_timeout: Duration) -> Self {
        let service = Arc::new(InMemoryMessagingService::with_queues(&[
            TASKS, RESULTS, REQUESTS,
        ]));
        let store = Arc::new(InMemoryJobStore::new());
        let source = Arc::new(InMemoryTweetSource::new());

        let tasks = Arc::new(TaskQueue::new(service.clone(), TASKS, visibility_timeout));
        let results = Arc::new(ResultQueue::new(service.clone(), RESULTS, visibility_timeout));
        let requests = Arc::new(RequestQueue::new(service.clone(), REQUESTS, visibility_timeout));

        let orchestrator = Arc::new(Orchestrator::new(store.clone(), tasks.clone()));
        let worker = Arc::new(Worker::new(
            tasks.clone(),
            results.clone(),
            TaskHandlerRegistry::with_defaults(source.clone()),
        ));
        let reducer = Arc::new(Reducer::new(results.clone(), store.clone()));
        let request_processor = Arc::new(RequestProcessor::new(
            requests.clone(),
            store.clone(),
            orchestrator.clone(),
        ));
        let api = AnalyticsApi::new(requests.clone(), store.clone())
            .with_result_poll_interval(Duration::from_millis(10));

        Self {
            service,
            store,
            source,
            tasks,
            results,
            requests,
            orchestrator,
            worker,
            reducer,
            request_processor,
            api,
        }
    }

    /// Add a tweet at `(lat, lon)`, timestamped now
    pub fn tweet(&self, id: &str, lat: f64, lon: f64) {
        self.source
            .add(Tweet::new(id, lat, lon, Utc::now()).expect("valid tweet"));
    }

    /// Run `processor` until its queue is empty, returning how many items it
    /// handled
    pub async fn drain(processor: &dyn ItemProcessor) -> usize {
        let mut handled = 0;
        while processor.process_next().await.expect("item should succeed") == PollOutcome::Processed {
            handled += 1;
        }
        handled
    }
}

pub fn unit_box() -> CoordinateBox {
    CoordinateBox::new(0.0, 0.0, 1.0, 1.0).expect("valid box")
}

pub fn heat_map() -> Box<dyn StyleStrategy> {
    let swatch = ColorSwatch::new(["#ffffb2", "#fecc5c", "#fd8d3c", "#f03b20", "#bd0026"])
        .expect("valid swatch");
    Box::new(HeatMapStyle::new(swatch))
}
