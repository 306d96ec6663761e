//! # Processing Loop
//!
//! Shared driver for the worker, reducer and request processor.
//!
//! Each iteration handles at most one item. A failed item is logged and the
//! loop carries on; nothing a single item does can stop it. Cancellation is
//! checked at the top of every iteration and interrupts backoff sleeps, but
//! never an item that is already being processed.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::backoff::{Backoff, LoopBackoff};
use crate::error::Result;

/// What one iteration found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// An item was handled and acknowledged
    Processed,
    /// Nothing was visible on the queue
    Empty,
}

/// One step of a consumer loop.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Poll for one item and handle it.
    ///
    /// An `Err` means the item was not acknowledged and will come back
    /// through the transport.
    async fn process_next(&self) -> Result<PollOutcome>;
}

/// Iteration counters returned when a loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub processed: u64,
    pub empty_polls: u64,
    pub failures: u64,
}

/// Run `processor` until `cancel` fires.
pub async fn run_until_cancelled<P>(
    processor: &P,
    cancel: &CancellationToken,
    backoff: LoopBackoff,
) -> LoopStats
where
    P: ItemProcessor + ?Sized,
{
    let name = processor.name();
    let mut idle = Backoff::new(backoff.idle);
    let mut failure = Backoff::new(backoff.failure);
    let mut stats = LoopStats::default();

    info!(processor = name, "Starting processing loop");

    while !cancel.is_cancelled() {
        let delay = match processor.process_next().await {
            Ok(PollOutcome::Processed) => {
                stats.processed += 1;
                idle.reset();
                failure.reset();
                Duration::ZERO
            }
            Ok(PollOutcome::Empty) => {
                stats.empty_polls += 1;
                failure.reset();
                idle.next_delay()
            }
            Err(e) => {
                stats.failures += 1;
                idle.reset();
                let delay = failure.next_delay();
                let backoff_ms = delay.as_millis() as u64;
                if e.is_retryable() {
                    warn!(processor = name, error = %e, backoff_ms, "Item failed, will be redelivered");
                } else {
                    error!(
                        processor = name,
                        error = %e,
                        backoff_ms,
                        "Item failed and cannot succeed as is, leaving it for redelivery"
                    );
                }
                delay
            }
        };

        if delay.is_zero() {
            tokio::task::yield_now().await;
            continue;
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {
                debug!(processor = name, "Cancelled during backoff");
                break;
            }
        }
    }

    info!(
        processor = name,
        processed = stats.processed,
        empty_polls = stats.empty_polls,
        failures = stats.failures,
        "Processing loop stopped"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeotallyError;
    use crate::processing::BackoffPolicy;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Replays a script of outcomes, cancelling once it runs out.
    struct Scripted {
        script: Mutex<VecDeque<Result<PollOutcome>>>,
        cancel: CancellationToken,
    }

    impl Scripted {
        fn new(script: Vec<Result<PollOutcome>>, cancel: CancellationToken) -> Self {
            Self {
                script: Mutex::new(script.into()),
                cancel,
            }
        }
    }

    #[async_trait]
    impl ItemProcessor for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn process_next(&self) -> Result<PollOutcome> {
            let next = self.script.lock().pop_front();
            match next {
                Some(outcome) => outcome,
                None => {
                    self.cancel.cancel();
                    Ok(PollOutcome::Empty)
                }
            }
        }
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_loop() {
        let cancel = CancellationToken::new();
        let processor = Scripted::new(
            vec![
                Err(GeotallyError::unknown_task("sum_likes")),
                Ok(PollOutcome::Processed),
                Err(GeotallyError::Update("conflict".to_string())),
                Ok(PollOutcome::Empty),
                Ok(PollOutcome::Processed),
            ],
            cancel.clone(),
        );

        let stats = run_until_cancelled(&processor, &cancel, LoopBackoff::immediate()).await;
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.failures, 2);
        // The trailing empty poll is the one that cancelled
        assert_eq!(stats.empty_polls, 2);
    }

    #[tokio::test]
    async fn test_precancelled_token_runs_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let processor = Scripted::new(vec![Ok(PollOutcome::Processed)], cancel.clone());

        let stats = run_until_cancelled(&processor, &cancel, LoopBackoff::immediate()).await;
        assert_eq!(stats, LoopStats::default());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_backoff_sleep() {
        struct AlwaysEmpty;

        #[async_trait]
        impl ItemProcessor for AlwaysEmpty {
            fn name(&self) -> &'static str {
                "always_empty"
            }
            async fn process_next(&self) -> Result<PollOutcome> {
                Ok(PollOutcome::Empty)
            }
        }

        let cancel = CancellationToken::new();
        let slow = LoopBackoff {
            idle: BackoffPolicy::new(Duration::from_secs(60), Duration::from_secs(60), 1.0),
            failure: BackoffPolicy::immediate(),
        };

        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            run_until_cancelled(&AlwaysEmpty, &token, slow).await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let stats = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop should stop promptly")
            .unwrap();
        assert_eq!(stats.empty_polls, 1);
    }

    #[tokio::test]
    async fn test_runs_as_trait_object() {
        let cancel = CancellationToken::new();
        let processor: Arc<dyn ItemProcessor> =
            Arc::new(Scripted::new(vec![Ok(PollOutcome::Processed)], cancel.clone()));

        let stats = run_until_cancelled(processor.as_ref(), &cancel, LoopBackoff::immediate()).await;
        assert_eq!(stats.processed, 1);
    }
}
