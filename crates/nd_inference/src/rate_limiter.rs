//! Single-lane throttling for calls to the text generation API.
//!
//! Work submitted through [`RateLimiter::execute`] is queued on a channel owned by
//! one dispatcher task. The dispatcher runs one job at a time, in submission order,
//! and waits `ceil(60000 / requests_per_minute)` milliseconds after each job settles
//! before starting the next one.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use nd_core::{Error, Result};
use tokio::sync::{mpsc, oneshot};

type Job = BoxFuture<'static, ()>;

/// Spacing between dispatches for the given throughput. Values below 1 are treated as 1.
pub fn dispatch_interval(requests_per_minute: u32) -> Duration {
    let requests_per_minute = u64::from(requests_per_minute.max(1));
    Duration::from_millis(60_000u64.div_ceil(requests_per_minute))
}

/// Handle to a dispatcher task. Cloning shares the same queue; the dispatcher
/// stops once every handle has been dropped.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    queue: mpsc::UnboundedSender<Job>,
    task_timeout: Option<Duration>,
}

impl RateLimiter {
    /// Must be called from within a Tokio runtime.
    pub fn new(requests_per_minute: u32) -> Self {
        Self::with_timeout(requests_per_minute, None)
    }

    /// Like [`RateLimiter::new`], failing any task that runs longer than `task_timeout`
    /// with [`Error::Timeout`].
    pub fn with_timeout(requests_per_minute: u32, task_timeout: Option<Duration>) -> Self {
        let interval = dispatch_interval(requests_per_minute);
        let (queue, jobs) = mpsc::unbounded_channel();
        tokio::spawn(dispatch(jobs, interval));
        tracing::debug!("Rate limiter started with {:?} between requests", interval);
        Self { queue, task_timeout }
    }

    /// Queues `task` and resolves with its outcome once the dispatcher has run it.
    ///
    /// A failing task only affects its own caller.
    pub async fn execute<F, Fut, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, outcome) = oneshot::channel();
        let task_timeout = self.task_timeout;

        let job = async move {
            let result = match task_timeout {
                Some(limit) => match tokio::time::timeout(limit, task()).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!("Rate limited task timed out after {:?}", limit);
                        Err(Error::Timeout(limit))
                    }
                },
                None => task().await,
            };
            // The caller may have stopped waiting.
            let _ = reply.send(result);
        }
        .boxed();

        self.queue
            .send(job)
            .map_err(|_| Error::Inference("Rate limiter is shut down".to_string()))?;

        outcome
            .await
            .map_err(|_| Error::Inference("Rate limited task was aborted".to_string()))?
    }
}

async fn dispatch(mut jobs: mpsc::UnboundedReceiver<Job>, interval: Duration) {
    while let Some(job) = jobs.recv().await {
        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            tracing::error!("Rate limited task panicked");
        }
        tokio::time::sleep(interval).await;
    }
    tracing::debug!("Rate limiter queue closed");
}
