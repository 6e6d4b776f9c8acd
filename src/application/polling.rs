//! Bounded waiting and cancellable periodic work.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use uuid::Uuid;

use super::order_service::OrderService;
use crate::domain::tracking::TrackingStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("{what} was not ready after {timeout:?}")]
    TimedOut { what: String, timeout: Duration },
}

/// Runs `probe` every `policy.interval` until it returns true or
/// `policy.timeout` has elapsed.
pub async fn poll_until<F, Fut>(what: &str, policy: PollPolicy, mut probe: F) -> Result<(), PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + policy.timeout;
    loop {
        if probe().await {
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(PollError::TimedOut {
                what: what.to_string(),
                timeout: policy.timeout,
            });
        }
        log::debug!("{what} not ready, retrying");
        time::sleep(policy.interval.min(deadline - now)).await;
    }
}

/// A tokio task calling `tick` at a fixed period until the tick breaks, the
/// task is stopped, or the handle is dropped.
pub struct PeriodicTask {
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    pub fn spawn<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let (stop, mut stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = interval.tick() => {
                        if tick().await.is_break() {
                            break;
                        }
                    }
                }
            }
        });
        Self {
            stop: Some(stop),
            handle,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signals the task and waits for the tick in progress to finish.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = (&mut self.handle).await;
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Re-derives an order's tracking status on a timer and publishes changes.
///
/// Stops by itself once the order is delivered. Dropping the watcher aborts
/// the refresh task.
pub struct TrackingWatcher {
    task: PeriodicTask,
    updates: watch::Receiver<TrackingStatus>,
}

impl TrackingWatcher {
    pub fn spawn(
        orders: OrderService,
        order_id: Uuid,
        initial: TrackingStatus,
        period: Duration,
    ) -> Self {
        let (publish, updates) = watch::channel(initial);
        let publish = Arc::new(publish);
        let task = PeriodicTask::spawn(period, move || {
            let orders = orders.clone();
            let publish = publish.clone();
            async move {
                match orders.current_tracking(order_id).await {
                    Ok(status) => {
                        publish.send_if_modified(|current| {
                            let changed = *current != status;
                            *current = status;
                            changed
                        });
                        if status == TrackingStatus::Entregue {
                            ControlFlow::Break(())
                        } else {
                            ControlFlow::Continue(())
                        }
                    }
                    Err(e) => {
                        log::warn!("Tracking refresh for order {order_id} failed: {e}");
                        ControlFlow::Continue(())
                    }
                }
            }
        });
        Self { task, updates }
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackingStatus> {
        self.updates.clone()
    }

    pub fn current(&self) -> TrackingStatus {
        *self.updates.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn stop(self) {
        self.task.stop().await;
    }
}
