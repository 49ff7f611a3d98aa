// Background check worker: runs the container check on a fixed interval and hands
// each message group to the sender task.

use crate::check::{ContainerCheck, group_count};
use crate::models::CollectorContainer;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, interval};
use tracing::Instrument;

/// Containers one host is sized for when buffering message groups.
pub const EXPECTED_MAX_CONTAINERS: usize = 1000;

/// Channel capacity holding two cycles of message groups at `max_per_message`
/// containers each (backpressure if the sender falls behind).
pub fn sender_channel_capacity(max_per_message: usize) -> usize {
    (group_count(EXPECTED_MAX_CONTAINERS, max_per_message) * 2).max(32)
}

/// Logs a failing cycle once per distinct error text, so a daemon that stays down
/// does not flood the log every interval.
#[derive(Debug, Default)]
pub struct ErrorLogLimiter {
    last: Option<String>,
}

impl ErrorLogLimiter {
    /// Returns true when `error` differs from the last logged error.
    pub fn should_log(&mut self, error: &str) -> bool {
        if self.last.as_deref() == Some(error) {
            return false;
        }
        self.last = Some(error.to_string());
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Check, output channel and shutdown for the worker.
pub struct WorkerDeps {
    pub check: ContainerCheck,
    pub tx: mpsc::Sender<CollectorContainer>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

pub struct WorkerConfig {
    pub check_interval_ms: u64,
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        mut check,
        tx,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig { check_interval_ms } = config;

    let worker_span = tracing::span!(
        tracing::Level::DEBUG,
        "worker",
        check = check.name(),
        check_interval_ms
    );

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_millis(check_interval_ms));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut errors = ErrorLogLimiter::default();
        let mut group_id: i32 = 0;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    group_id = group_id.wrapping_add(1);
                    let groups = match check.run(group_id).await {
                        Ok(groups) => {
                            errors.reset();
                            groups
                        }
                        Err(e) => {
                            let text = e.to_string();
                            if errors.should_log(&text) {
                                tracing::warn!(
                                    error = %text,
                                    operation = "container_check",
                                    "container check failed"
                                );
                            }
                            continue;
                        }
                    };
                    for group in groups {
                        if tx.send(group).await.is_err() {
                            tracing::debug!("Sender channel closed");
                            return;
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
            }
        }
    }
    .instrument(worker_span))
}
