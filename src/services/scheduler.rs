// src/services/scheduler.rs
//
// Per-environment recurring check driver. Each monitored environment
// gets one cancellable ticker task; a failing tick is logged and the
// ticker keeps going. Cancellation is observed between ticks, so an
// in-flight check always runs to completion.

use crate::utils::PulseResult;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

struct MonitorHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

#[derive(Default)]
pub struct MonitoringScheduler {
    monitors: Arc<RwLock<HashMap<String, MonitorHandle>>>,
}

impl MonitoringScheduler {
    pub fn new() -> Self {
        Self {
            monitors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Arms the recurring check for an environment. The first tick
    /// fires immediately, then every `interval`. Calling this again for
    /// the same id re-arms the monitor instead of stacking timers.
    pub async fn start<F, Fut>(&self, environment_id: &str, interval: Duration, tick: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PulseResult<()>> + Send,
    {
        let (cancel, mut cancelled) = watch::channel(false);
        let id = environment_id.to_string();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.changed() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = tick().await {
                            log::warn!("scheduled health check for '{}' failed: {}", id, err);
                        }
                    }
                }
            }
            log::debug!("monitor ticker stopped");
        });

        let mut monitors = self.monitors.write().await;
        if let Some(previous) = monitors.insert(
            environment_id.to_string(),
            MonitorHandle { cancel, task },
        ) {
            let _ = previous.cancel.send(true);
        }
    }

    /// Stops the environment's monitor and waits for its ticker task to
    /// wind down (an in-flight check finishes first). Returns whether a
    /// monitor was running.
    pub async fn stop(&self, environment_id: &str) -> bool {
        let handle = {
            let mut monitors = self.monitors.write().await;
            monitors.remove(environment_id)
        };
        match handle {
            Some(handle) => {
                let _ = handle.cancel.send(true);
                let _ = handle.task.await;
                true
            }
            None => false,
        }
    }

    pub async fn stop_all(&self) {
        let handles: Vec<MonitorHandle> = {
            let mut monitors = self.monitors.write().await;
            monitors.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            let _ = handle.cancel.send(true);
            let _ = handle.task.await;
        }
    }

    pub async fn is_running(&self, environment_id: &str) -> bool {
        self.monitors.read().await.contains_key(environment_id)
    }

    pub async fn active_count(&self) -> usize {
        self.monitors.read().await.len()
    }
}
