//! Periodic backend health polling.
//!
//! The monitor runs at most one health check at a time. Polling happens in a
//! single background task, so checks never overlap and missed beats are
//! skipped rather than queued. Stopping the schedule lets a check that is
//! already running finish and record its result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::ports::PocketBaseApi;
use super::{BackendHandle, HealthStatus, Observable, Subscription, UnhealthyBackend};

/// Default delay between scheduled checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(15_000);

/// Default bound on a single health check.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_millis(4_000);

/// Result of requesting a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The check ran and recorded this status.
    Completed(HealthStatus),
    /// Another check was running; nothing was sent.
    AlreadyInFlight,
}

struct PollingTask {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

struct Inner {
    api: Arc<dyn PocketBaseApi>,
    timeout: Duration,
    status: Observable<Option<HealthStatus>>,
    in_flight: AtomicBool,
    verbose: AtomicBool,
    polling: Mutex<Option<PollingTask>>,
}

/// Resets the in-flight flag even when the tick future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Health monitor for the shared backend.
///
/// Clones share one status cell and one polling schedule.
#[derive(Clone)]
pub struct HealthMonitor {
    inner: Arc<Inner>,
}

impl HealthMonitor {
    /// Create a monitor with the default check timeout.
    pub fn new(backend: &BackendHandle) -> Self {
        Self::with_timeout(backend, DEFAULT_CHECK_TIMEOUT)
    }

    /// Create a monitor bounding each check by `timeout`.
    pub fn with_timeout(backend: &BackendHandle, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                api: Arc::clone(backend.api()),
                timeout,
                status: Observable::new(None),
                in_flight: AtomicBool::new(false),
                verbose: AtomicBool::new(false),
                polling: Mutex::new(None),
            }),
        }
    }

    /// Last recorded status; `None` before the first check completes.
    pub fn status(&self) -> Option<HealthStatus> {
        self.inner.status.get()
    }

    /// Whether the last recorded status is healthy.
    pub fn is_online(&self) -> bool {
        self.inner
            .status
            .with(|status| status.as_ref().is_some_and(HealthStatus::is_healthy))
    }

    /// Observe the status, starting with the current value.
    pub fn subscribe(
        &self,
        observer: impl Fn(Option<&HealthStatus>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner
            .status
            .subscribe(move |status| observer(status.as_ref()))
    }

    /// Run one health check now. Never fails: failures become
    /// [`HealthStatus::Unhealthy`].
    pub async fn tick(&self) -> TickOutcome {
        self.inner.tick().await
    }

    /// Start polling: one check immediately, then one per `interval`.
    ///
    /// Calling this while polling is active does nothing, including to the
    /// verbosity. A zero `interval` is rejected. Must run inside a Tokio
    /// runtime. Rejected calls are logged and ignored.
    pub fn start_polling(&self, interval: Duration, verbose: bool) {
        if interval.is_zero() {
            error!("health polling interval must be greater than zero");
            return;
        }
        let mut polling = self.inner.polling();
        if polling.as_ref().is_some_and(|p| !p.task.is_finished()) {
            return;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                error!(error = %err, "health polling requires a Tokio runtime");
                return;
            }
        };
        self.inner.verbose.store(verbose, Ordering::Relaxed);
        let (stop, stopped) = watch::channel(false);
        let task = runtime.spawn(poll(Arc::clone(&self.inner), interval, stopped));
        *polling = Some(PollingTask { stop, task });
        info!(interval_ms = interval.as_millis(), verbose, "health polling started");
    }

    /// Stop the schedule. Idempotent; safe without a prior start.
    pub fn stop_polling(&self) {
        if let Some(polling) = self.inner.polling().take() {
            // A closed channel means the task already exited.
            let _ = polling.stop.send(true);
            info!("health polling stopped");
        }
    }

    /// Whether a polling schedule is active.
    pub fn is_polling(&self) -> bool {
        self.inner
            .polling()
            .as_ref()
            .is_some_and(|p| !p.task.is_finished())
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("status", &self.status())
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

async fn poll(inner: Arc<Inner>, interval: Duration, mut stopped: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            biased;
            _ = stopped.changed() => break,
            _ = ticker.tick() => {}
        }
        if *stopped.borrow() {
            break;
        }
        inner.tick().await;
    }
    debug!("health polling task exited");
}

impl Inner {
    fn polling(&self) -> MutexGuard<'_, Option<PollingTask>> {
        self.polling.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn tick(&self) -> TickOutcome {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("health check already in flight");
            return TickOutcome::AlreadyInFlight;
        }
        let _in_flight = InFlight(&self.in_flight);
        let status = self.check().await;
        self.record(&status);
        TickOutcome::Completed(status)
    }

    async fn check(&self) -> HealthStatus {
        let url = self.api.base_url();
        match tokio::time::timeout(self.timeout, self.api.check_health()).await {
            Ok(Ok(body)) if body.is_healthy() => HealthStatus::Healthy,
            Ok(Ok(body)) => HealthStatus::Unhealthy(UnhealthyBackend::synthetic(
                url,
                format!("health check reported code {}: {}", body.code, body.message),
            )),
            Ok(Err(failure)) => HealthStatus::Unhealthy(UnhealthyBackend::from_response(&failure)),
            Err(_) => HealthStatus::Unhealthy(UnhealthyBackend::synthetic(
                url,
                format!(
                    "health check timed out after {} ms",
                    self.timeout.as_millis()
                ),
            )),
        }
    }

    fn record(&self, status: &HealthStatus) {
        let previous = self
            .status
            .with(|current| current.as_ref().map(HealthStatus::is_healthy));
        self.status.set(Some(status.clone()));

        if self.verbose.load(Ordering::Relaxed) {
            match status {
                HealthStatus::Healthy => debug!("backend healthy"),
                HealthStatus::Unhealthy(details) => error!(
                    status = details.status(),
                    url = details.url(),
                    reason = details.reason(),
                    "backend unhealthy"
                ),
            }
        }
        match (previous, status) {
            (Some(true), HealthStatus::Healthy) => {}
            (Some(false), HealthStatus::Unhealthy(_)) => {}
            (_, HealthStatus::Healthy) => info!("backend is online"),
            (_, HealthStatus::Unhealthy(details)) => warn!(error = %details, "backend is offline"),
        }
    }
}

#[cfg(test)]
mod tests;
