//! Tests for health polling and tick classification.

use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;

use async_trait::async_trait;
use rstest::rstest;

use super::*;
use crate::domain::health::SYNTHETIC_FAILURE_STATUS;
use crate::domain::ports::{ClientResponseError, HealthCheckResponse};
use crate::domain::{AuthSession, Credentials, SignUpCredentials, UserRecord};

const BASE_URL: &str = "http://pb.test";

/// Health endpoint double with a scripted reply and an optional delay.
struct ScriptedHealth {
    reply: Result<HealthCheckResponse, ClientResponseError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedHealth {
    fn replying(reply: Result<HealthCheckResponse, ClientResponseError>) -> Self {
        Self {
            reply,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn healthy() -> Self {
        Self::replying(Ok(HealthCheckResponse {
            code: 200,
            message: "API is healthy.".to_owned(),
        }))
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn unused() -> ClientResponseError {
    ClientResponseError::new(BASE_URL, 501).with_message("not scripted")
}

#[async_trait]
impl PocketBaseApi for ScriptedHealth {
    fn base_url(&self) -> String {
        BASE_URL.to_owned()
    }

    async fn create_account(
        &self,
        _account: &SignUpCredentials,
    ) -> Result<UserRecord, ClientResponseError> {
        Err(unused())
    }

    async fn authenticate(
        &self,
        _credentials: &Credentials,
    ) -> Result<AuthSession, ClientResponseError> {
        Err(unused())
    }

    async fn refresh_auth(&self, _token: &str) -> Result<AuthSession, ClientResponseError> {
        Err(unused())
    }

    async fn check_health(&self) -> Result<HealthCheckResponse, ClientResponseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone()
    }

    async fn email_registered(&self, _email: &str) -> Result<bool, ClientResponseError> {
        Err(unused())
    }
}

fn monitor_over(api: &Arc<ScriptedHealth>) -> HealthMonitor {
    let backend = BackendHandle::new(Arc::clone(api) as Arc<dyn PocketBaseApi>);
    HealthMonitor::new(&backend)
}

fn completed(outcome: TickOutcome) -> HealthStatus {
    match outcome {
        TickOutcome::Completed(status) => status,
        TickOutcome::AlreadyInFlight => panic!("tick unexpectedly skipped"),
    }
}

#[rstest]
#[tokio::test]
async fn healthy_reply_marks_the_backend_online() {
    let api = Arc::new(ScriptedHealth::healthy());
    let monitor = monitor_over(&api);
    assert!(monitor.status().is_none());
    assert!(!monitor.is_online());

    let status = completed(monitor.tick().await);

    assert_eq!(status, HealthStatus::Healthy);
    assert!(monitor.is_online());
}

#[rstest]
#[case(
    Ok(HealthCheckResponse { code: 503, message: "maintenance".to_owned() }),
    SYNTHETIC_FAILURE_STATUS
)]
#[case(Err(ClientResponseError::new(BASE_URL, 503).with_message("busy")), 503)]
#[case(Err(ClientResponseError::transport(BASE_URL, "connection refused")), 0)]
#[tokio::test]
async fn failures_are_recorded_not_raised(
    #[case] reply: Result<HealthCheckResponse, ClientResponseError>,
    #[case] expected_status: u16,
) {
    let api = Arc::new(ScriptedHealth::replying(reply));
    let monitor = monitor_over(&api);

    let status = completed(monitor.tick().await);

    let details = status.unhealthy().expect("unhealthy");
    assert_eq!(details.status(), expected_status);
    assert!(!monitor.is_online());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn slow_checks_time_out_as_synthetic_failures() {
    let api = Arc::new(ScriptedHealth::healthy().delayed(Duration::from_secs(10)));
    let monitor = monitor_over(&api);

    let status = completed(monitor.tick().await);

    let details = status.unhealthy().expect("timed out");
    assert_eq!(details.status(), SYNTHETIC_FAILURE_STATUS);
    assert_eq!(details.url(), BASE_URL);
    assert!(details.reason().contains("timed out after 4000 ms"));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn overlapping_ticks_make_one_call() {
    let api = Arc::new(ScriptedHealth::healthy().delayed(Duration::from_secs(1)));
    let monitor = monitor_over(&api);

    let (first, second) = tokio::join!(monitor.tick(), async {
        tokio::task::yield_now().await;
        monitor.tick().await
    });

    assert_eq!(first, TickOutcome::Completed(HealthStatus::Healthy));
    assert_eq!(second, TickOutcome::AlreadyInFlight);
    assert_eq!(api.calls(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn starting_twice_keeps_one_schedule() {
    let api = Arc::new(ScriptedHealth::healthy());
    let monitor = monitor_over(&api);

    monitor.start_polling(DEFAULT_POLL_INTERVAL, false);
    monitor.start_polling(DEFAULT_POLL_INTERVAL, true);
    tokio::time::sleep(Duration::from_millis(15_500)).await;

    assert_eq!(api.calls(), 2);
    assert!(monitor.is_polling());
    assert!(!monitor.inner.verbose.load(Ordering::Relaxed));
    monitor.stop_polling();
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn zero_interval_is_rejected_before_spawning() {
    let api = Arc::new(ScriptedHealth::healthy());
    let monitor = monitor_over(&api);

    monitor.start_polling(Duration::ZERO, true);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(!monitor.is_polling());
    assert_eq!(api.calls(), 0);
    assert!(!monitor.inner.verbose.load(Ordering::Relaxed));

    monitor.start_polling(DEFAULT_POLL_INTERVAL, false);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(api.calls(), 1);
    monitor.stop_polling();
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn stopping_suppresses_later_ticks() {
    let api = Arc::new(ScriptedHealth::healthy());
    let monitor = monitor_over(&api);

    monitor.start_polling(DEFAULT_POLL_INTERVAL, false);
    tokio::time::sleep(Duration::from_millis(10)).await;
    monitor.stop_polling();
    monitor.stop_polling();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(api.calls(), 1);
    assert!(!monitor.is_polling());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn stop_lets_the_in_flight_check_record() {
    let api = Arc::new(ScriptedHealth::healthy().delayed(Duration::from_secs(1)));
    let monitor = monitor_over(&api);

    monitor.start_polling(DEFAULT_POLL_INTERVAL, false);
    tokio::time::sleep(Duration::from_millis(100)).await;
    monitor.stop_polling();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(monitor.status(), Some(HealthStatus::Healthy));
    assert_eq!(api.calls(), 1);
}

#[rstest]
fn stop_without_start_is_harmless() {
    let api = Arc::new(ScriptedHealth::healthy());
    let monitor = monitor_over(&api);
    monitor.stop_polling();
    assert!(!monitor.is_polling());
}

#[rstest]
#[tokio::test]
async fn subscribers_see_unset_then_each_status() {
    let api = Arc::new(ScriptedHealth::healthy());
    let monitor = monitor_over(&api);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = monitor.subscribe(move |status| {
        sink.lock()
            .expect("recorder lock")
            .push(status.map(HealthStatus::is_healthy));
    });

    monitor.tick().await;
    monitor.tick().await;

    assert_eq!(
        *seen.lock().expect("recorder lock"),
        vec![None, Some(true), Some(true)]
    );
}
