mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeClient, Reply};
use diskspeed_fetch::{
    Error, ManualClock, Method, ProviderConfig, StatusCategory, ThroughputEngine,
};
use tokio_util::sync::CancellationToken;

const TARGET: &str = "https://yandex.ru";

fn engine(client: FakeClient, clock: Arc<ManualClock>) -> ThroughputEngine<FakeClient> {
    ThroughputEngine::new(client, ProviderConfig::default()).with_clock(clock)
}

#[tokio::test]
async fn head_round_trip_is_measured() {
    let clock = Arc::new(ManualClock::new());
    let client = FakeClient::new()
        .with_clock(clock.clone(), Duration::from_millis(42))
        .on(Method::Head, TARGET, Reply::Status(200));

    let latency = engine(client, clock)
        .measure_ping(TARGET, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(latency, Duration::from_millis(42));
}

#[tokio::test]
async fn refused_head_falls_back_to_get_with_fresh_timing() {
    let clock = Arc::new(ManualClock::new());
    let client = FakeClient::new()
        .with_clock(clock.clone(), Duration::from_millis(30))
        .on(Method::Head, TARGET, Reply::Status(405))
        .on(Method::Get, TARGET, Reply::Status(200));
    let engine = engine(client, clock);

    let latency = engine
        .measure_ping(TARGET, &CancellationToken::new())
        .await
        .unwrap();

    // The rejected HEAD's 30ms are not counted.
    assert_eq!(latency, Duration::from_millis(30));
    let methods: Vec<Method> = engine.client().calls().iter().map(|c| c.method).collect();
    assert_eq!(methods, [Method::Head, Method::Get]);
}

#[tokio::test]
async fn other_statuses_are_errors() {
    let clock = Arc::new(ManualClock::new());
    let client = FakeClient::new().on(Method::Head, TARGET, Reply::Status(429));

    let err = engine(client, clock)
        .measure_ping(TARGET, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::HttpStatus {
            status: 429,
            category: StatusCategory::RateLimited,
            ..
        }
    ));
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    let clock = Arc::new(ManualClock::new());
    let client = FakeClient::new().on(Method::Head, TARGET, Reply::Fail("no route".into()));

    let err = engine(client, clock)
        .measure_ping(TARGET, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Network(ref m) if m.contains("no route")));
}

#[tokio::test]
async fn cancelled_before_start() {
    let clock = Arc::new(ManualClock::new());
    let client = FakeClient::new().on(Method::Head, TARGET, Reply::Status(200));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = engine(client, clock)
        .measure_ping(TARGET, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
}
