mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{FakeClient, Reply, temp_file};
use diskspeed_fetch::{
    Credential, EngineOptions, Error, ManualClock, Method, ProgressCallback, ProgressSample,
    ProviderConfig, StatusCategory, ThroughputEngine, link,
};
use tokio_util::sync::CancellationToken;

const MIB: usize = 1024 * 1024;
const DIRECT: &str = "https://example.com/sample.zip";

fn quick() -> EngineOptions {
    EngineOptions::default().local_chunk_delay(Duration::ZERO)
}

fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<ProgressSample>>>) {
    let samples = Arc::new(Mutex::new(Vec::new()));
    let sink = samples.clone();
    let cb: ProgressCallback = Arc::new(move |s: &ProgressSample| {
        sink.lock().unwrap().push(*s);
    });
    (cb, samples)
}

#[tokio::test]
async fn local_file_reports_every_tenth_chunk_and_a_final_one() {
    let (_dir, path) = temp_file(MIB + 100);
    let engine = ThroughputEngine::new(FakeClient::new(), ProviderConfig::default())
        .with_options(quick());
    let (cb, samples) = recorder();

    let result = engine
        .measure_download(&link::file_url(&path).unwrap(), None, Some(cb), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.bytes, (MIB + 100) as u64);
    assert!(result.megabits_per_second >= 0.0);
    assert!(engine.client().calls().is_empty());

    // 129 chunks: 12 on the cadence plus one final report.
    let samples = samples.lock().unwrap();
    assert_eq!(samples.len(), 13);
    assert_eq!(samples[0].bytes_so_far, 8192 * 10);
    let last = samples.last().unwrap();
    assert_eq!(last.bytes_so_far, (MIB + 100) as u64);
    assert_eq!(last.percent, Some(100));
    assert!(samples.windows(2).all(|w| w[0].bytes_so_far < w[1].bytes_so_far));
}

#[tokio::test]
async fn local_measurement_with_paced_chunks_is_positive() {
    let (_dir, path) = temp_file(64 * 1024);
    let engine = ThroughputEngine::new(FakeClient::new(), ProviderConfig::default());

    let result = engine
        .measure_local(&path, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.bytes, 64 * 1024);
    assert!(result.elapsed >= Duration::from_millis(8));
    assert!(result.megabits_per_second > 0.0);
}

#[tokio::test]
async fn missing_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.bin");
    let engine = ThroughputEngine::new(FakeClient::new(), ProviderConfig::default());

    let err = engine
        .measure_download(&link::file_url(&path).unwrap(), None, None, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::LocalFileNotFound(p) if p == path));
}

#[tokio::test]
async fn cancellation_stops_after_the_current_chunk() {
    let (_dir, path) = temp_file(10 * MIB);
    let engine = ThroughputEngine::new(FakeClient::new(), ProviderConfig::default())
        .with_options(quick().progress_every(1));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let calls = Arc::new(Mutex::new(0));
    let seen = calls.clone();
    let cb: ProgressCallback = Arc::new(move |_: &ProgressSample| {
        *seen.lock().unwrap() += 1;
        trigger.cancel();
    });

    let err = engine
        .measure_download(&link::file_url(&path).unwrap(), None, Some(cb), &cancel)
        .await
        .unwrap_err();

    match err {
        Error::Cancelled { transferred } => assert!(transferred < (10 * MIB) as u64),
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn one_mebibyte_in_one_second_is_eight_megabits() {
    let clock = Arc::new(ManualClock::new());
    let client = FakeClient::new().with_clock(clock.clone(), Duration::ZERO).on(
        Method::Get,
        DIRECT,
        Reply::Bytes {
            status: 200,
            data: vec![1; MIB],
            content_length: Some(MIB as u64),
            piece: 8192,
            // 128 pieces add up to exactly one second.
            per_piece: Duration::from_nanos(7_812_500),
        },
    );
    let engine = ThroughputEngine::new(client, ProviderConfig::default()).with_clock(clock);

    let result = engine
        .measure_download(DIRECT, None, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.bytes, MIB as u64);
    assert_eq!(result.elapsed, Duration::from_secs(1));
    assert_eq!(result.megabits_per_second, 8.0);
}

#[tokio::test]
async fn download_urls_carry_a_cache_buster() {
    let client = FakeClient::new()
        .on(Method::Head, DIRECT, Reply::Status(200))
        .on(Method::Get, DIRECT, Reply::body(vec![0; 1000]));
    let engine = ThroughputEngine::new(client, ProviderConfig::default()).with_rng_seed(7);

    engine
        .measure_download(DIRECT, None, None, &CancellationToken::new())
        .await
        .unwrap();

    let gets = engine.client().calls_to(Method::Get, DIRECT);
    assert_eq!(gets.len(), 1);
    assert!(gets[0].url.starts_with("https://example.com/sample.zip?cache="));
}

#[tokio::test]
async fn cache_buster_can_be_disabled() {
    let client = FakeClient::new().on(Method::Get, DIRECT, Reply::body(vec![0; 1000]));
    let engine = ThroughputEngine::new(client, ProviderConfig::default())
        .with_options(EngineOptions::default().cache_bust(false));

    engine
        .measure_download(DIRECT, None, None, &CancellationToken::new())
        .await
        .unwrap();

    let gets = engine.client().calls_to(Method::Get, DIRECT);
    assert_eq!(gets[0].url, DIRECT);
}

#[tokio::test]
async fn unknown_length_falls_back_to_assumed_size() {
    let client = FakeClient::new().on(
        Method::Get,
        DIRECT,
        Reply::Bytes {
            status: 200,
            data: vec![0; 8192 * 10],
            content_length: None,
            piece: 8192,
            per_piece: Duration::ZERO,
        },
    );
    let engine = ThroughputEngine::new(client, ProviderConfig::default())
        .with_options(EngineOptions::default().assumed_size(8192 * 100));
    let (cb, samples) = recorder();

    let result = engine
        .measure_download(DIRECT, None, Some(cb), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.bytes, 8192 * 10);
    let samples = samples.lock().unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].percent, Some(10));
}

#[tokio::test]
async fn probed_size_is_used_when_the_response_has_none() {
    let client = FakeClient::new()
        .on(
            Method::Head,
            DIRECT,
            Reply::Bytes {
                status: 200,
                data: Vec::new(),
                content_length: Some(8192 * 20),
                piece: 8192,
                per_piece: Duration::ZERO,
            },
        )
        .on(
            Method::Get,
            DIRECT,
            Reply::Bytes {
                status: 200,
                data: vec![0; 8192 * 10],
                content_length: None,
                piece: 8192,
                per_piece: Duration::ZERO,
            },
        );
    let engine = ThroughputEngine::new(client, ProviderConfig::default());
    let (cb, samples) = recorder();

    engine
        .measure_download(DIRECT, None, Some(cb), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(samples.lock().unwrap()[0].percent, Some(50));
}

#[tokio::test]
async fn error_statuses_are_categorised() {
    for (status, category) in [
        (401, StatusCategory::Unauthorized),
        (403, StatusCategory::Forbidden),
        (404, StatusCategory::NotFound),
        (429, StatusCategory::RateLimited),
        (503, StatusCategory::Other),
    ] {
        let client = FakeClient::new().on(Method::Get, DIRECT, Reply::Status(status));
        let engine = ThroughputEngine::new(client, ProviderConfig::default());

        let err = engine
            .measure_download(DIRECT, None, None, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            Error::HttpStatus {
                status: s,
                category: c,
                ..
            } => {
                assert_eq!(s, status);
                assert_eq!(c, category);
            }
            other => panic!("unexpected error for {status}: {other:?}"),
        }
    }
}

#[tokio::test]
async fn shared_link_is_resolved_before_download() {
    let client = FakeClient::new()
        .on(
            Method::Get,
            "https://cloud-api.yandex.net/v1/disk/public/resources/download",
            Reply::href("https://downloader.disk.yandex.ru/disk/blob"),
        )
        .on(Method::Head, "https://downloader.disk.yandex.ru/disk/blob", Reply::Status(200))
        .on(
            Method::Get,
            "https://downloader.disk.yandex.ru/disk/blob",
            Reply::body(vec![0; 20_000]),
        );
    let engine = ThroughputEngine::new(client, ProviderConfig::default());
    let credential = Credential::new("secret");

    let result = engine
        .measure_download(
            "https://disk.yandex.ru/d/vt-pDfQ1qOFpWQ",
            Some(&credential),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.bytes, 20_000);
    let head = engine
        .client()
        .calls_to(Method::Head, "https://downloader.disk.yandex.ru");
    assert_eq!(head[0].header("Authorization"), Some("OAuth secret"));
    let get = engine
        .client()
        .calls_to(Method::Get, "https://downloader.disk.yandex.ru");
    assert_eq!(get[0].header("Authorization"), None);
}

#[tokio::test]
async fn transport_failure_before_headers_is_a_network_error() {
    let client = FakeClient::new().on(Method::Get, DIRECT, Reply::Fail("reset".into()));
    let engine = ThroughputEngine::new(client, ProviderConfig::default());

    let err = engine
        .measure_download(DIRECT, None, None, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Network(_)));
}

fn cancel_soon() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    cancel
}

#[tokio::test]
async fn cancellation_interrupts_a_stalled_availability_check() {
    let client = FakeClient::new().on(Method::Head, DIRECT, Reply::Hang);
    let engine = ThroughputEngine::new(client, ProviderConfig::default());

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        engine.measure_download(DIRECT, None, None, &cancel_soon()),
    )
    .await
    .expect("download kept waiting after cancellation");

    assert!(matches!(outcome, Err(Error::Cancelled { transferred: 0 })));
    assert!(engine.client().calls_to(Method::Get, DIRECT).is_empty());
}

#[tokio::test]
async fn cancellation_interrupts_a_stalled_link_resolution() {
    let client = FakeClient::new().on(
        Method::Get,
        "https://cloud-api.yandex.net/v1/disk/public/resources/download",
        Reply::Hang,
    );
    let engine = ThroughputEngine::new(client, ProviderConfig::default());
    let credential = Credential::new("secret");

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        engine.measure_download(
            "https://disk.yandex.ru/d/abc",
            Some(&credential),
            None,
            &cancel_soon(),
        ),
    )
    .await
    .expect("download kept waiting after cancellation");

    assert!(matches!(outcome, Err(Error::Cancelled { transferred: 0 })));
}

#[tokio::test]
async fn cancellation_interrupts_a_stalled_response() {
    let client = FakeClient::new().on(Method::Get, DIRECT, Reply::Hang);
    let engine = ThroughputEngine::new(client, ProviderConfig::default())
        .with_options(EngineOptions::default().cache_bust(false));

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        engine.measure_download(DIRECT, None, None, &cancel_soon()),
    )
    .await
    .expect("download kept waiting after cancellation");

    assert!(matches!(outcome, Err(Error::Cancelled { .. })));
}

#[tokio::test]
async fn broken_body_is_a_transfer_failure_without_retry() {
    let client = FakeClient::new().on(
        Method::Get,
        DIRECT,
        Reply::Cut {
            data: vec![0; 8192 * 3],
            content_length: Some(8192 * 10),
            piece: 8192,
            error: "connection reset".into(),
        },
    );
    let engine = ThroughputEngine::new(client, ProviderConfig::default());

    let err = engine
        .measure_download(DIRECT, None, None, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::TransferFailed(message) => assert!(message.contains("connection reset")),
        other => panic!("expected a transfer failure, got {other:?}"),
    }
    assert_eq!(engine.client().calls_to(Method::Get, DIRECT).len(), 1);
}
