use adgate_ads::mock::MockAdSdk;
use adgate_ads::{InitState, SdkInitializer, UnavailableSdk};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn initializes_once() {
    let sdk = Arc::new(MockAdSdk::new());
    let init = SdkInitializer::new(sdk.clone());
    assert_eq!(init.state(), InitState::NotStarted);
    assert!(!init.is_started());

    assert!(init.initialize().await);
    assert!(init.initialize().await);
    assert_eq!(sdk.initialize_calls(), 1);
    assert_eq!(init.state(), InitState::Ready);
    assert!(init.is_initialized());
    assert!(init.is_settled());
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_share_one_sdk_call() {
    let sdk = Arc::new(MockAdSdk::new().with_init_delay(Duration::from_millis(500)));
    let init = Arc::new(SdkInitializer::new(sdk.clone()));

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let init = init.clone();
            tokio::spawn(async move { init.initialize().await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap());
    }
    assert_eq!(sdk.initialize_calls(), 1);
}

#[tokio::test]
async fn failure_is_recorded_and_not_retried() {
    let sdk = Arc::new(MockAdSdk::new().with_init_failure("consent missing"));
    let init = SdkInitializer::new(sdk.clone());

    assert!(!init.initialize().await);
    assert!(!init.initialize().await);
    assert_eq!(sdk.initialize_calls(), 1);
    assert!(init.is_settled());
    assert!(!init.is_initialized());
    assert!(init.error().unwrap().contains("consent missing"));
}

#[tokio::test]
async fn unavailable_sdk_settles_without_calling_initialize() {
    let sdk = Arc::new(MockAdSdk::unavailable());
    let init = SdkInitializer::new(sdk.clone());
    assert!(!init.is_available());

    assert!(!init.initialize().await);
    assert_eq!(sdk.initialize_calls(), 0);
    assert!(matches!(init.state(), InitState::Failed(_)));
}

#[tokio::test]
async fn unavailable_adapter_never_initializes() {
    let init = SdkInitializer::new(Arc::new(UnavailableSdk::default()));
    assert!(!init.initialize().await);
    assert!(init.error().is_some());
}

// ── Waiting ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn wait_returns_when_init_settles() {
    let sdk = Arc::new(MockAdSdk::new().with_init_delay(Duration::from_millis(200)));
    let init = Arc::new(SdkInitializer::new(sdk));

    let runner = init.clone();
    tokio::spawn(async move { runner.initialize().await });

    let started = tokio::time::Instant::now();
    assert!(init.wait_for_initialization(Duration::from_secs(5)).await);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn wait_times_out_on_slow_init() {
    let sdk = Arc::new(MockAdSdk::new().with_init_delay(Duration::from_secs(30)));
    let init = Arc::new(SdkInitializer::new(sdk));

    let runner = init.clone();
    tokio::spawn(async move { runner.initialize().await });

    assert!(!init.wait_for_initialization(Duration::from_secs(5)).await);
    assert_eq!(init.state(), InitState::InProgress);

    // Initialization keeps going in the background.
    assert!(init.wait_for_initialization(Duration::from_secs(60)).await);
}

#[tokio::test]
async fn wait_after_settle_returns_immediately() {
    let init = SdkInitializer::new(Arc::new(MockAdSdk::new()));
    init.initialize().await;
    assert!(init.wait_for_initialization(Duration::from_millis(1)).await);
}

#[tokio::test(start_paused = true)]
async fn wait_without_initialize_times_out_false() {
    let init = SdkInitializer::new(Arc::new(MockAdSdk::new()));
    assert!(!init.wait_for_initialization(Duration::from_secs(5)).await);
    assert_eq!(init.state(), InitState::NotStarted);
}
