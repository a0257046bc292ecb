//! Unit tests for the submission controller
//!
//! Every test uses a scripted endpoint and a recording sleeper, so network
//! calls, backoff waits and quota effects are all observable.

use cardgen_client::quota::QUOTA_STORAGE_KEY;
use cardgen_client::{
    EndpointError, MemoryStorage, QuotaStorage, RetryPolicy, SubmissionController,
    SubmissionError,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

use crate::common::{tracker_on, RecordingSleeper, ScriptedEndpoint};

const IMAGE: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRg==";

struct Harness {
    controller: SubmissionController,
    endpoint: Arc<ScriptedEndpoint>,
    sleeper: Arc<RecordingSleeper>,
    storage: Arc<MemoryStorage>,
}

fn harness(script: Vec<Result<String, EndpointError>>, storage: Arc<MemoryStorage>) -> Harness {
    let (tracker, _clock) = tracker_on(storage.clone(), "2024-01-02", 3);
    let endpoint = ScriptedEndpoint::new(script);
    let sleeper = RecordingSleeper::new();

    let controller = SubmissionController::new(tracker, endpoint.clone(), RetryPolicy::default())
        .with_sleeper(sleeper.clone());

    Harness {
        controller,
        endpoint,
        sleeper,
        storage,
    }
}

fn stored_count(storage: &MemoryStorage) -> Option<u32> {
    storage
        .get(QUOTA_STORAGE_KEY)
        .unwrap()
        .map(|raw| serde_json::from_str::<serde_json::Value>(&raw).unwrap()["count"].as_u64().unwrap() as u32)
}

fn transient(status: u16) -> EndpointError {
    EndpointError::Status {
        status,
        body: "upstream unavailable".to_string(),
    }
}

// =============================================================================
// Validation Tests
// =============================================================================

#[tokio::test]
async fn test_empty_image_fails_without_network_or_quota() {
    let h = harness(vec![Ok("card".to_string())], Arc::new(MemoryStorage::new()));

    let result = h.controller.submit("", Some("hello")).await;

    assert!(matches!(result, Err(SubmissionError::Validation(_))));
    assert_eq!(h.endpoint.calls(), 0);
    // The quota was not even read, so no record was created
    assert_eq!(stored_count(&h.storage), None);
}

#[tokio::test]
async fn test_overlong_caption_fails_without_network() {
    let h = harness(vec![Ok("card".to_string())], Arc::new(MemoryStorage::new()));
    let caption = "x".repeat(201);

    let result = h.controller.submit(IMAGE, Some(&caption)).await;

    assert!(matches!(result, Err(SubmissionError::Validation(_))));
    assert_eq!(h.endpoint.calls(), 0);
}

// =============================================================================
// Quota Tests
// =============================================================================

#[tokio::test]
async fn test_quota_exhausted_fails_without_network() {
    let storage = Arc::new(MemoryStorage::with_value(
        QUOTA_STORAGE_KEY,
        r#"{"count":3,"date":"2024-01-02"}"#,
    ));
    let h = harness(vec![Ok("card".to_string())], storage);

    let result = h.controller.submit(IMAGE, None).await;

    assert_eq!(result, Err(SubmissionError::QuotaExhausted { limit: 3 }));
    assert_eq!(h.endpoint.calls(), 0);
    assert_eq!(stored_count(&h.storage), Some(3));
}

#[tokio::test]
async fn test_stale_exhausted_quota_allows_generation() {
    let storage = Arc::new(MemoryStorage::with_value(
        QUOTA_STORAGE_KEY,
        r#"{"count":5,"date":"2024-01-01"}"#,
    ));
    let h = harness(vec![Ok("card".to_string())], storage);

    let card = h.controller.submit(IMAGE, None).await.unwrap();

    assert_eq!(card.remaining, 2);
    assert_eq!(stored_count(&h.storage), Some(1));
}

#[tokio::test]
async fn test_three_successes_then_quota_exhausted() {
    let h = harness(
        (0..4).map(|i| Ok(format!("card-{}", i))).collect(),
        Arc::new(MemoryStorage::new()),
    );

    for expected_remaining in [2, 1, 0] {
        let card = h.controller.submit(IMAGE, None).await.unwrap();
        assert_eq!(card.remaining, expected_remaining);
    }
    assert_eq!(h.controller.quota().remaining(), 0);
    assert_eq!(h.endpoint.calls(), 3);

    let fourth = h.controller.submit(IMAGE, None).await;
    assert_eq!(fourth, Err(SubmissionError::QuotaExhausted { limit: 3 }));
    assert_eq!(h.endpoint.calls(), 3);
}

// =============================================================================
// Retry Tests
// =============================================================================

#[tokio::test]
async fn test_first_attempt_success_does_not_wait() {
    let h = harness(vec![Ok("card".to_string())], Arc::new(MemoryStorage::new()));

    let card = h.controller.submit(IMAGE, Some("С днём рождения!")).await.unwrap();

    assert_eq!(card.image_url, "card");
    assert_eq!(card.attempts, 1);
    assert_eq!(card.remaining, 2);
    assert!(h.sleeper.delays().is_empty());

    let requests = h.endpoint.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].encoded_image(), IMAGE);
    assert_eq!(requests[0].caption(), Some("С днём рождения!"));
}

#[tokio::test]
async fn test_success_on_second_attempt() {
    let h = harness(
        vec![Err(transient(503)), Ok("card".to_string())],
        Arc::new(MemoryStorage::new()),
    );

    let card = h.controller.submit(IMAGE, None).await.unwrap();

    assert_eq!(card.attempts, 2);
    assert_eq!(h.endpoint.calls(), 2);
    assert_eq!(h.sleeper.delays(), vec![Duration::from_secs(1)]);
    // recordSuccess ran exactly once
    assert_eq!(stored_count(&h.storage), Some(1));
    assert_eq!(card.remaining, 2);
}

#[tokio::test]
async fn test_all_attempts_fail() {
    let h = harness(
        vec![
            Err(EndpointError::Transport("Connection failed".to_string())),
            Err(EndpointError::Rejected("No image generated".to_string())),
            Err(transient(502)),
        ],
        Arc::new(MemoryStorage::new()),
    );

    let result = h.controller.submit(IMAGE, None).await;

    assert_eq!(
        result,
        Err(SubmissionError::ExhaustedRetries {
            attempts: 3,
            last_error: transient(502),
        })
    );
    assert_eq!(h.endpoint.calls(), 3);
    // Linear backoff between attempts, none after the last
    assert_eq!(
        h.sleeper.delays(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
    // Quota untouched: only the initial check wrote a fresh record
    assert_eq!(stored_count(&h.storage), Some(0));
    assert_eq!(h.controller.quota().remaining(), 3);
}

#[tokio::test]
async fn test_request_is_identical_across_attempts() {
    let h = harness(
        vec![Err(transient(500)), Err(transient(500)), Ok("card".to_string())],
        Arc::new(MemoryStorage::new()),
    );

    h.controller.submit(IMAGE, Some("Мира и добра")).await.unwrap();

    let requests = h.endpoint.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r == &requests[0]));
}

#[tokio::test]
async fn test_custom_policy_single_attempt() {
    let storage = Arc::new(MemoryStorage::new());
    let (tracker, _clock) = tracker_on(storage, "2024-01-02", 3);
    let endpoint = ScriptedEndpoint::new(vec![Err(transient(500)), Ok("card".to_string())]);
    let sleeper = RecordingSleeper::new();

    let policy = RetryPolicy {
        max_attempts: 1,
        base_delay: Duration::from_millis(10),
    };
    let controller =
        SubmissionController::new(tracker, endpoint.clone(), policy).with_sleeper(sleeper.clone());

    let result = controller.submit(IMAGE, None).await;

    assert!(matches!(
        result,
        Err(SubmissionError::ExhaustedRetries { attempts: 1, .. })
    ));
    assert_eq!(endpoint.calls(), 1);
    assert!(sleeper.delays().is_empty());
}

/// Sleeper that lets another tracker consume quota while the controller waits
struct OtherClientSleeper {
    other: cardgen_client::QuotaTracker,
}

#[async_trait::async_trait]
impl cardgen_client::Sleeper for OtherClientSleeper {
    async fn sleep(&self, _duration: Duration) {
        self.other.record_success();
    }
}

#[tokio::test]
async fn test_concurrent_consumption_during_retries_is_tolerated() {
    // One generation left when the submission starts
    let storage = Arc::new(MemoryStorage::with_value(
        QUOTA_STORAGE_KEY,
        r#"{"count":2,"date":"2024-01-02"}"#,
    ));
    let (tracker, _clock) = tracker_on(storage.clone(), "2024-01-02", 3);
    let (other, _other_clock) = tracker_on(storage.clone(), "2024-01-02", 3);
    let endpoint = ScriptedEndpoint::new(vec![Err(transient(503)), Ok("card".to_string())]);

    let controller = SubmissionController::new(tracker, endpoint.clone(), RetryPolicy::default())
        .with_sleeper(Arc::new(OtherClientSleeper { other }));

    // The other client takes the last generation during the backoff wait;
    // the in-flight submission still completes and overshoots the limit.
    let card = controller.submit(IMAGE, None).await.unwrap();

    assert_eq!(card.attempts, 2);
    assert_eq!(card.remaining, 0);
    assert_eq!(stored_count(&storage), Some(4));
    assert_eq!(endpoint.calls(), 2);
}
