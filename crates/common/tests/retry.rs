//! Integration tests for the resilient call loop

mod harness;

use std::sync::Arc;
use std::time::Duration;

use common::graph::auth::TokenManager;
use common::graph::{ApiClient, ApiError, Payload, RetryPolicy};
use common::testkit::{payloads, FakeTransport};
use reqwest::StatusCode;
use serde_json::json;

const URL: &str = "https://graph.microsoft.com/v1.0/drives/d1/widgets";

fn client(transport: &Arc<FakeTransport>, policy: RetryPolicy) -> ApiClient {
    let tokens = Arc::new(TokenManager::new(
        harness::credentials(),
        transport.clone() as Arc<dyn common::graph::Transport>,
    ));
    ApiClient::new(transport.clone(), tokens, policy)
}

fn grant_tokens(transport: &FakeTransport) {
    transport.always("oauth2/v2.0/token", payloads::token_grant("tok-1", 3600));
}

#[tokio::test(start_paused = true)]
async fn honors_retry_after_hint() {
    let transport = Arc::new(FakeTransport::new());
    grant_tokens(&transport);
    transport.enqueue("widgets", payloads::throttled(Some(2.0)));
    transport.enqueue("widgets", payloads::json_response(StatusCode::OK, json!({"ok": true})));
    let client = client(&transport, RetryPolicy::default());

    let started = tokio::time::Instant::now();
    let payload = client.get(URL).await.unwrap();
    assert!(matches!(payload, Payload::Json(_)));

    // The second attempt may not be issued before the hinted delay elapsed.
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(transport.count_matching("widgets"), 2);
}

#[tokio::test(start_paused = true)]
async fn backs_off_exponentially_without_hint() {
    let transport = Arc::new(FakeTransport::new());
    grant_tokens(&transport);
    transport.enqueue("widgets", payloads::throttled(None));
    transport.enqueue("widgets", payloads::server_error(503));
    transport.enqueue("widgets", payloads::json_response(StatusCode::OK, json!({})));
    let client = client(&transport, RetryPolicy::default());

    let started = tokio::time::Instant::now();
    client.get(URL).await.unwrap();

    // 1.5^1 + 1.5^2 seconds of backoff across the two retries.
    assert!(started.elapsed() >= Duration::from_secs_f64(3.75));
    assert_eq!(transport.count_matching("widgets"), 3);
}

#[tokio::test]
async fn fail_fast_aborts_on_first_throttle() {
    let transport = Arc::new(FakeTransport::new());
    grant_tokens(&transport);
    transport.always("widgets", payloads::server_error(503));
    let policy = RetryPolicy {
        fail_fast: true,
        ..RetryPolicy::default()
    };
    let client = client(&transport, policy);

    match client.get(URL).await {
        Err(ApiError::Throttled { status, attempts, .. }) => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(attempts, 0);
        }
        other => panic!("expected throttle error, got {other:?}"),
    }
    assert_eq!(transport.count_matching("widgets"), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausting_retries_surfaces_last_body() {
    let transport = Arc::new(FakeTransport::new());
    grant_tokens(&transport);
    transport.always("widgets", payloads::throttled(Some(0.1)));
    let policy = RetryPolicy {
        max_retries: 2,
        fail_fast: false,
    };
    let client = client(&transport, policy);

    match client.get(URL).await {
        Err(ApiError::Throttled { attempts, body, .. }) => {
            assert_eq!(attempts, 2);
            assert!(body.contains("activityLimitReached"));
        }
        other => panic!("expected throttle error, got {other:?}"),
    }
    // Initial call plus two retries.
    assert_eq!(transport.count_matching("widgets"), 3);
}

#[tokio::test]
async fn forces_refresh_on_401_and_resends_with_new_token() {
    let transport = Arc::new(FakeTransport::new());
    transport.enqueue("oauth2/v2.0/token", payloads::token_grant("tok-1", 3600));
    transport.always("oauth2/v2.0/token", payloads::token_grant("tok-2", 3600));
    transport.enqueue("widgets", payloads::unauthorized());
    transport.enqueue("widgets", payloads::json_response(StatusCode::OK, json!({})));
    let client = client(&transport, RetryPolicy::default());

    client.get(URL).await.unwrap();

    assert_eq!(transport.token_requests(), 2);
    let calls: Vec<_> = transport
        .requests()
        .into_iter()
        .filter(|r| r.url.contains("widgets"))
        .collect();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].bearer.as_deref(), Some("tok-1"));
    assert_eq!(calls[1].bearer.as_deref(), Some("tok-2"));
}

#[tokio::test(start_paused = true)]
async fn transport_failures_share_the_backoff_schedule() {
    let transport = Arc::new(FakeTransport::new());
    grant_tokens(&transport);
    transport.enqueue_failure("widgets", payloads::connection_reset());
    transport.enqueue("widgets", payloads::json_response(StatusCode::OK, json!({})));
    let client = client(&transport, RetryPolicy::default());

    let started = tokio::time::Instant::now();
    client.get(URL).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs_f64(1.5));
    assert_eq!(transport.count_matching("widgets"), 2);
}

#[tokio::test]
async fn transport_retries_exhaust_independently() {
    let transport = Arc::new(FakeTransport::new());
    grant_tokens(&transport);
    for _ in 0..3 {
        transport.enqueue_failure("widgets", payloads::connection_reset());
    }
    let policy = RetryPolicy {
        max_retries: 2,
        fail_fast: false,
    };
    let client = client(&transport, policy);

    match client.get(URL).await {
        Err(ApiError::Transport { attempts, .. }) => assert_eq!(attempts, 2),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_structured_bodies_come_back_as_text() {
    let transport = Arc::new(FakeTransport::new());
    grant_tokens(&transport);
    transport.enqueue("widgets", payloads::text_response(StatusCode::OK, ""));
    let client = client(&transport, RetryPolicy::default());

    match client.get(URL).await.unwrap() {
        Payload::Text(body) => assert!(body.is_empty()),
        other => panic!("expected text payload, got {other:?}"),
    }
}

#[tokio::test]
async fn plain_4xx_is_not_retried() {
    let transport = Arc::new(FakeTransport::new());
    grant_tokens(&transport);
    transport.always("widgets", payloads::json_response(StatusCode::NOT_FOUND, json!({})));
    let client = client(&transport, RetryPolicy::default());

    match client.get(URL).await {
        Err(ApiError::Http { status, .. }) => assert_eq!(status.as_u16(), 404),
        other => panic!("expected http error, got {other:?}"),
    }
    assert_eq!(transport.count_matching("widgets"), 1);
}
