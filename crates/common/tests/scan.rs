//! End-to-end pipeline tests over the scripted transport

mod harness;

use common::graph::ApiError;
use common::scan::{CrawlError, ScanError};
use common::testkit::payloads;
use reqwest::StatusCode;
use serde_json::json;

use harness::{config, scanner, transport_with_tokens, DETAIL_CALLS};

/// Root holds two leaves and one container; the container holds one leaf.
/// Concurrency 1, per-item mode, every call succeeding.
#[tokio::test]
async fn small_tree_per_item_scan() {
    let transport = transport_with_tokens();
    transport.enqueue(
        "root/children",
        payloads::page(
            &[
                payloads::file_item("l1", "l1.txt", "/drive/root:", 10, Some("fromListing==")),
                payloads::file_item("l2", "l2.txt", "/drive/root:", 20, None),
                payloads::folder_item("c1", "c1", "/drive/root:"),
            ],
            None,
        ),
    );
    transport.enqueue(
        "items/c1/children",
        payloads::page(
            &[payloads::file_item("l3", "l3.txt", "/drive/root:/c1", 30, None)],
            None,
        ),
    );
    transport.always(
        DETAIL_CALLS,
        payloads::json_response(StatusCode::OK, payloads::detail_body("x", None, None)),
    );

    let mut config = config();
    config.concurrency = 1;
    let report = scanner(transport, config).run().await.unwrap();

    assert_eq!(report.containers.len(), 1);
    assert_eq!(report.details.len(), 3);

    let by_id = |id: &str| report.details.iter().find(|d| d.id == id).unwrap();
    assert_eq!(by_id("l1").path, "/l1.txt");
    assert_eq!(by_id("l3").path, "/c1/l3.txt");
    // The hash carried by the listing facet survives enrichment.
    assert_eq!(by_id("l1").content_hash.as_deref(), Some("fromListing=="));
}

#[tokio::test]
async fn fail_fast_aborts_on_first_5xx() {
    let transport = transport_with_tokens();
    transport.always("root/children", payloads::server_error(503));

    let mut config = config();
    config.retry.fail_fast = true;
    let error = scanner(transport.clone(), config).run().await.unwrap_err();

    match error {
        ScanError::Traversal(CrawlError::Api(ApiError::Throttled { status, attempts, .. })) => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(attempts, 0);
        }
        other => panic!("expected throttle abort, got {other:?}"),
    }
    // Exactly one listing attempt, zero leaves ever fetched.
    assert_eq!(transport.count_matching("root/children"), 1);
    assert_eq!(transport.count_matching(DETAIL_CALLS), 0);
}

#[tokio::test]
async fn bad_credentials_abort_before_traversal() {
    let transport = std::sync::Arc::new(common::testkit::FakeTransport::new());
    transport.always("oauth2/v2.0/token", payloads::token_denied());

    let error = scanner(transport.clone(), config()).run().await.unwrap_err();

    assert!(matches!(error, ScanError::Token(_)));
    assert_eq!(transport.count_matching("root/children"), 0);
}

#[tokio::test]
async fn shutdown_signal_cancels_the_run() {
    let transport = transport_with_tokens();
    transport.always(
        "root/children",
        payloads::page(&[payloads::folder_item("c1", "c1", "/drive/root:")], None),
    );
    transport.always("items/c1/children", payloads::page(&[], None));

    let (tx, rx) = tokio::sync::watch::channel(false);
    tx.send(true).unwrap();

    let error = scanner(transport, config())
        .with_shutdown(rx)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(error, ScanError::Cancelled));
}

#[tokio::test]
async fn credential_loss_during_enrichment_is_catastrophic() {
    let transport = std::sync::Arc::new(common::testkit::FakeTransport::new());
    // First grant covers the crawl; once the API starts answering 401 the
    // forced refresh is denied and the run must abort.
    transport.enqueue("oauth2/v2.0/token", payloads::token_grant("tok-1", 3600));
    transport.always("oauth2/v2.0/token", payloads::token_denied());
    transport.enqueue(
        "root/children",
        payloads::page(
            &[payloads::file_item("l1", "l1.txt", "/drive/root:", 10, None)],
            None,
        ),
    );
    transport.always(DETAIL_CALLS, payloads::unauthorized());

    let error = scanner(transport, config()).run().await.unwrap_err();
    assert!(matches!(error, ScanError::Enrichment(_)));
}

#[tokio::test]
async fn empty_drive_completes_with_empty_report() {
    let transport = transport_with_tokens();
    transport.enqueue("root/children", payloads::page(&[], None));

    let report = scanner(transport, config()).run().await.unwrap();
    assert!(report.containers.is_empty());
    assert!(report.details.is_empty());
}

#[tokio::test]
async fn listing_decode_failure_surfaces_as_traversal_error() {
    let transport = transport_with_tokens();
    transport.enqueue(
        "root/children",
        payloads::json_response(StatusCode::OK, json!("not a listing")),
    );

    let error = scanner(transport, config()).run().await.unwrap_err();
    assert!(matches!(
        error,
        ScanError::Traversal(CrawlError::Api(ApiError::Decode(_)))
    ));
}
