//! Integration tests for the enrichment phase

mod harness;

use common::progress::{ProgressEvent, ProgressSender};
use common::scan::FetchStrategy;
use common::testkit::payloads;
use reqwest::StatusCode;
use serde_json::json;

use harness::{config, scanner, transport_with_tokens, DETAIL_CALLS};

fn listing_with_three_leaves(transport: &common::testkit::FakeTransport) {
    transport.enqueue(
        "root/children",
        payloads::page(
            &[
                payloads::file_item("l1", "l1.txt", "/drive/root:", 10, None),
                payloads::file_item("l2", "l2.txt", "/drive/root:", 20, Some("listed==")),
                payloads::file_item("l3", "l3.txt", "/drive/root:", 30, None),
            ],
            None,
        ),
    );
}

#[tokio::test]
async fn per_item_failure_degrades_without_aborting() {
    let transport = transport_with_tokens();
    listing_with_three_leaves(&transport);
    transport.always(
        "items/l1?",
        payloads::json_response(
            StatusCode::OK,
            payloads::detail_body("l1", Some("qx1=="), Some(("lbl", "Confidential"))),
        ),
    );
    // l2's detail call fails outright; the listing facet must survive.
    transport.always("items/l2?", payloads::json_response(StatusCode::NOT_FOUND, json!({})));
    transport.always(
        "items/l3?",
        payloads::json_response(StatusCode::OK, payloads::detail_body("l3", Some("qx3=="), None)),
    );

    let report = scanner(transport, config()).run().await.unwrap();

    assert_eq!(report.details.len(), 3);
    let by_id = |id: &str| report.details.iter().find(|d| d.id == id).unwrap();
    assert_eq!(by_id("l1").content_hash.as_deref(), Some("qx1=="));
    assert_eq!(by_id("l1").label_name.as_deref(), Some("Confidential"));
    assert_eq!(by_id("l2").content_hash.as_deref(), Some("listed=="));
    assert!(by_id("l2").label_id.is_none());
    assert_eq!(by_id("l3").content_hash.as_deref(), Some("qx3=="));
}

#[tokio::test]
async fn batch_demultiplexes_by_sub_request_id() {
    let transport = transport_with_tokens();
    listing_with_three_leaves(&transport);
    // Sub 0 succeeds, sub 1 reports 404, sub 2 is absent from the envelope.
    transport.enqueue(
        "$batch",
        payloads::batch_envelope(&[
            (0, 200, payloads::detail_body("l1", Some("qx1=="), None)),
            (1, 404, json!({})),
        ]),
    );

    let mut config = config();
    config.strategy = FetchStrategy::Batched;
    let report = scanner(transport.clone(), config).run().await.unwrap();

    assert_eq!(report.details.len(), 3);
    let by_id = |id: &str| report.details.iter().find(|d| d.id == id).unwrap();
    assert_eq!(by_id("l1").content_hash.as_deref(), Some("qx1=="));
    assert_eq!(by_id("l2").content_hash.as_deref(), Some("listed=="));
    assert!(by_id("l3").content_hash.is_none());

    assert_eq!(transport.count_matching("$batch"), 1);
    assert_eq!(transport.count_matching(DETAIL_CALLS), 0);
}

#[tokio::test]
async fn failed_batch_falls_back_to_per_item() {
    let transport = transport_with_tokens();
    listing_with_three_leaves(&transport);
    // The grouped request itself dies with a non-retryable error.
    transport.always(
        "$batch",
        payloads::json_response(StatusCode::BAD_REQUEST, json!({"error": "malformed"})),
    );
    transport.always(
        DETAIL_CALLS,
        payloads::json_response(StatusCode::OK, payloads::detail_body("x", Some("fb=="), None)),
    );

    let mut config = config();
    config.strategy = FetchStrategy::Batched;
    let report = scanner(transport.clone(), config).run().await.unwrap();

    // None of the group's members were lost.
    assert_eq!(report.details.len(), 3);
    assert!(report.details.iter().all(|d| d.content_hash.is_some()));
    assert_eq!(transport.count_matching("$batch"), 1);
    assert_eq!(transport.count_matching(DETAIL_CALLS), 3);
}

#[tokio::test]
async fn every_leaf_emits_exactly_one_progress_event() {
    let transport = transport_with_tokens();
    listing_with_three_leaves(&transport);
    transport.always("items/l1?", payloads::json_response(StatusCode::NOT_FOUND, json!({})));
    transport.always(
        DETAIL_CALLS,
        payloads::json_response(StatusCode::OK, payloads::detail_body("x", None, None)),
    );

    let (sender, rx) = ProgressSender::channel();
    let report = scanner(transport, config())
        .with_progress(sender)
        .run()
        .await
        .unwrap();
    assert_eq!(report.details.len(), 3);

    let events: Vec<ProgressEvent> = rx.drain().collect();
    let detail_events = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::AddDetails(1)))
        .count();
    assert_eq!(detail_events, 3);
    assert!(events.contains(&ProgressEvent::SetInitial {
        containers: 0,
        leaves: 3
    }));
    assert_eq!(events.last(), Some(&ProgressEvent::Stop));
}
