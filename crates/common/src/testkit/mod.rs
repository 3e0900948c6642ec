/// Lightweight test harness for the crawl/enrichment engine
///
/// This module provides a scripted in-process transport plus builders for
/// the provider's wire payloads, so integration tests can exercise the full
/// pipeline - token lifecycle, retry policy, traversal, enrichment -
/// without requiring external infrastructure.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use common::testkit::{payloads, FakeTransport};
///
/// #[tokio::test]
/// async fn test_scan() {
///     let transport = Arc::new(FakeTransport::new());
///     transport.always("oauth2/v2.0/token", payloads::token_grant("tok", 3600));
///     transport.always(
///         "root/children",
///         payloads::page(
///             &[payloads::file_item("f1", "a.txt", "/drive/root:", 10, None)],
///             None,
///         ),
///     );
///
///     // hand the transport to a Scanner and assert on the report
/// }
/// ```
pub mod payloads;
mod transport;

pub use transport::FakeTransport;
