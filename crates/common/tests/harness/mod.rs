//! Shared test utilities for engine integration tests
#![allow(dead_code)]

use std::sync::Arc;

use common::graph::endpoints::token_url;
use common::prelude::*;
use common::testkit::{payloads, FakeTransport};

pub const DRIVE: &str = "d1";

/// Fragment matching only per-item detail calls (listings use a different
/// `$select` set).
pub const DETAIL_CALLS: &str = "$select=file,sensitivityLabel";

pub fn credentials() -> TokenConfig {
    TokenConfig {
        token_url: token_url("tenant-1"),
        client_id: "client-1".to_string(),
        client_secret: "secret-1".to_string(),
        scope: "https://graph.microsoft.com/.default".to_string(),
    }
}

/// A transport that hands out tokens freely; tests script the rest.
pub fn transport_with_tokens() -> Arc<FakeTransport> {
    let transport = Arc::new(FakeTransport::new());
    transport.always("oauth2/v2.0/token", payloads::token_grant("tok-1", 3600));
    transport
}

pub fn scanner(transport: Arc<FakeTransport>, config: ScanConfig) -> Scanner {
    Scanner::new(config, credentials(), transport)
}

pub fn config() -> ScanConfig {
    ScanConfig::new(DRIVE)
}
