/**
 * Typed views over the provider's drive hierarchy:
 *  items, classified nodes, and enriched file details.
 */
pub mod drive;
/**
 * Everything that talks to the provider:
 *  token lifecycle, the resilient call loop, URL
 *  construction, and the grouped batch wire format.
 */
pub mod graph;
/**
 * Non-blocking progress event channel and the
 *  aggregating reporter task.
 */
pub mod progress;
/**
 * Orchestration of one crawl: breadth-first hierarchy
 *  enumeration followed by bounded-concurrency
 *  per-leaf enrichment.
 */
pub mod scan;
/**
 * Scripted fake transport and wire-payload builders
 *  for exercising the engine without sockets.
 */
pub mod testkit;

pub mod prelude {
    pub use crate::drive::{FileDetail, Node, NodeKind};
    pub use crate::graph::{ApiClient, ApiError, AuthError, RetryPolicy, TokenConfig, Transport};
    pub use crate::progress::{ProgressCounters, ProgressEvent, ProgressSender};
    pub use crate::scan::{FetchStrategy, ScanConfig, ScanError, ScanReport, Scanner};
}
