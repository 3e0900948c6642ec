/**
 * Graph API plumbing
 * ==================
 * Everything that talks to the provider lives here:
 *  - `transport`: the raw request/response seam. Production code uses
 *    the reqwest-backed `HttpTransport`; tests script a fake.
 *  - `auth`: client-credential token lifecycle with single-flight refresh
 *  - `client`: the resilient call loop (throttle backoff, 401 refresh,
 *    transport retry) every authenticated request funnels through
 *  - `endpoints`: URL construction for the listing/detail/batch calls
 *  - `batch`: wire types for the grouped `$batch` endpoint
 */
pub mod auth;
pub mod batch;
pub mod client;
pub mod endpoints;
pub mod transport;

pub use auth::{AuthError, TokenConfig, TokenManager};
pub use batch::{BatchRequest, BatchResponse, BatchSubResponse, BATCH_LIMIT};
pub use client::{ApiClient, ApiError, Payload, RetryPolicy, DEFAULT_MAX_RETRIES};
pub use endpoints::Endpoints;
pub use transport::{
    HttpTransport, RequestBody, Transport, TransportFailure, TransportRequest, TransportResponse,
};
