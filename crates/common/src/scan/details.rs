use std::sync::Arc;

use tokio::sync::{watch, Semaphore};

use crate::drive::{DriveItem, FileDetail, Node};
use crate::graph::batch::{BatchRequest, BatchResponse, BATCH_LIMIT};
use crate::graph::client::{ApiClient, ApiError, Payload};
use crate::graph::endpoints::Endpoints;
use crate::progress::{ProgressEvent, ProgressSender};

/// How leaves are enriched: one detail call per leaf, or grouped calls via
/// the provider's batch endpoint with per-item fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchStrategy {
    #[default]
    PerItem,
    Batched,
}

/// A grouped request that failed outright (throttle exhaustion, transport
/// death, undecodable envelope). The members of the group are not lost;
/// the caller falls back to per-item fetching for them.
#[derive(Debug, thiserror::Error)]
#[error("grouped request failed: {source}")]
pub struct BatchFailure {
    #[source]
    pub source: ApiError,
}

/// The only errors that abort the enrichment phase. Everything else
/// degrades to a listing-only detail for the affected item.
#[derive(Debug, thiserror::Error)]
pub enum FetchAborted {
    /// Credential refresh failed mid-phase; every remaining call would fail
    /// the same way, so the run stops instead of emitting garbage.
    #[error("credential refresh failed during enrichment: {0}")]
    Auth(#[from] crate::graph::auth::AuthError),
    #[error("enrichment cancelled")]
    Cancelled,
}

/// Bounded-concurrency enrichment of the crawled leaves.
///
/// Post-condition, both strategies: output length equals input length, and
/// every completed leaf emits exactly one `AddDetails(1)` event - success,
/// degraded, and fallback alike.
pub(crate) struct DetailFetcher<'a> {
    client: &'a ApiClient,
    endpoints: &'a Endpoints,
    drive_id: &'a str,
    strategy: FetchStrategy,
    gate: Arc<Semaphore>,
    progress: &'a ProgressSender,
    shutdown: Option<&'a watch::Receiver<bool>>,
}

impl<'a> DetailFetcher<'a> {
    pub fn new(
        client: &'a ApiClient,
        endpoints: &'a Endpoints,
        drive_id: &'a str,
        strategy: FetchStrategy,
        gate: Arc<Semaphore>,
        progress: &'a ProgressSender,
        shutdown: Option<&'a watch::Receiver<bool>>,
    ) -> Self {
        Self {
            client,
            endpoints,
            drive_id,
            strategy,
            gate,
            progress,
            shutdown,
        }
    }

    pub async fn run(&self, leaves: &[Node]) -> Result<Vec<FileDetail>, FetchAborted> {
        match self.strategy {
            FetchStrategy::PerItem => self.run_per_item(leaves).await,
            FetchStrategy::Batched => self.run_batched(leaves).await,
        }
    }

    async fn run_per_item(&self, leaves: &[Node]) -> Result<Vec<FileDetail>, FetchAborted> {
        let tasks = leaves.iter().map(|leaf| async move {
            let _permit = self.acquire_slot().await;
            if self.stopped() {
                return Err(FetchAborted::Cancelled);
            }
            let detail = self.fetch_one(leaf).await?;
            self.progress.emit(ProgressEvent::AddDetails(1));
            Ok(detail)
        });

        collect(futures::future::join_all(tasks).await)
    }

    async fn run_batched(&self, leaves: &[Node]) -> Result<Vec<FileDetail>, FetchAborted> {
        let tasks = leaves.chunks(BATCH_LIMIT).map(|group| async move {
            let _permit = self.acquire_slot().await;
            if self.stopped() {
                return Err(FetchAborted::Cancelled);
            }
            match self.fetch_group(group).await {
                Ok(details) => Ok(details),
                Err(failure) => {
                    tracing::warn!(
                        group_size = group.len(),
                        error = %failure,
                        "grouped request failed, falling back to per-item fetch"
                    );
                    // Still under this group's slot, so the configured
                    // fan-out bound holds during the fallback too.
                    let mut details = Vec::with_capacity(group.len());
                    for leaf in group {
                        details.push(self.fetch_one(leaf).await?);
                        self.progress.emit(ProgressEvent::AddDetails(1));
                    }
                    Ok(details)
                }
            }
        });

        let groups = collect(futures::future::join_all(tasks).await)?;
        Ok(groups.into_iter().flatten().collect())
    }

    /// One enrichment call. Failure degrades to whatever the listing knew,
    /// except for auth failure which aborts the phase.
    async fn fetch_one(&self, leaf: &Node) -> Result<FileDetail, FetchAborted> {
        let mut detail = FileDetail::from_listing(leaf);
        let url = self.endpoints.item_detail(self.drive_id, &leaf.id);
        match self.client.get(&url).await {
            Ok(Payload::Json(value)) => match serde_json::from_value::<DriveItem>(value) {
                Ok(item) => detail.apply_item(&item),
                Err(error) => {
                    tracing::warn!(item = %leaf.id, %error, "undecodable detail response, keeping listing fields");
                }
            },
            Ok(Payload::Text(_)) => {
                tracing::warn!(item = %leaf.id, "non-JSON detail response, keeping listing fields");
            }
            Err(ApiError::Auth(error)) => return Err(FetchAborted::Auth(error)),
            Err(error) => {
                tracing::warn!(item = %leaf.id, %error, "detail fetch failed, keeping listing fields");
            }
        }
        Ok(detail)
    }

    /// One grouped call, demultiplexed by positional sub-request id. A
    /// non-success sub-status degrades that member only; a missing id is
    /// treated the same way.
    async fn fetch_group(&self, group: &[Node]) -> Result<Vec<FileDetail>, BatchFailure> {
        let request = BatchRequest::for_details(self.drive_id, group);
        let body = serde_json::to_value(&request)
            .map_err(|e| BatchFailure { source: ApiError::Decode(e) })?;

        let payload = self
            .client
            .post_json(&self.endpoints.batch(), body)
            .await
            .map_err(|source| BatchFailure { source })?;
        let response: BatchResponse = payload
            .decode()
            .map_err(|source| BatchFailure { source })?;
        let mut by_id = response.into_map();

        let details = group
            .iter()
            .enumerate()
            .map(|(index, leaf)| {
                let mut detail = FileDetail::from_listing(leaf);
                match by_id.remove(&index.to_string()) {
                    Some(sub) if sub.is_success() => {
                        if let Some(body) = sub.body {
                            match serde_json::from_value::<DriveItem>(body) {
                                Ok(item) => detail.apply_item(&item),
                                Err(error) => {
                                    tracing::warn!(item = %leaf.id, %error, "undecodable batch body, keeping listing fields");
                                }
                            }
                        }
                    }
                    Some(sub) => {
                        tracing::warn!(
                            item = %leaf.id,
                            status = sub.status,
                            "batch sub-request failed, keeping listing fields"
                        );
                    }
                    None => {
                        tracing::warn!(item = %leaf.id, "batch response missing sub-request, keeping listing fields");
                    }
                }
                self.progress.emit(ProgressEvent::AddDetails(1));
                detail
            })
            .collect();

        Ok(details)
    }

    async fn acquire_slot(&self) -> tokio::sync::SemaphorePermit<'_> {
        // The gate lives for the whole run and is never closed.
        self.gate
            .acquire()
            .await
            .expect("concurrency gate closed mid-run")
    }

    fn stopped(&self) -> bool {
        self.shutdown.map(|rx| *rx.borrow()).unwrap_or(false)
    }
}

/// Fold per-task results; the first abort wins, otherwise keep everything.
fn collect<T>(outcomes: Vec<Result<T, FetchAborted>>) -> Result<Vec<T>, FetchAborted> {
    let mut collected = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        collected.push(outcome?);
    }
    Ok(collected)
}
