/**
 * Scan orchestration
 * ==================
 * `Scanner` is the explicitly constructed context for one crawl: it owns
 * the resilient client, the token manager, the concurrency gate and the
 * progress sink, and threads them through the two phases:
 *  1. sequential breadth-first hierarchy enumeration (`crawl`)
 *  2. gated, concurrent per-leaf enrichment (`details`)
 * Traversal failures abort the run; enrichment failures degrade items.
 */
pub mod crawl;
pub mod details;

use std::sync::Arc;

use tokio::sync::{watch, Semaphore};

use crate::drive::{FileDetail, Node};
use crate::graph::auth::{AuthError, TokenConfig, TokenManager};
use crate::graph::client::{ApiClient, RetryPolicy};
use crate::graph::endpoints::Endpoints;
use crate::graph::transport::Transport;
use crate::progress::{ProgressEvent, ProgressSender};

pub use crawl::{CrawlError, CrawlOutcome};
pub use details::{BatchFailure, FetchAborted, FetchStrategy};

use crawl::Crawler;
use details::DetailFetcher;

pub const DEFAULT_PAGE_SIZE: u32 = 200;
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Operator-facing knobs for one run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub drive_id: String,
    pub page_size: u32,
    /// Cap on in-flight enrichment requests (items or groups).
    pub concurrency: usize,
    pub strategy: FetchStrategy,
    pub retry: RetryPolicy,
    pub use_beta: bool,
}

impl ScanConfig {
    pub fn new(drive_id: impl Into<String>) -> Self {
        Self {
            drive_id: drive_id.into(),
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            strategy: FetchStrategy::default(),
            retry: RetryPolicy::default(),
            use_beta: false,
        }
    }
}

/// Top-level failure, one variant per phase.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("token acquisition failed: {0}")]
    Token(#[from] AuthError),
    #[error("traversal failed: {0}")]
    Traversal(#[source] CrawlError),
    #[error("enrichment failed: {0}")]
    Enrichment(#[source] AuthError),
    #[error("scan cancelled before completion")]
    Cancelled,
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct ScanReport {
    pub containers: Vec<Node>,
    pub details: Vec<FileDetail>,
}

pub struct Scanner {
    config: ScanConfig,
    endpoints: Endpoints,
    tokens: Arc<TokenManager>,
    client: ApiClient,
    gate: Arc<Semaphore>,
    progress: ProgressSender,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Scanner {
    pub fn new(
        config: ScanConfig,
        credentials: TokenConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let endpoints = Endpoints::new(config.use_beta);
        let tokens = Arc::new(TokenManager::new(credentials, transport.clone()));
        let client = ApiClient::new(transport, tokens.clone(), config.retry.clone());
        let gate = Arc::new(Semaphore::new(config.concurrency.max(1)));

        Self {
            config,
            endpoints,
            tokens,
            client,
            gate,
            progress: ProgressSender::disabled(),
            shutdown: None,
        }
    }

    /// Point the engine at a non-default API base (test servers).
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Run the full pipeline. Always emits a final `Stop` event so an
    /// attached reporter terminates, whether the run succeeded or not.
    pub async fn run(&self) -> Result<ScanReport, ScanError> {
        let result = self.run_inner().await;
        self.progress.stop();
        result
    }

    async fn run_inner(&self) -> Result<ScanReport, ScanError> {
        // Fail on bad credentials before any traversal work happens.
        self.tokens.ensure_valid().await?;

        tracing::info!(drive = %self.config.drive_id, "collecting folder structure and file list");
        let crawler = Crawler::new(
            &self.client,
            &self.endpoints,
            &self.config.drive_id,
            self.config.page_size,
            &self.progress,
            self.shutdown.as_ref(),
        );
        let outcome = crawler.run().await.map_err(|error| match error {
            CrawlError::Cancelled => ScanError::Cancelled,
            other => ScanError::Traversal(other),
        })?;

        self.progress.emit(ProgressEvent::SetInitial {
            containers: outcome.containers.len() as u64,
            leaves: outcome.leaves.len() as u64,
        });

        tracing::info!(
            leaves = outcome.leaves.len(),
            concurrency = self.config.concurrency,
            strategy = ?self.config.strategy,
            "fetching file details"
        );
        let fetcher = DetailFetcher::new(
            &self.client,
            &self.endpoints,
            &self.config.drive_id,
            self.config.strategy,
            self.gate.clone(),
            &self.progress,
            self.shutdown.as_ref(),
        );
        let details = fetcher.run(&outcome.leaves).await.map_err(|error| match error {
            FetchAborted::Cancelled => ScanError::Cancelled,
            FetchAborted::Auth(auth) => ScanError::Enrichment(auth),
        })?;

        debug_assert_eq!(details.len(), outcome.leaves.len());
        Ok(ScanReport {
            containers: outcome.containers,
            details,
        })
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
