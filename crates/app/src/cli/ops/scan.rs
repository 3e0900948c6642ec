use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use common::graph::endpoints::token_url;
use common::graph::{HttpTransport, RetryPolicy, TokenConfig, DEFAULT_MAX_RETRIES};
use common::progress::{run_reporter, ProgressSender};
use common::scan::{
    FetchStrategy, ScanConfig, ScanError, Scanner, DEFAULT_CONCURRENCY, DEFAULT_PAGE_SIZE,
};

use crate::export::{self, ExportError};

/// Default permission scope for app-only Graph access.
const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

#[derive(Args, Debug, Clone)]
pub struct Scan {
    /// Directory (tenant) id of the app registration
    #[arg(long, env = "GRAPH_TENANT_ID")]
    pub tenant_id: String,

    /// Application (client) id
    #[arg(long, env = "GRAPH_CLIENT_ID")]
    pub client_id: String,

    /// Client secret; prefer the environment variable over the flag
    #[arg(long, env = "GRAPH_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// Drive to enumerate
    #[arg(long, env = "GRAPH_DRIVE_ID")]
    pub drive_id: String,

    /// Listing page size
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Concurrent enrichment requests (items, or groups in batch mode)
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Retry budget per request
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Abort on the first 429/5xx instead of backing off
    #[arg(long)]
    pub fail_on_throttle: bool,

    /// Enrich via grouped $batch calls instead of one call per file
    #[arg(long)]
    pub batch: bool,

    /// Use the provider's beta API surface
    #[arg(long)]
    pub use_beta: bool,

    /// Directory the export files land in
    #[arg(long, default_value = "./output")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub export_json: bool,

    #[arg(long)]
    pub export_csv: bool,

    /// Seconds between progress status lines (0 disables the reporter)
    #[arg(long, default_value_t = 10)]
    pub progress_interval: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ScanOpError {
    #[error("failed to build HTTP transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Scan {
    type Error = ScanOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let transport = Arc::new(HttpTransport::new()?);
        let credentials = TokenConfig {
            token_url: token_url(&self.tenant_id),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            scope: DEFAULT_SCOPE.to_owned(),
        };

        let mut config = ScanConfig::new(&self.drive_id);
        config.page_size = self.page_size;
        config.concurrency = self.concurrency;
        config.strategy = if self.batch {
            FetchStrategy::Batched
        } else {
            FetchStrategy::PerItem
        };
        config.retry = RetryPolicy {
            max_retries: self.max_retries,
            fail_fast: self.fail_on_throttle,
        };
        config.use_beta = self.use_beta;

        let mut scanner =
            Scanner::new(config, credentials, transport).with_shutdown(ctx.shutdown.clone());

        let reporter = if self.progress_interval > 0 {
            let (sender, rx) = ProgressSender::channel();
            scanner = scanner.with_progress(sender);
            Some(tokio::spawn(run_reporter(
                rx,
                Duration::from_secs(self.progress_interval),
            )))
        } else {
            None
        };

        let result = scanner.run().await;
        // The scanner emits Stop on every exit path; let the reporter drain
        // before the run counts as finished.
        if let Some(handle) = reporter {
            let _ = handle.await;
        }
        let report = result?;

        let mut lines = vec![format!(
            "{} containers, {} files",
            report.containers.len(),
            report.details.len()
        )];
        if self.export_json {
            let path = export::write_json(&self.output_dir, &report.details)?;
            lines.push(format!("JSON exported: {}", path.display()));
        }
        if self.export_csv {
            let path = export::write_csv(&self.output_dir, &report.details)?;
            lines.push(format!("CSV exported: {}", path.display()));
        }

        Ok(lines.join("\n"))
    }
}
