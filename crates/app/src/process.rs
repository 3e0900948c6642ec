//! Process-level plumbing: tracing bootstrap, panic logging, and the
//! signal-to-watch shutdown bridge.

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Install the subscriber. The returned guard must stay alive for the
/// process lifetime or buffered log lines are lost on exit.
pub fn init_tracing(verbose: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(non_blocking_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();

    guard
}

/// Registers a panic hook that logs panics using the `tracing` crate
pub fn register_panic_logger() {
    std::panic::set_hook(Box::new(|panic| match panic.location() {
        Some(loc) => {
            tracing::error!(
                message = %panic,
                panic.file = loc.file(),
                panic.line = loc.line(),
                panic.column = loc.column(),
            );
        }
        None => tracing::error!(message = %panic),
    }));
}

pub fn report_build_info() {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "drivescan starting up");
}

/// Spawns a task that listens for SIGINT and SIGTERM and flips a shutdown
/// watch.
///
/// Returns the join handle, the sender (for programmatic shutdown), and the
/// receiver.
pub fn graceful_shutdown_blocker() -> (JoinHandle<()>, watch::Sender<bool>, watch::Receiver<bool>) {
    let mut sigint = signal(SignalKind::interrupt()).unwrap();
    let mut sigterm = signal(SignalKind::terminate()).unwrap();

    let (tx, rx) = watch::channel(false);
    let signal_tx = tx.clone();

    let handle = tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("SIGINT received, cancelling the run");
            }
            _ = sigterm.recv() => {
                tracing::info!("SIGTERM received, cancelling the run");
            }
        }

        let _ = signal_tx.send(true);
    });

    (handle, tx, rx)
}
