/**
 * Progress channel
 * ================
 * Producer side never blocks: events go over a bounded flume channel via
 * `try_send`, and are simply dropped when no consumer is attached or the
 * consumer has fallen behind. The single consumer (`run_reporter`)
 * aggregates counters and logs a status line; it exits on `Stop` and the
 * caller awaits it before considering the run complete.
 */
use std::time::Duration;

/// Bound on buffered events. Progress is advisory; anything beyond this is
/// dropped rather than letting a slow consumer stall the scan.
pub const PROGRESS_BUFFER: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Authoritative totals once the hierarchy is fully enumerated.
    SetInitial { containers: u64, leaves: u64 },
    AddContainers(u64),
    AddLeaves(u64),
    AddDetails(u64),
    Stop,
}

/// Monotonically increasing within one run; reset only at run start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCounters {
    pub containers_found: u64,
    pub leaves_found: u64,
    pub details_completed: u64,
}

impl ProgressCounters {
    pub fn apply(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::SetInitial { containers, leaves } => {
                self.containers_found = *containers;
                self.leaves_found = *leaves;
            }
            ProgressEvent::AddContainers(n) => self.containers_found += n,
            ProgressEvent::AddLeaves(n) => self.leaves_found += n,
            ProgressEvent::AddDetails(n) => self.details_completed += n,
            ProgressEvent::Stop => {}
        }
    }
}

/// Cloneable producer handle. A disabled sender swallows every event, so
/// components emit unconditionally and never care whether anyone listens.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Option<flume::Sender<ProgressEvent>>,
}

impl ProgressSender {
    /// A sender with no consumer; every event is dropped.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn channel() -> (Self, flume::Receiver<ProgressEvent>) {
        let (tx, rx) = flume::bounded(PROGRESS_BUFFER);
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // Full or disconnected both mean "nobody is keeping up" - drop.
            let _ = tx.try_send(event);
        }
    }

    pub fn stop(&self) {
        self.emit(ProgressEvent::Stop);
    }
}

/// Consumer loop: render on every event arrival and on a fixed tick,
/// whichever fires first. Returns the final counters once `Stop` arrives
/// (or every sender is gone).
pub async fn run_reporter(
    rx: flume::Receiver<ProgressEvent>,
    interval: Duration,
) -> ProgressCounters {
    let mut counters = ProgressCounters::default();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick completes immediately; skip it so an idle start does
    // not render a zero line.
    ticker.tick().await;

    loop {
        tokio::select! {
            event = rx.recv_async() => match event {
                Ok(ProgressEvent::Stop) | Err(_) => break,
                Ok(event) => {
                    counters.apply(&event);
                    render(&counters);
                }
            },
            _ = ticker.tick() => render(&counters),
        }
    }

    counters
}

fn render(counters: &ProgressCounters) {
    tracing::info!(
        containers = counters.containers_found,
        files = counters.leaves_found,
        details = counters.details_completed,
        "scan progress"
    );
}
