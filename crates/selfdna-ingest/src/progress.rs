//! Ingestion progress reporting
//!
//! The pipeline is the only writer; any number of pollers may read
//! concurrently. Both counters live in one atomic word so a reader never
//! sees `processed` from one update paired with `total` from another.

use indicatif::{ProgressBar, ProgressStyle};
use selfdna_common::types::{ProgressState, IDLE_TOTAL};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const COUNTER_BITS: u32 = 32;
const COUNTER_MASK: u64 = (1 << COUNTER_BITS) - 1;

/// Shared `(processed, total)` pair.
///
/// Each counter is clamped to `u32::MAX`.
#[derive(Debug)]
pub struct ProgressReporter {
    state: AtomicU64,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    /// Starts idle at `(0, 1)`
    pub fn new() -> Self {
        Self {
            state: AtomicU64::new(pack(0, IDLE_TOTAL)),
        }
    }

    /// Begin a run over `total` records
    pub fn reset(&self, total: u64) {
        self.state.store(pack(0, total), Ordering::Release);
    }

    pub fn advance(&self, processed: u64, total: u64) {
        self.state.store(pack(processed, total), Ordering::Release);
    }

    /// Return to the idle state
    pub fn clear(&self) {
        self.reset(IDLE_TOTAL);
    }

    pub fn snapshot(&self) -> ProgressState {
        unpack(self.state.load(Ordering::Acquire))
    }
}

fn pack(processed: u64, total: u64) -> u64 {
    (processed.min(COUNTER_MASK) << COUNTER_BITS) | total.min(COUNTER_MASK)
}

fn unpack(word: u64) -> ProgressState {
    ProgressState::new(word >> COUNTER_BITS, word & COUNTER_MASK)
}

/// Create a progress bar for variant processing
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(message.to_string());
    pb
}

/// Poll `reporter` every `interval` and mirror it onto `bar` until `stop`
/// fires. Idle and empty states are not drawn.
pub fn spawn_monitor(
    reporter: Arc<ProgressReporter>,
    interval: Duration,
    bar: ProgressBar,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => draw(&bar, reporter.snapshot()),
            }
        }

        draw(&bar, reporter.snapshot());
    })
}

fn draw(bar: &ProgressBar, state: ProgressState) {
    if let Some(line) = state.render() {
        debug!("{}", line);
        bar.set_length(state.total);
        bar.set_position(state.processed);
    }
}
