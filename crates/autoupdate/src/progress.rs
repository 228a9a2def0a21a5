//! Download progress accounting and the host progress capability.

use crate::error::DownloadError;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Minimum advance, in percentage points, between two heartbeat events.
const HEARTBEAT_STEP: f64 = 2.0;

/// Progress of one transfer as shown to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Whole percentage of the declared length, 0 to 100.
    Percent(u8),
    /// The server did not declare a usable length.
    Unknown { bytes_transferred: u64 },
}

impl Progress {
    /// The percentage, or `None` when the total is unknown.
    pub fn percent(&self) -> Option<u8> {
        match self {
            Progress::Percent(percent) => Some(*percent),
            Progress::Unknown { .. } => None,
        }
    }
}

/// Renders the textual percentage; an unknown total renders as `-1`.
impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::Percent(percent) => write!(f, "{percent}"),
            Progress::Unknown { .. } => f.write_str("-1"),
        }
    }
}

/// Host capability notified while an update downloads.
///
/// Calls happen on the thread driving the transfer, so implementations must
/// return promptly; a blocking implementation stalls the download.
pub trait Updater: Send + Sync {
    fn show_progress(&self, progress: &Progress);

    /// Called exactly once when a download fails.
    fn show_error(&self, _error: &DownloadError) {}
}

/// Forwards progress to a channel so a host on another thread never blocks
/// the transfer loop.
#[derive(Debug, Clone)]
pub struct ChannelUpdater {
    progress: UnboundedSender<Progress>,
}

impl ChannelUpdater {
    /// Forward every progress update to `progress`.
    pub fn new(progress: UnboundedSender<Progress>) -> Self {
        Self { progress }
    }
}

impl Updater for ChannelUpdater {
    fn show_progress(&self, progress: &Progress) {
        // A closed receiver means the host stopped listening; keep downloading.
        let _ = self.progress.send(*progress);
    }
}

/// Byte accounting for a single transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferState {
    /// Bytes read from the network so far.
    pub bytes_transferred: u64,
    /// Declared length, `None` when absent or zero.
    pub expected_length: Option<u64>,
    /// Percentage at the last heartbeat.
    pub last_reported_percent: f64,
}

impl TransferState {
    /// Fresh state; a zero length counts as unknown.
    pub fn new(expected_length: Option<u64>) -> Self {
        Self {
            bytes_transferred: 0,
            expected_length: expected_length.filter(|len| *len > 0),
            last_reported_percent: 0.0,
        }
    }

    fn percent(&self) -> Option<f64> {
        let expected = self.expected_length?;
        let percent = self.bytes_transferred as f64 / expected as f64 * 100.0;
        Some(percent.min(100.0))
    }

    /// Progress as shown to the host.
    pub fn progress(&self) -> Progress {
        match self.percent() {
            Some(percent) => Progress::Percent(percent.floor() as u8),
            None => Progress::Unknown {
                bytes_transferred: self.bytes_transferred,
            },
        }
    }
}

/// Pass-through reader that counts bytes and reports progress on every read.
pub struct ProgressReader<R> {
    inner: R,
    updater: Arc<dyn Updater>,
    state: TransferState,
}

impl<R: Read> ProgressReader<R> {
    /// Wrap `inner`, reporting to `updater` against `expected_length`.
    pub fn new(inner: R, expected_length: Option<u64>, updater: Arc<dyn Updater>) -> Self {
        Self {
            inner,
            updater,
            state: TransferState::new(expected_length),
        }
    }

    /// Bytes counted so far.
    pub fn state(&self) -> &TransferState {
        &self.state
    }

    fn record(&mut self, n: usize) {
        self.state.bytes_transferred += n as u64;
        self.updater.show_progress(&self.state.progress());

        if let Some(percent) = self.state.percent() {
            if percent - self.state.last_reported_percent > HEARTBEAT_STEP {
                tracing::info!(
                    percent = percent.floor() as u8,
                    bytes = self.state.bytes_transferred,
                    "update download progress"
                );
                self.state.last_reported_percent = percent;
            }
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.record(n);
        }
        Ok(n)
    }
}
