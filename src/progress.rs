//! Progress and status reporting.
//!
//! Requests and transfers push [`ProgressEvent`]s into a [`ProgressReporter`];
//! a front end drains the matching receiver. A disabled reporter drops
//! everything, so library code can report unconditionally.

use tokio::sync::mpsc;
use tracing::debug;

/// A status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A request moved to step `current` of `total`.
    Step {
        current: u8,
        total: u8,
        status: String,
    },
    /// Bytes received so far for a transfer.
    Transfer {
        filename: String,
        received: u64,
        total: u64,
    },
}

impl ProgressEvent {
    /// Completion as a percentage, when it can be computed.
    pub fn percent(&self) -> Option<f64> {
        match self {
            Self::Step { current, total, .. } if *total > 0 => {
                Some(f64::from(*current) * 100.0 / f64::from(*total))
            }
            Self::Transfer {
                received, total, ..
            } if *total > 0 => Some(*received as f64 * 100.0 / *total as f64),
            _ => None,
        }
    }
}

/// Sending side of a progress stream. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    /// A reporter and the receiver its events arrive on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A reporter that discards events.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn step(&self, current: u8, total: u8, status: impl Into<String>) {
        let status = status.into();
        debug!(current, total, status = %status, "Progress");
        self.emit(ProgressEvent::Step {
            current,
            total,
            status,
        });
    }

    pub fn transfer(&self, filename: &str, received: u64, total: u64) {
        debug!(filename = %filename, received, total, "Transfer progress");
        self.emit(ProgressEvent::Transfer {
            filename: filename.to_string(),
            received,
            total,
        });
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // The front end may have stopped listening.
            let _ = tx.send(event);
        }
    }
}
