use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::entry::DecisionEntry;
use crate::writer::{DecisionWriteError, DecisionWriter};

/// Default capacity of the channel between producers and the writer task.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Idle time after which buffered entries are flushed.
const FLUSH_AFTER_IDLE: Duration = Duration::from_secs(1);

/// Cloneable handle that hands [`DecisionEntry`] values to a background
/// writer task.
///
/// The task exits after the last clone is dropped and every queued entry has
/// been written and flushed. Await the returned [`JoinHandle`] to wait for
/// that.
#[derive(Clone)]
pub struct DecisionSink {
    tx: mpsc::Sender<DecisionEntry>,
}

impl DecisionSink {
    /// Open the log at `path` and spawn the writer task.
    pub async fn start(
        path: impl AsRef<Path>,
    ) -> Result<(Self, JoinHandle<()>), DecisionWriteError> {
        Self::with_capacity(path, DEFAULT_CAPACITY).await
    }

    /// Like [`start`](Self::start) with an explicit channel capacity.
    pub async fn with_capacity(
        path: impl AsRef<Path>,
        capacity: usize,
    ) -> Result<(Self, JoinHandle<()>), DecisionWriteError> {
        let writer = DecisionWriter::open(path).await?;
        let (tx, rx) = mpsc::channel(capacity.max(1));

        tracing::debug!(path = %writer.path().display(), capacity, "decision log opened");
        let handle = tokio::spawn(drain(writer, rx));

        Ok((Self { tx }, handle))
    }

    /// Queue `entry`, waiting for channel capacity if needed.
    pub async fn record(&self, entry: DecisionEntry) {
        if let Err(err) = self.tx.send(entry).await {
            tracing::warn!(event = ?err.0.event, "decision log closed; entry dropped");
        }
    }

    /// Queue `entry` without waiting. Returns `false` if it was dropped.
    pub fn try_record(&self, entry: DecisionEntry) -> bool {
        match self.tx.try_send(entry) {
            Ok(()) => true,
            Err(TrySendError::Full(entry)) => {
                tracing::warn!(event = ?entry.event, "decision log backlog full; entry dropped");
                false
            }
            Err(TrySendError::Closed(entry)) => {
                tracing::warn!(event = ?entry.event, "decision log closed; entry dropped");
                false
            }
        }
    }
}

/// Writer task body: write entries as they arrive, flush once the channel
/// stays idle for [`FLUSH_AFTER_IDLE`] and once more on close.
async fn drain(mut writer: DecisionWriter, mut rx: mpsc::Receiver<DecisionEntry>) {
    let mut pending = false;

    loop {
        match tokio::time::timeout(FLUSH_AFTER_IDLE, rx.recv()).await {
            Ok(Some(entry)) => match writer.write(&entry).await {
                Ok(()) => pending = true,
                Err(err) => {
                    tracing::error!(%err, event = ?entry.event, "failed to write decision entry")
                }
            },
            Ok(None) => break,
            Err(_idle) => {
                if pending {
                    match writer.flush().await {
                        Ok(()) => pending = false,
                        Err(err) => tracing::error!(%err, "idle decision log flush failed"),
                    }
                }
            }
        }
    }

    if pending {
        if let Err(err) = writer.flush().await {
            tracing::error!(%err, "failed to flush decision log on shutdown");
        }
    }
    tracing::debug!(written = writer.written(), "decision log writer stopped");
}
