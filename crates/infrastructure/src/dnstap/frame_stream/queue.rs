use bytes::Bytes;
use ferrous_dnstap_application::ports::{DeliveryQueue, SubmitOutcome};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Transport counters, shared by the writer and every queue.
#[derive(Debug, Default)]
pub struct FrameStreamStats {
    frames_written: AtomicU64,
    frames_dropped: AtomicU64,
    frames_rejected: AtomicU64,
    reconnects: AtomicU64,
}

impl FrameStreamStats {
    /// Frames flushed to the collector.
    pub fn frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Relaxed)
    }

    /// Frames the writer discarded while disconnected, or lost unflushed
    /// when the connection failed.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    /// Submissions refused because a queue was full or closed.
    pub fn frames_rejected(&self) -> u64 {
        self.frames_rejected.load(Ordering::Relaxed)
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    pub(crate) fn add_written(&self, n: usize) {
        self.frames_written.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_dropped(&self, n: usize) {
        self.frames_dropped.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }
}

/// One worker's bounded channel into the writer thread.
///
/// Never blocks: a full or closed channel hands the frame back.
pub struct FrameStreamQueue {
    tx: mpsc::Sender<Bytes>,
    stats: Arc<FrameStreamStats>,
}

impl FrameStreamQueue {
    pub(crate) fn new(tx: mpsc::Sender<Bytes>, stats: Arc<FrameStreamStats>) -> Self {
        Self { tx, stats }
    }
}

impl DeliveryQueue for FrameStreamQueue {
    fn submit(&mut self, frame: Bytes) -> SubmitOutcome {
        match self.tx.try_send(frame) {
            Ok(()) => SubmitOutcome::Accepted,
            Err(TrySendError::Full(frame)) | Err(TrySendError::Closed(frame)) => {
                self.stats.frames_rejected.fetch_add(1, Ordering::Relaxed);
                SubmitOutcome::Rejected(frame)
            }
        }
    }
}
