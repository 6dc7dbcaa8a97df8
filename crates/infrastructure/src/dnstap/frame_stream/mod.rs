//! Frame Streams transport to a dnstap collector.
//!
//! One writer thread owns the socket. Each worker gets its own bounded queue
//! into that thread; submitting never blocks and a full queue rejects.

pub mod control;
mod connection;
mod queue;
mod writer;

pub use queue::{FrameStreamQueue, FrameStreamStats};

use bytes::Bytes;
use ferrous_dnstap_application::ports::{DeliveryQueue, DnstapTransport};
use ferrous_dnstap_domain::{DnstapConfig, DnstapTarget, DomainError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use writer::FrameWriter;

#[derive(Debug, Clone)]
pub struct FrameStreamOptions {
    pub bidirectional: bool,
    pub queue_capacity: usize,
    pub reopen_interval: Duration,
    pub flush_timeout: Duration,
    pub max_frame_size: usize,
}

impl FrameStreamOptions {
    pub fn from_config(cfg: &DnstapConfig) -> Self {
        Self {
            bidirectional: cfg.bidirectional,
            queue_capacity: cfg.queue_capacity,
            reopen_interval: Duration::from_secs(cfg.reopen_interval_secs),
            flush_timeout: Duration::from_millis(cfg.flush_timeout_ms),
            max_frame_size: cfg.max_frame_size,
        }
    }
}

impl Default for FrameStreamOptions {
    fn default() -> Self {
        Self::from_config(&DnstapConfig::default())
    }
}

pub struct FrameStreamTransport {
    senders: Mutex<Vec<mpsc::Sender<Bytes>>>,
    stats: Arc<FrameStreamStats>,
    cancel: CancellationToken,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl FrameStreamTransport {
    /// Connect to the collector and start the writer thread.
    ///
    /// Provisions `queue_count` delivery queues, one per worker. Fails when
    /// the collector cannot be reached at all; later disconnects are handled
    /// by the writer.
    pub fn establish(
        target: &DnstapTarget,
        queue_count: usize,
        options: FrameStreamOptions,
    ) -> Result<Self, DomainError> {
        let socket = connection::connect_blocking(target)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let capacity = options.queue_capacity.max(1);
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..queue_count).map(|_| mpsc::channel(capacity)).unzip();

        let stats = Arc::new(FrameStreamStats::default());
        let cancel = CancellationToken::new();
        let writer = FrameWriter::new(target.clone(), options, stats.clone(), cancel.clone());

        let handle = std::thread::Builder::new()
            .name("dnstap-writer".to_string())
            .spawn(move || runtime.block_on(writer.run(socket, receivers)))?;

        debug!(collector = %target, queue_count, "dnstap: writer thread started");

        Ok(Self {
            senders: Mutex::new(senders),
            stats,
            cancel,
            writer: Mutex::new(Some(handle)),
        })
    }

    pub fn stats(&self) -> Arc<FrameStreamStats> {
        Arc::clone(&self.stats)
    }
}

impl DnstapTransport for FrameStreamTransport {
    fn acquire_queue(&self) -> Option<Box<dyn DeliveryQueue>> {
        let tx = self
            .senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()?;
        Some(Box::new(FrameStreamQueue::new(tx, Arc::clone(&self.stats))))
    }

    /// Stop the writer once queued frames are flushed, and wait for it.
    fn shutdown(&self) {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.cancel.cancel();

        let handle = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("dnstap: writer thread panicked");
            }
        }
    }
}

impl Drop for FrameStreamTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}
