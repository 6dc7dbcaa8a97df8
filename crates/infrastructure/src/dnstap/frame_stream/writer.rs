use bytes::Bytes;
use ferrous_dnstap_domain::{DnstapTarget, DomainError};
use futures::stream::{self, SelectAll, StreamExt};
use futures::{FutureExt, Stream};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connection::{self, BoxedStream, FrameConnection, PendingSocket};
use super::queue::FrameStreamStats;
use super::FrameStreamOptions;

const MAX_BATCH: usize = 256;
/// How long socket work may continue once shutdown has been requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

type FrameSource = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// Drains every worker queue into the collector connection.
pub(crate) struct FrameWriter {
    target: DnstapTarget,
    options: FrameStreamOptions,
    stats: Arc<FrameStreamStats>,
    cancel: CancellationToken,
    connection: Option<FrameConnection>,
    retry_at: Instant,
    last_flush: Instant,
    /// Frames buffered since the last successful flush.
    pending: usize,
    /// Set once shutdown starts; no socket work runs past it.
    deadline: Option<Instant>,
}

impl FrameWriter {
    pub(crate) fn new(
        target: DnstapTarget,
        options: FrameStreamOptions,
        stats: Arc<FrameStreamStats>,
        cancel: CancellationToken,
    ) -> Self {
        let now = Instant::now();
        Self {
            target,
            options,
            stats,
            cancel,
            connection: None,
            retry_at: now,
            last_flush: now,
            pending: 0,
            deadline: None,
        }
    }

    pub(crate) async fn run(
        mut self,
        socket: PendingSocket,
        receivers: Vec<mpsc::Receiver<Bytes>>,
    ) {
        let mut frames = merge(receivers);

        match socket.into_stream() {
            Ok(stream) => {
                self.start_session(stream).await;
            }
            Err(e) => self.connection_lost(e),
        }

        let mut batch = Vec::with_capacity(MAX_BATCH);
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                next = frames.next() => {
                    let Some(frame) = next else { break };
                    batch.push(frame);
                    let drained = drain_ready(&mut frames, &mut batch);
                    self.write_batch(&mut batch).await;
                    if drained || self.last_flush.elapsed() >= self.options.flush_timeout {
                        self.flush().await;
                    }
                }
                _ = sleep_until(self.last_flush + self.options.flush_timeout), if self.pending > 0 => {
                    self.flush().await;
                }
                _ = sleep_until(self.retry_at), if self.connection.is_none() => {
                    self.reopen().await;
                }
            }
        }

        // Whatever is already queued still goes out before STOP, within the
        // grace period.
        self.deadline = Some(Instant::now() + SHUTDOWN_GRACE);
        loop {
            let drained = drain_ready(&mut frames, &mut batch);
            self.write_batch(&mut batch).await;
            if drained {
                break;
            }
        }
        self.flush().await;
        self.finish().await;
    }

    async fn start_session(&mut self, stream: BoxedStream) -> bool {
        let open = FrameConnection::open(stream, self.options.bidirectional);
        match bounded(&self.cancel, self.deadline, open).await {
            Ok(connection) => {
                info!(collector = %self.target, "dnstap: connected to collector");
                self.connection = Some(connection);
                self.last_flush = Instant::now();
                true
            }
            Err(e) => {
                self.connection_lost(e);
                false
            }
        }
    }

    async fn reopen(&mut self) {
        debug!(collector = %self.target, "dnstap: reopening connection");
        match bounded(&self.cancel, self.deadline, connection::connect(&self.target)).await {
            Ok(stream) => {
                if self.start_session(stream).await {
                    self.stats.add_reconnect();
                }
            }
            Err(e) => self.connection_lost(e),
        }
    }

    fn connection_lost(&mut self, error: DomainError) {
        warn!(
            collector = %self.target,
            error = %error,
            retry_in_secs = self.options.reopen_interval.as_secs(),
            "dnstap: collector connection unavailable"
        );
        self.connection = None;
        self.stats.add_dropped(self.pending);
        self.pending = 0;
        self.retry_at = Instant::now() + self.options.reopen_interval;
    }

    async fn write_batch(&mut self, batch: &mut Vec<Bytes>) {
        let Some(connection) = self.connection.as_mut() else {
            self.stats.add_dropped(batch.len());
            batch.clear();
            return;
        };

        let mut failure = None;
        for frame in batch.iter() {
            let write = connection.write_frame(frame);
            if let Err(e) = bounded(&self.cancel, self.deadline, write).await {
                failure = Some(e);
                break;
            }
        }

        // A frame only counts as written once a flush gets it out; until then
        // a failure loses the whole unflushed run.
        self.pending += batch.len();
        batch.clear();
        if let Some(e) = failure {
            self.connection_lost(e);
        }
    }

    async fn flush(&mut self) {
        self.last_flush = Instant::now();
        if self.pending == 0 {
            return;
        }
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        match bounded(&self.cancel, self.deadline, connection.flush()).await {
            Ok(()) => {
                self.stats.add_written(self.pending);
                self.pending = 0;
            }
            Err(e) => self.connection_lost(e),
        }
    }

    async fn finish(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        match bounded(&self.cancel, self.deadline, connection.close()).await {
            Ok(()) => debug!("dnstap: frame stream finished"),
            Err(e) => warn!(error = %e, "dnstap: unclean frame stream shutdown"),
        }
    }
}

/// Run socket work, giving up once shutdown has had its grace period.
async fn bounded<T, F>(
    cancel: &CancellationToken,
    deadline: Option<Instant>,
    op: F,
) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    let expired = async {
        match deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => {
                cancel.cancelled().await;
                sleep(SHUTDOWN_GRACE).await;
            }
        }
    };
    tokio::select! {
        result = op => result,
        _ = expired => Err(DomainError::TransportUnavailable(
            "shutdown grace period expired".to_string(),
        )),
    }
}

fn merge(receivers: Vec<mpsc::Receiver<Bytes>>) -> SelectAll<FrameSource> {
    stream::select_all(receivers.into_iter().map(|rx| {
        Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        })) as FrameSource
    }))
}

/// Move already-queued frames into `batch` without waiting.
///
/// Returns `true` when nothing else was ready (or every queue is closed),
/// `false` when the batch filled up first.
fn drain_ready(frames: &mut SelectAll<FrameSource>, batch: &mut Vec<Bytes>) -> bool {
    while batch.len() < MAX_BATCH {
        match frames.next().now_or_never() {
            Some(Some(frame)) => batch.push(frame),
            Some(None) | None => return true,
        }
    }
    false
}
