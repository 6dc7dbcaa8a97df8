use bytes::Bytes;

/// Result of handing a frame to a delivery queue.
///
/// Ownership of the frame moves into `submit`. `Accepted` means the transport
/// now owns it and releases it once written (or dropped by its own policy).
/// `Rejected` hands the very same frame back, and the caller releases it.
#[derive(Debug)]
pub enum SubmitOutcome {
    Accepted,
    Rejected(Bytes),
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted)
    }
}

/// A per-worker channel into the transport.
///
/// Each queue is owned by exactly one worker and is never shared, which is
/// why `submit` takes `&mut self` and the trait is not `Sync`.
pub trait DeliveryQueue: Send {
    /// Enqueue without blocking.
    fn submit(&mut self, frame: Bytes) -> SubmitOutcome;
}

/// Shared connection to the dnstap collector.
pub trait DnstapTransport: Send + Sync {
    /// Hand out the next unused delivery queue, or `None` once every queue
    /// provisioned at establishment has been taken.
    fn acquire_queue(&self) -> Option<Box<dyn DeliveryQueue>>;

    /// Tear the connection down. Called once, when the last environment
    /// referencing this transport goes away.
    fn shutdown(&self);
}
