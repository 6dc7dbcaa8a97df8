use bytes::Bytes;
use ferrous_dnstap_application::ports::{DeliveryQueue, DnstapTransport, SubmitOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock DnstapTransport
// ============================================================================

/// Shared view into a [`MockTransport`], kept by the test after the
/// transport itself has been moved into an environment.
#[derive(Clone, Default)]
pub struct TransportProbe {
    frames: Arc<Mutex<Vec<(usize, Bytes)>>>,
    shutdowns: Arc<AtomicUsize>,
    rejected: Arc<AtomicUsize>,
}

impl TransportProbe {
    /// Frames accepted so far, with the index of the queue they came through.
    pub fn submissions(&self) -> Vec<(usize, Bytes)> {
        self.frames.lock().unwrap().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    /// Simulate the writer sending and releasing every accepted frame.
    pub fn deliver_all(&self) -> usize {
        let drained: Vec<_> = self.frames.lock().unwrap().drain(..).collect();
        drained.len()
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown_count() > 0
    }
}

pub struct MockTransport {
    probe: TransportProbe,
    queue_count: usize,
    next_queue: AtomicUsize,
    reject: bool,
}

impl MockTransport {
    pub fn new(queue_count: usize) -> (Self, TransportProbe) {
        Self::build(queue_count, false)
    }

    /// Every queue handed out rejects its submissions, like a full queue.
    pub fn rejecting(queue_count: usize) -> (Self, TransportProbe) {
        Self::build(queue_count, true)
    }

    fn build(queue_count: usize, reject: bool) -> (Self, TransportProbe) {
        let probe = TransportProbe::default();
        let transport = Self {
            probe: probe.clone(),
            queue_count,
            next_queue: AtomicUsize::new(0),
            reject,
        };
        (transport, probe)
    }
}

impl DnstapTransport for MockTransport {
    fn acquire_queue(&self) -> Option<Box<dyn DeliveryQueue>> {
        let index = self.next_queue.fetch_add(1, Ordering::SeqCst);
        if index >= self.queue_count {
            return None;
        }
        Some(Box::new(MockQueue {
            index,
            probe: self.probe.clone(),
            reject: self.reject,
        }))
    }

    fn shutdown(&self) {
        self.probe.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockQueue {
    index: usize,
    probe: TransportProbe,
    reject: bool,
}

impl DeliveryQueue for MockQueue {
    fn submit(&mut self, frame: Bytes) -> SubmitOutcome {
        if self.reject {
            self.probe.rejected.fetch_add(1, Ordering::SeqCst);
            return SubmitOutcome::Rejected(frame);
        }
        self.probe.frames.lock().unwrap().push((self.index, frame));
        SubmitOutcome::Accepted
    }
}
