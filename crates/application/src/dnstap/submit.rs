use bytes::Bytes;
use ferrous_dnstap_domain::DnstapEvent;
use tracing::trace;

use crate::ports::{DeliveryQueue, DnstapCodec, SubmitOutcome};

/// What happened to a single logging call.
///
/// Purely informational: no caller on the resolution path needs to act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The category is switched off; nothing was built.
    Disabled,
    /// The environment has no delivery queue.
    NotInitialized,
    /// The transport accepted the frame.
    Queued,
    /// The codec failed; the event is lost.
    EncodeFailed,
    /// The codec produced nothing to send.
    Empty,
    /// The queue refused the frame and it was released here.
    Rejected,
}

/// Encode an event and hand it to the worker's queue.
pub fn submit_event(
    codec: &dyn DnstapCodec,
    queue: &mut dyn DeliveryQueue,
    event: &DnstapEvent<'_>,
) -> SendStatus {
    match codec.encode(event) {
        Ok(frame) => submit_frame(queue, frame),
        Err(e) => {
            trace!(
                error = %e,
                message_type = %event.message_type,
                protocol = event.protocol.as_str(),
                "dnstap: dropping event, encode failed"
            );
            SendStatus::EncodeFailed
        }
    }
}

/// Hand an encoded frame to the queue.
///
/// The frame is moved in. Exactly one side releases it: the transport after
/// delivery when accepted, this function when rejected.
pub fn submit_frame(queue: &mut dyn DeliveryQueue, frame: Bytes) -> SendStatus {
    if frame.is_empty() {
        return SendStatus::Empty;
    }

    match queue.submit(frame) {
        SubmitOutcome::Accepted => SendStatus::Queued,
        SubmitOutcome::Rejected(frame) => {
            trace!(len = frame.len(), "dnstap: dropping event, queue rejected frame");
            drop(frame);
            SendStatus::Rejected
        }
    }
}
