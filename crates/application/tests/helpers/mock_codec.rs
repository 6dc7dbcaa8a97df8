use bytes::Bytes;
use ferrous_dnstap_application::ports::DnstapCodec;
use ferrous_dnstap_domain::{
    DnstapEvent, DnstapMessageType, DnstapTime, DomainError, PeerAddress, SocketProtocol,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock DnstapCodec
// ============================================================================

/// Owned copy of an event seen by the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub message_type: DnstapMessageType,
    pub timestamp: DnstapTime,
    pub query_time: Option<DnstapTime>,
    pub peer: PeerAddress,
    pub protocol: SocketProtocol,
    pub zone: Option<Vec<u8>>,
    pub message: Vec<u8>,
    pub identity: Option<String>,
    pub version: Option<String>,
}

impl From<&DnstapEvent<'_>> for CapturedEvent {
    fn from(event: &DnstapEvent<'_>) -> Self {
        Self {
            message_type: event.message_type,
            timestamp: event.timestamp,
            query_time: event.query_time,
            peer: event.peer,
            protocol: event.protocol,
            zone: event.zone.map(<[u8]>::to_vec),
            message: event.message.to_vec(),
            identity: event.identity.map(str::to_string),
            version: event.version.map(str::to_string),
        }
    }
}

/// Frame payload that counts how many times it has been released.
pub struct TrackedFrame {
    data: Vec<u8>,
    releases: Arc<AtomicUsize>,
}

impl TrackedFrame {
    pub fn into_bytes(data: Vec<u8>, releases: Arc<AtomicUsize>) -> Bytes {
        Bytes::from_owner(Self { data, releases })
    }
}

impl AsRef<[u8]> for TrackedFrame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for TrackedFrame {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records every event and returns a tracked frame holding the raw message.
#[derive(Clone, Default)]
pub struct RecordingCodec {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    encode_calls: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    fail: bool,
}

impl RecordingCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn encode_calls(&self) -> usize {
        self.encode_calls.load(Ordering::SeqCst)
    }

    /// Frames produced by this codec that have since been released.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl DnstapCodec for RecordingCodec {
    fn encode(&self, event: &DnstapEvent<'_>) -> Result<Bytes, DomainError> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DomainError::FrameTooLarge {
                size: event.message.len(),
                limit: 0,
            });
        }
        self.events.lock().unwrap().push(CapturedEvent::from(event));
        Ok(TrackedFrame::into_bytes(
            event.message.to_vec(),
            self.releases.clone(),
        ))
    }
}
