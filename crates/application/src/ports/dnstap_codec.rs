use bytes::Bytes;
use ferrous_dnstap_domain::{DnstapEvent, DomainError};

/// Turns a borrowed dnstap event into a self-contained wire buffer.
pub trait DnstapCodec: Send + Sync {
    fn encode(&self, event: &DnstapEvent<'_>) -> Result<Bytes, DomainError>;
}
