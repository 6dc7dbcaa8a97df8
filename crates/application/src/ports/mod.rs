pub mod dnstap_codec;
pub mod dnstap_transport;

pub use dnstap_codec::DnstapCodec;
pub use dnstap_transport::{DeliveryQueue, DnstapTransport, SubmitOutcome};
