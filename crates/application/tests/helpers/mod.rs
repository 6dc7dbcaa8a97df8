#![allow(dead_code)]

pub mod mock_codec;
pub mod mock_transport;

pub use mock_codec::{CapturedEvent, RecordingCodec};
pub use mock_transport::{MockTransport, TransportProbe};
