//! Ferrous DNS dnstap Domain Layer
pub mod config;
pub mod dnstap_event;
pub mod dnstap_message;
pub mod errors;

pub use config::{
    Config, ConfigError, DnstapConfig, DnstapTarget, LoggingConfig, DEFAULT_MAX_FRAME_SIZE,
};
pub use dnstap_event::{DnstapEvent, DnstapTime, PeerAddress, PeerIp, SocketProtocol};
pub use dnstap_message::{DnstapMessageFlags, DnstapMessageType, MessageRole};
pub use errors::DomainError;
