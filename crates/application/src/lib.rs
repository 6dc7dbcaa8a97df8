//! Ferrous DNS dnstap Application Layer
pub mod dnstap;
pub mod ports;
