//! Ferrous DNS dnstap Infrastructure Layer
pub mod dnstap;
pub mod logging;
