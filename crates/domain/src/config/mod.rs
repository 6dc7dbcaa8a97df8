//! Configuration module for Ferrous DNS dnstap
//!
//! - `root`: Top-level configuration file
//! - `dnstap`: dnstap logging settings and transport target
//! - `logging`: Diagnostic log output
//! - `errors`: Configuration errors

pub mod dnstap;
pub mod errors;
pub mod logging;
pub mod root;

pub use dnstap::{DnstapConfig, DnstapTarget, DEFAULT_MAX_FRAME_SIZE};
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use root::Config;
