//! dnstap event logging.
//!
//! A [`DnstapEnv`] is created once, configured with
//! [`DnstapEnv::apply_config`], duplicated for every worker thread, and each
//! copy is bound to its own delivery queue with [`DnstapEnv::init`]. Workers
//! then log through the `send_*` entry points without sharing any lock.

pub mod env;
pub mod messages;
pub mod submit;

pub use env::{DnstapEnv, DEFAULT_VERSION};
pub use submit::SendStatus;
