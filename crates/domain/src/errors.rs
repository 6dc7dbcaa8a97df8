use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("dnstap transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("No dnstap delivery queue available for this worker")]
    QueueUnavailable,

    #[error("dnstap frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("Invalid dnstap frame: {0}")]
    InvalidFrame(String),

    /// The identity needs the host name and it could not be read.
    ///
    /// A resolver receiving this must not start or keep serving with dnstap
    /// half-configured: treat it as fatal.
    #[error("Cannot determine host name for dnstap identity: {0}")]
    HostnameUnavailable(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::IoError(err.to_string())
    }
}
