use ferrous_dnstap_domain::{
    DnstapConfig, DnstapEvent, DnstapMessageFlags, DnstapMessageType, DnstapTime, DomainError,
    PeerAddress, SocketProtocol,
};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::submit::{submit_event, SendStatus};
use crate::ports::{DeliveryQueue, DnstapCodec, DnstapTransport};

/// Version string sent when `send_version` is on and no override is given.
pub const DEFAULT_VERSION: &str = concat!("ferrous-dns ", env!("CARGO_PKG_VERSION"));

/// Owns the transport on behalf of every environment derived from one
/// creation. Dropped, and the transport shut down, with the last of them.
struct TransportConnection {
    transport: Box<dyn DnstapTransport>,
}

impl Drop for TransportConnection {
    fn drop(&mut self) {
        info!("closing dnstap socket");
        self.transport.shutdown();
    }
}

/// Per-worker dnstap state.
///
/// All copies made with [`duplicate`](Self::duplicate) share one transport
/// connection; each copy binds its own delivery queue in
/// [`init`](Self::init). Dropping an environment releases its queue and its
/// share of the connection.
pub struct DnstapEnv {
    // Declared first so the queue is released before the connection.
    queue: Option<Box<dyn DeliveryQueue>>,
    connection: Arc<TransportConnection>,
    codec: Arc<dyn DnstapCodec>,
    identity: Option<Arc<str>>,
    version: Option<Arc<str>>,
    flags: DnstapMessageFlags,
}

impl DnstapEnv {
    /// Bind a freshly established transport and a codec.
    ///
    /// Every category starts disabled; call [`apply_config`](Self::apply_config).
    pub fn new(transport: Box<dyn DnstapTransport>, codec: Arc<dyn DnstapCodec>) -> Self {
        Self {
            queue: None,
            connection: Arc::new(TransportConnection { transport }),
            codec,
            identity: None,
            version: None,
            flags: DnstapMessageFlags::default(),
        }
    }

    /// Copy this environment for another worker.
    ///
    /// The copy shares the connection, configuration and strings but has no
    /// delivery queue until its own `init`.
    pub fn duplicate(&self) -> Self {
        Self {
            queue: None,
            connection: Arc::clone(&self.connection),
            codec: Arc::clone(&self.codec),
            identity: self.identity.clone(),
            version: self.version.clone(),
            flags: self.flags,
        }
    }

    /// Apply the `[dnstap]` section.
    ///
    /// A disabled section leaves the environment untouched, so this can be
    /// re-run on every reload.
    ///
    /// # Errors
    ///
    /// [`DomainError::HostnameUnavailable`] when the identity needs the host
    /// name and it cannot be read. The caller must stop the resolver.
    #[must_use = "a host name failure must stop the resolver"]
    pub fn apply_config(&mut self, cfg: &DnstapConfig) -> Result<(), DomainError> {
        self.apply_config_with_hostname(cfg, local_hostname)
    }

    /// [`apply_config`](Self::apply_config) with a custom host name lookup.
    #[must_use = "a host name failure must stop the resolver"]
    pub fn apply_config_with_hostname<F>(
        &mut self,
        cfg: &DnstapConfig,
        lookup_hostname: F,
    ) -> Result<(), DomainError>
    where
        F: FnOnce() -> io::Result<String>,
    {
        if !cfg.enabled {
            return Ok(());
        }

        if cfg.send_identity {
            let identity = match cfg.identity_override() {
                Some(identity) => identity.to_string(),
                None => lookup_hostname()
                    .map_err(|e| DomainError::HostnameUnavailable(e.to_string()))?,
            };
            info!(identity = %identity, "dnstap identity field set");
            self.identity = Some(Arc::from(identity));
        }

        if cfg.send_version {
            let version = cfg.version_override().unwrap_or(DEFAULT_VERSION);
            info!(version = %version, "dnstap version field set");
            self.version = Some(Arc::from(version));
        }

        self.flags = DnstapMessageFlags::from_config(cfg);
        if !self.flags.any_enabled() {
            warn!("dnstap enabled but no message types selected");
        }
        for message_type in DnstapMessageType::ALL {
            if self.flags.is_enabled(message_type) {
                info!("dnstap Message/{} enabled", message_type);
            }
        }

        Ok(())
    }

    /// Take this worker's delivery queue from the shared transport.
    ///
    /// Call once per environment, after duplicating and before logging.
    /// A second call keeps the queue already bound.
    pub fn init(&mut self) -> Result<(), DomainError> {
        if self.queue.is_some() {
            return Ok(());
        }

        match self.connection.transport.acquire_queue() {
            Some(queue) => {
                self.queue = Some(queue);
                Ok(())
            }
            None => {
                debug!("dnstap: no delivery queue left for this worker");
                Err(DomainError::QueueUnavailable)
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.queue.is_some()
    }

    /// Whether events of this category are built and sent.
    #[inline]
    pub fn is_enabled(&self, message_type: DnstapMessageType) -> bool {
        self.flags.is_enabled(message_type)
    }

    pub fn flags(&self) -> DnstapMessageFlags {
        self.flags
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Environments currently sharing this transport connection.
    pub fn connection_refs(&self) -> usize {
        Arc::strong_count(&self.connection)
    }

    /// Build an event on the stack and submit it. Shared by every entry point.
    #[inline]
    pub(crate) fn send(
        &mut self,
        message_type: DnstapMessageType,
        peer: &SocketAddr,
        protocol: SocketProtocol,
        zone: Option<&[u8]>,
        query_time: Option<DnstapTime>,
        message: &[u8],
    ) -> SendStatus {
        if !self.flags.is_enabled(message_type) {
            return SendStatus::Disabled;
        }
        let Some(queue) = self.queue.as_deref_mut() else {
            return SendStatus::NotInitialized;
        };

        let event = DnstapEvent {
            message_type,
            timestamp: DnstapTime::now(),
            query_time,
            peer: PeerAddress::from_socket_addr(peer),
            protocol,
            zone,
            message,
            identity: self.identity.as_deref(),
            version: self.version.as_deref(),
        };

        submit_event(self.codec.as_ref(), queue, &event)
    }
}

impl fmt::Debug for DnstapEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnstapEnv")
            .field("initialized", &self.is_initialized())
            .field("identity", &self.identity)
            .field("version", &self.version)
            .field("flags", &self.flags)
            .finish()
    }
}

fn local_hostname() -> io::Result<String> {
    hostname::get().map(|name| name.to_string_lossy().into_owned())
}
