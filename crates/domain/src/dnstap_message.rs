use crate::config::DnstapConfig;

/// Which part of the resolver observed a DNS message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageRole {
    /// Iterative resolution towards authoritative servers
    Resolver,
    /// Traffic between a stub client and this server
    Client,
    /// Queries forwarded to a configured upstream
    Forwarder,
}

/// The six dnstap message categories this server can emit.
///
/// Every category implies a role (resolver/client/forwarder) and a direction
/// (query/response). Client categories describe the client peer on the query
/// side of the event; resolver and forwarder categories describe the upstream
/// server on the response side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DnstapMessageType {
    ResolverQuery,
    ResolverResponse,
    ClientQuery,
    ClientResponse,
    ForwarderQuery,
    ForwarderResponse,
}

impl DnstapMessageType {
    pub const ALL: [DnstapMessageType; 6] = [
        DnstapMessageType::ResolverQuery,
        DnstapMessageType::ResolverResponse,
        DnstapMessageType::ClientQuery,
        DnstapMessageType::ClientResponse,
        DnstapMessageType::ForwarderQuery,
        DnstapMessageType::ForwarderResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DnstapMessageType::ResolverQuery => "RESOLVER_QUERY",
            DnstapMessageType::ResolverResponse => "RESOLVER_RESPONSE",
            DnstapMessageType::ClientQuery => "CLIENT_QUERY",
            DnstapMessageType::ClientResponse => "CLIENT_RESPONSE",
            DnstapMessageType::ForwarderQuery => "FORWARDER_QUERY",
            DnstapMessageType::ForwarderResponse => "FORWARDER_RESPONSE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    pub fn role(&self) -> MessageRole {
        match self {
            DnstapMessageType::ResolverQuery | DnstapMessageType::ResolverResponse => {
                MessageRole::Resolver
            }
            DnstapMessageType::ClientQuery | DnstapMessageType::ClientResponse => {
                MessageRole::Client
            }
            DnstapMessageType::ForwarderQuery | DnstapMessageType::ForwarderResponse => {
                MessageRole::Forwarder
            }
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(
            self,
            DnstapMessageType::ResolverQuery
                | DnstapMessageType::ClientQuery
                | DnstapMessageType::ForwarderQuery
        )
    }

    pub fn is_response(&self) -> bool {
        !self.is_query()
    }

    /// True when the peer of this event is the querying client.
    pub fn peer_is_initiator(&self) -> bool {
        self.role() == MessageRole::Client
    }
}

impl std::fmt::Display for DnstapMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category gates. A disabled category turns its logging entry point
/// into a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DnstapMessageFlags {
    pub resolver_query: bool,
    pub resolver_response: bool,
    pub client_query: bool,
    pub client_response: bool,
    pub forwarder_query: bool,
    pub forwarder_response: bool,
}

impl DnstapMessageFlags {
    pub fn from_config(cfg: &DnstapConfig) -> Self {
        Self {
            resolver_query: cfg.log_resolver_query_messages,
            resolver_response: cfg.log_resolver_response_messages,
            client_query: cfg.log_client_query_messages,
            client_response: cfg.log_client_response_messages,
            forwarder_query: cfg.log_forwarder_query_messages,
            forwarder_response: cfg.log_forwarder_response_messages,
        }
    }

    #[inline]
    pub fn is_enabled(&self, message_type: DnstapMessageType) -> bool {
        match message_type {
            DnstapMessageType::ResolverQuery => self.resolver_query,
            DnstapMessageType::ResolverResponse => self.resolver_response,
            DnstapMessageType::ClientQuery => self.client_query,
            DnstapMessageType::ClientResponse => self.client_response,
            DnstapMessageType::ForwarderQuery => self.forwarder_query,
            DnstapMessageType::ForwarderResponse => self.forwarder_response,
        }
    }

    pub fn any_enabled(&self) -> bool {
        DnstapMessageType::ALL.iter().any(|t| self.is_enabled(*t))
    }
}
