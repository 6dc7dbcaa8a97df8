//! Logging entry points, one per dnstap message category.
//!
//! Each call returns immediately when its category is disabled. Otherwise the
//! event is stamped with the current time, encoded and queued; failures are
//! dropped silently and never reach the resolution path.

use ferrous_dnstap_domain::{DnstapMessageType, DnstapTime, SocketProtocol};
use std::net::SocketAddr;

use super::env::DnstapEnv;
use super::submit::SendStatus;

impl DnstapEnv {
    /// A query arrived from a client.
    pub fn send_client_query(
        &mut self,
        client: &SocketAddr,
        protocol: SocketProtocol,
        message: &[u8],
    ) -> SendStatus {
        self.send(
            DnstapMessageType::ClientQuery,
            client,
            protocol,
            None,
            None,
            message,
        )
    }

    /// A response is being sent back to a client.
    pub fn send_client_response(
        &mut self,
        client: &SocketAddr,
        protocol: SocketProtocol,
        message: &[u8],
    ) -> SendStatus {
        self.send(
            DnstapMessageType::ClientResponse,
            client,
            protocol,
            None,
            None,
            message,
        )
    }

    /// An iterative query is being sent to an authoritative server.
    ///
    /// `zone` is the bailiwick the server was selected for, in wire format.
    pub fn send_resolver_query(
        &mut self,
        server: &SocketAddr,
        protocol: SocketProtocol,
        zone: Option<&[u8]>,
        message: &[u8],
    ) -> SendStatus {
        self.send(
            DnstapMessageType::ResolverQuery,
            server,
            protocol,
            zone,
            None,
            message,
        )
    }

    /// A response arrived from an authoritative server. `query_time` is when
    /// the matching query went out.
    pub fn send_resolver_response(
        &mut self,
        server: &SocketAddr,
        protocol: SocketProtocol,
        zone: Option<&[u8]>,
        query_time: Option<DnstapTime>,
        message: &[u8],
    ) -> SendStatus {
        self.send(
            DnstapMessageType::ResolverResponse,
            server,
            protocol,
            zone,
            query_time,
            message,
        )
    }

    /// A query is being forwarded to an upstream.
    pub fn send_forwarder_query(
        &mut self,
        upstream: &SocketAddr,
        protocol: SocketProtocol,
        zone: Option<&[u8]>,
        message: &[u8],
    ) -> SendStatus {
        self.send(
            DnstapMessageType::ForwarderQuery,
            upstream,
            protocol,
            zone,
            None,
            message,
        )
    }

    /// A response arrived from a forwarding upstream.
    pub fn send_forwarder_response(
        &mut self,
        upstream: &SocketAddr,
        protocol: SocketProtocol,
        zone: Option<&[u8]>,
        query_time: Option<DnstapTime>,
        message: &[u8],
    ) -> SendStatus {
        self.send(
            DnstapMessageType::ForwarderResponse,
            upstream,
            protocol,
            zone,
            query_time,
            message,
        )
    }
}
