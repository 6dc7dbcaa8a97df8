use bytes::{BufMut, Bytes, BytesMut};
use ferrous_dnstap_application::ports::DnstapCodec;
use ferrous_dnstap_domain::{
    DnstapEvent, DnstapMessageType, DnstapTime, DomainError, PeerIp, SocketProtocol,
    DEFAULT_MAX_FRAME_SIZE,
};
use prost::encoding::{
    encode_key, encode_varint, encoded_len_varint, fixed32, int32, key_len, uint32, uint64,
    WireType,
};
use prost::Message as _;

use super::schema;

const DNSTAP_IDENTITY: u32 = 1;
const DNSTAP_VERSION: u32 = 2;
const DNSTAP_MESSAGE: u32 = 14;
const DNSTAP_TYPE: u32 = 15;

const MESSAGE_TYPE: u32 = 1;
const MESSAGE_SOCKET_FAMILY: u32 = 2;
const MESSAGE_SOCKET_PROTOCOL: u32 = 3;
const MESSAGE_QUERY_ADDRESS: u32 = 4;
const MESSAGE_RESPONSE_ADDRESS: u32 = 5;
const MESSAGE_QUERY_PORT: u32 = 6;
const MESSAGE_RESPONSE_PORT: u32 = 7;
const MESSAGE_QUERY_TIME_SEC: u32 = 8;
const MESSAGE_QUERY_TIME_NSEC: u32 = 9;
const MESSAGE_QUERY_MESSAGE: u32 = 10;
const MESSAGE_QUERY_ZONE: u32 = 11;
const MESSAGE_RESPONSE_TIME_SEC: u32 = 12;
const MESSAGE_RESPONSE_TIME_NSEC: u32 = 13;
const MESSAGE_RESPONSE_MESSAGE: u32 = 14;

/// dnstap protobuf codec.
///
/// Encodes straight from the borrowed event into one exactly-sized buffer,
/// so the DNS message is copied once, into the frame.
#[derive(Debug, Clone)]
pub struct ProtobufCodec {
    max_frame_size: usize,
}

impl ProtobufCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Decode a data frame payload back into the schema types.
    pub fn decode(frame: &[u8]) -> Result<schema::Dnstap, DomainError> {
        schema::Dnstap::decode(frame).map_err(|e| DomainError::InvalidFrame(e.to_string()))
    }
}

impl Default for ProtobufCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl DnstapCodec for ProtobufCodec {
    fn encode(&self, event: &DnstapEvent<'_>) -> Result<Bytes, DomainError> {
        let message = MessageFields::from_event(event);
        let message_len = message.encoded_len();

        let envelope_len = optional_bytes_len(DNSTAP_IDENTITY, event.identity.map(str::as_bytes))
            + optional_bytes_len(DNSTAP_VERSION, event.version.map(str::as_bytes))
            + key_len(DNSTAP_MESSAGE)
            + encoded_len_varint(message_len as u64)
            + message_len
            + int32::encoded_len(DNSTAP_TYPE, &(schema::DnstapType::Message as i32));

        if envelope_len > self.max_frame_size {
            return Err(DomainError::FrameTooLarge {
                size: envelope_len,
                limit: self.max_frame_size,
            });
        }

        let mut buf = BytesMut::with_capacity(envelope_len);
        if let Some(identity) = event.identity {
            encode_slice(DNSTAP_IDENTITY, identity.as_bytes(), &mut buf);
        }
        if let Some(version) = event.version {
            encode_slice(DNSTAP_VERSION, version.as_bytes(), &mut buf);
        }
        encode_key(DNSTAP_MESSAGE, WireType::LengthDelimited, &mut buf);
        encode_varint(message_len as u64, &mut buf);
        message.encode(&mut buf);
        int32::encode(DNSTAP_TYPE, &(schema::DnstapType::Message as i32), &mut buf);

        debug_assert_eq!(buf.len(), envelope_len);
        Ok(buf.freeze())
    }
}

/// The `Message` fields of one event, laid out in tag order.
struct MessageFields<'a> {
    message_type: i32,
    family: i32,
    protocol: i32,
    address_tag: u32,
    port_tag: u32,
    address: &'a [u8],
    port: u32,
    query_time: Option<DnstapTime>,
    query_message: Option<&'a [u8]>,
    zone: Option<&'a [u8]>,
    response_time: Option<DnstapTime>,
    response_message: Option<&'a [u8]>,
}

impl<'a> MessageFields<'a> {
    fn from_event(event: &'a DnstapEvent<'_>) -> Self {
        let (address_tag, port_tag) = if event.message_type.peer_is_initiator() {
            (MESSAGE_QUERY_ADDRESS, MESSAGE_QUERY_PORT)
        } else {
            (MESSAGE_RESPONSE_ADDRESS, MESSAGE_RESPONSE_PORT)
        };

        let (query_time, query_message, response_time, response_message) =
            if event.message_type.is_query() {
                (Some(event.timestamp), Some(event.message), None, None)
            } else {
                (event.query_time, None, Some(event.timestamp), Some(event.message))
            };

        let family = match event.peer.ip {
            PeerIp::Inet(_) => schema::SocketFamily::Inet,
            PeerIp::Inet6(_) => schema::SocketFamily::Inet6,
        };

        Self {
            message_type: wire_message_type(event.message_type) as i32,
            family: family as i32,
            protocol: wire_protocol(event.protocol) as i32,
            address_tag,
            port_tag,
            address: event.peer.ip.as_bytes(),
            port: u32::from(event.peer.port),
            query_time,
            query_message,
            zone: event.zone,
            response_time,
            response_message,
        }
    }

    fn encoded_len(&self) -> usize {
        int32::encoded_len(MESSAGE_TYPE, &self.message_type)
            + int32::encoded_len(MESSAGE_SOCKET_FAMILY, &self.family)
            + int32::encoded_len(MESSAGE_SOCKET_PROTOCOL, &self.protocol)
            + bytes_len(self.address_tag, self.address)
            + uint32::encoded_len(self.port_tag, &self.port)
            + time_len(MESSAGE_QUERY_TIME_SEC, MESSAGE_QUERY_TIME_NSEC, self.query_time)
            + optional_bytes_len(MESSAGE_QUERY_MESSAGE, self.query_message)
            + optional_bytes_len(MESSAGE_QUERY_ZONE, self.zone)
            + time_len(
                MESSAGE_RESPONSE_TIME_SEC,
                MESSAGE_RESPONSE_TIME_NSEC,
                self.response_time,
            )
            + optional_bytes_len(MESSAGE_RESPONSE_MESSAGE, self.response_message)
    }

    fn encode(&self, buf: &mut BytesMut) {
        int32::encode(MESSAGE_TYPE, &self.message_type, buf);
        int32::encode(MESSAGE_SOCKET_FAMILY, &self.family, buf);
        int32::encode(MESSAGE_SOCKET_PROTOCOL, &self.protocol, buf);
        encode_slice(self.address_tag, self.address, buf);
        uint32::encode(self.port_tag, &self.port, buf);
        encode_time(
            MESSAGE_QUERY_TIME_SEC,
            MESSAGE_QUERY_TIME_NSEC,
            self.query_time,
            buf,
        );
        if let Some(message) = self.query_message {
            encode_slice(MESSAGE_QUERY_MESSAGE, message, buf);
        }
        if let Some(zone) = self.zone {
            encode_slice(MESSAGE_QUERY_ZONE, zone, buf);
        }
        encode_time(
            MESSAGE_RESPONSE_TIME_SEC,
            MESSAGE_RESPONSE_TIME_NSEC,
            self.response_time,
            buf,
        );
        if let Some(message) = self.response_message {
            encode_slice(MESSAGE_RESPONSE_MESSAGE, message, buf);
        }
    }
}

fn wire_message_type(message_type: DnstapMessageType) -> schema::MessageType {
    match message_type {
        DnstapMessageType::ResolverQuery => schema::MessageType::ResolverQuery,
        DnstapMessageType::ResolverResponse => schema::MessageType::ResolverResponse,
        DnstapMessageType::ClientQuery => schema::MessageType::ClientQuery,
        DnstapMessageType::ClientResponse => schema::MessageType::ClientResponse,
        DnstapMessageType::ForwarderQuery => schema::MessageType::ForwarderQuery,
        DnstapMessageType::ForwarderResponse => schema::MessageType::ForwarderResponse,
    }
}

fn wire_protocol(protocol: SocketProtocol) -> schema::SocketProtocol {
    match protocol {
        SocketProtocol::Udp => schema::SocketProtocol::Udp,
        SocketProtocol::Tcp => schema::SocketProtocol::Tcp,
    }
}

#[inline]
fn bytes_len(tag: u32, value: &[u8]) -> usize {
    key_len(tag) + encoded_len_varint(value.len() as u64) + value.len()
}

#[inline]
fn optional_bytes_len(tag: u32, value: Option<&[u8]>) -> usize {
    value.map_or(0, |v| bytes_len(tag, v))
}

#[inline]
fn time_len(sec_tag: u32, nsec_tag: u32, time: Option<DnstapTime>) -> usize {
    time.map_or(0, |t| {
        uint64::encoded_len(sec_tag, &t.secs) + fixed32::encoded_len(nsec_tag, &t.nanos)
    })
}

fn encode_slice(tag: u32, value: &[u8], buf: &mut BytesMut) {
    encode_key(tag, WireType::LengthDelimited, buf);
    encode_varint(value.len() as u64, buf);
    buf.put_slice(value);
}

fn encode_time(sec_tag: u32, nsec_tag: u32, time: Option<DnstapTime>, buf: &mut BytesMut) {
    if let Some(t) = time {
        uint64::encode(sec_tag, &t.secs, buf);
        fixed32::encode(nsec_tag, &t.nanos, buf);
    }
}
