//! Frame Streams framing.
//!
//! A data frame is a big-endian `u32` length followed by the payload. A
//! control frame starts with a zero length (the escape), then its own length
//! and a control type, then optional fields.

use bytes::{BufMut, Bytes, BytesMut};
use ferrous_dnstap_domain::DomainError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Content type negotiated for dnstap payloads.
pub const CONTENT_TYPE: &[u8] = b"protobuf:dnstap.Dnstap";

/// Largest control frame payload either side will accept.
pub const MAX_CONTROL_FRAME_LEN: usize = 512;

const FIELD_CONTENT_TYPE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ControlType {
    Accept = 1,
    Start = 2,
    Stop = 3,
    Ready = 4,
    Finish = 5,
}

impl ControlType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(ControlType::Accept),
            2 => Some(ControlType::Start),
            3 => Some(ControlType::Stop),
            4 => Some(ControlType::Ready),
            5 => Some(ControlType::Finish),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFrame {
    pub control_type: ControlType,
    pub content_types: Vec<Bytes>,
}

impl ControlFrame {
    pub fn new(control_type: ControlType) -> Self {
        Self {
            control_type,
            content_types: Vec::new(),
        }
    }

    pub fn with_content_type(control_type: ControlType, content_type: &[u8]) -> Self {
        Self {
            control_type,
            content_types: vec![Bytes::copy_from_slice(content_type)],
        }
    }

    /// A frame without content type fields accepts any.
    pub fn accepts(&self, content_type: &[u8]) -> bool {
        self.content_types.is_empty() || self.content_types.iter().any(|ct| ct == content_type)
    }

    /// Encode as a complete frame, escape included.
    pub fn encode(&self) -> Bytes {
        let payload_len = 4 + self
            .content_types
            .iter()
            .map(|ct| 8 + ct.len())
            .sum::<usize>();

        let mut buf = BytesMut::with_capacity(8 + payload_len);
        buf.put_u32(0);
        buf.put_u32(payload_len as u32);
        buf.put_u32(self.control_type as u32);
        for ct in &self.content_types {
            buf.put_u32(FIELD_CONTENT_TYPE);
            buf.put_u32(ct.len() as u32);
            buf.put_slice(ct);
        }
        buf.freeze()
    }

    /// Decode a control payload (the bytes following the control length).
    pub fn decode(payload: &[u8]) -> Result<Self, DomainError> {
        let mut rest = payload;
        let raw_type = take_u32(&mut rest)?;
        let control_type = ControlType::from_u32(raw_type)
            .ok_or_else(|| invalid(format!("unknown control type {}", raw_type)))?;

        let mut content_types = Vec::new();
        while !rest.is_empty() {
            let field = take_u32(&mut rest)?;
            let len = take_u32(&mut rest)? as usize;
            if len > rest.len() {
                return Err(invalid("control field overruns frame"));
            }
            let (value, tail) = rest.split_at(len);
            if field == FIELD_CONTENT_TYPE {
                content_types.push(Bytes::copy_from_slice(value));
            }
            rest = tail;
        }

        Ok(Self {
            control_type,
            content_types,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data(Bytes),
    Control(ControlFrame),
}

/// Read the next frame. Data frames longer than `max_data_len` are refused.
pub async fn read_frame<R>(reader: &mut R, max_data_len: usize) -> Result<Frame, DomainError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await? as usize;
    if len == 0 {
        return read_control_payload(reader).await.map(Frame::Control);
    }
    if len > max_data_len {
        return Err(DomainError::FrameTooLarge {
            size: len,
            limit: max_data_len,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Frame::Data(Bytes::from(payload)))
}

/// Read a frame that must be a control frame.
pub async fn read_control_frame<R>(reader: &mut R) -> Result<ControlFrame, DomainError>
where
    R: AsyncRead + Unpin,
{
    let escape = reader.read_u32().await?;
    if escape != 0 {
        return Err(invalid("expected control frame, got data frame"));
    }
    read_control_payload(reader).await
}

async fn read_control_payload<R>(reader: &mut R) -> Result<ControlFrame, DomainError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await? as usize;
    if len > MAX_CONTROL_FRAME_LEN {
        return Err(DomainError::FrameTooLarge {
            size: len,
            limit: MAX_CONTROL_FRAME_LEN,
        });
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    ControlFrame::decode(&payload)
}

pub async fn write_control_frame<W>(writer: &mut W, frame: &ControlFrame) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&frame.encode()).await
}

pub async fn write_data_frame<W>(writer: &mut W, payload: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(payload).await
}

fn take_u32(rest: &mut &[u8]) -> Result<u32, DomainError> {
    if rest.len() < 4 {
        return Err(invalid("truncated control frame"));
    }
    let (head, tail) = rest.split_at(4);
    *rest = tail;
    Ok(u32::from_be_bytes([head[0], head[1], head[2], head[3]]))
}

fn invalid(reason: impl Into<String>) -> DomainError {
    DomainError::InvalidFrame(reason.into())
}
