use ferrous_dnstap_domain::{DnstapTarget, DomainError};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::debug;

use super::control::{
    read_control_frame, write_control_frame, ControlFrame, ControlType, CONTENT_TYPE,
};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound on any single connect, write or flush.
pub(crate) const IO_TIMEOUT: Duration = Duration::from_secs(5);
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

pub(crate) trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

pub(crate) type BoxedStream = Box<dyn AsyncStream>;

/// A std socket connected ahead of the writer runtime.
pub(crate) enum PendingSocket {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Tcp(std::net::TcpStream),
}

/// Connect synchronously so an unreachable collector fails creation.
pub(crate) fn connect_blocking(target: &DnstapTarget) -> Result<PendingSocket, DomainError> {
    let unavailable =
        |e: std::io::Error| DomainError::TransportUnavailable(format!("{}: {}", target, e));
    match target {
        #[cfg(unix)]
        DnstapTarget::Unix(path) => std::os::unix::net::UnixStream::connect(path)
            .map(PendingSocket::Unix)
            .map_err(unavailable),
        #[cfg(not(unix))]
        DnstapTarget::Unix(_) => Err(DomainError::TransportUnavailable(
            "unix sockets are not supported on this platform".to_string(),
        )),
        DnstapTarget::Tcp(addr) => std::net::TcpStream::connect_timeout(addr, IO_TIMEOUT)
            .map(PendingSocket::Tcp)
            .map_err(unavailable),
    }
}

impl PendingSocket {
    /// Hand the socket over to the current tokio runtime.
    pub(crate) fn into_stream(self) -> Result<BoxedStream, DomainError> {
        match self {
            #[cfg(unix)]
            PendingSocket::Unix(socket) => {
                socket.set_nonblocking(true)?;
                Ok(Box::new(tokio::net::UnixStream::from_std(socket)?))
            }
            PendingSocket::Tcp(socket) => {
                socket.set_nonblocking(true)?;
                socket.set_nodelay(true)?;
                Ok(Box::new(tokio::net::TcpStream::from_std(socket)?))
            }
        }
    }
}

async fn within<T, F>(limit: Duration, what: &str, op: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    tokio::time::timeout(limit, op)
        .await
        .map_err(|_| DomainError::TransportUnavailable(format!("timed out {}", what)))?
}

pub(crate) async fn connect(target: &DnstapTarget) -> Result<BoxedStream, DomainError> {
    within(IO_TIMEOUT, "connecting to collector", connect_stream(target)).await
}

async fn connect_stream(target: &DnstapTarget) -> Result<BoxedStream, DomainError> {
    match target {
        #[cfg(unix)]
        DnstapTarget::Unix(path) => Ok(Box::new(tokio::net::UnixStream::connect(path).await?)),
        #[cfg(not(unix))]
        DnstapTarget::Unix(_) => Err(DomainError::TransportUnavailable(
            "unix sockets are not supported on this platform".to_string(),
        )),
        DnstapTarget::Tcp(addr) => {
            let stream = tokio::net::TcpStream::connect(addr).await?;
            stream.set_nodelay(true)?;
            Ok(Box::new(stream))
        }
    }
}

/// An open Frame Streams session, past the handshake.
pub(crate) struct FrameConnection {
    stream: BufWriter<BoxedStream>,
    bidirectional: bool,
}

impl FrameConnection {
    /// Run the opening handshake.
    ///
    /// Bidirectional: READY, wait for ACCEPT, then START. Otherwise START only.
    pub(crate) async fn open(
        stream: BoxedStream,
        bidirectional: bool,
    ) -> Result<Self, DomainError> {
        let mut stream = BufWriter::with_capacity(WRITE_BUFFER_SIZE, stream);

        if bidirectional {
            let ready = ControlFrame::with_content_type(ControlType::Ready, CONTENT_TYPE);
            within(IO_TIMEOUT, "sending READY", async {
                write_control_frame(&mut stream, &ready).await?;
                stream.flush().await?;
                Ok::<_, DomainError>(())
            })
            .await?;

            let accept = within(
                HANDSHAKE_TIMEOUT,
                "waiting for ACCEPT",
                read_control_frame(&mut stream),
            )
            .await?;
            if accept.control_type != ControlType::Accept {
                return Err(DomainError::InvalidFrame(format!(
                    "expected ACCEPT, got {:?}",
                    accept.control_type
                )));
            }
            if !accept.accepts(CONTENT_TYPE) {
                return Err(DomainError::TransportUnavailable(
                    "collector does not accept dnstap content".into(),
                ));
            }
        }

        let start = ControlFrame::with_content_type(ControlType::Start, CONTENT_TYPE);
        within(IO_TIMEOUT, "sending START", async {
            write_control_frame(&mut stream, &start).await?;
            stream.flush().await?;
            Ok::<_, DomainError>(())
        })
        .await?;

        debug!(bidirectional, "dnstap: frame stream started");
        Ok(Self {
            stream,
            bidirectional,
        })
    }

    pub(crate) async fn write_frame(&mut self, payload: &[u8]) -> Result<(), DomainError> {
        let stream = &mut self.stream;
        within(IO_TIMEOUT, "writing frame", async move {
            super::control::write_data_frame(stream, payload).await?;
            Ok::<_, DomainError>(())
        })
        .await
    }

    pub(crate) async fn flush(&mut self) -> Result<(), DomainError> {
        let stream = &mut self.stream;
        within(IO_TIMEOUT, "flushing frames", async move {
            stream.flush().await?;
            Ok::<_, DomainError>(())
        })
        .await
    }

    /// Send STOP and, when bidirectional, wait for FINISH.
    pub(crate) async fn close(mut self) -> Result<(), DomainError> {
        let stream = &mut self.stream;
        within(IO_TIMEOUT, "sending STOP", async move {
            write_control_frame(stream, &ControlFrame::new(ControlType::Stop)).await?;
            stream.flush().await?;
            Ok::<_, DomainError>(())
        })
        .await?;

        if self.bidirectional {
            let stream = &mut self.stream;
            let finish =
                within(HANDSHAKE_TIMEOUT, "waiting for FINISH", read_control_frame(stream)).await?;
            if finish.control_type != ControlType::Finish {
                return Err(DomainError::InvalidFrame(format!(
                    "expected FINISH, got {:?}",
                    finish.control_type
                )));
            }
        }

        let stream = &mut self.stream;
        within(IO_TIMEOUT, "closing socket", async move {
            stream.shutdown().await?;
            Ok::<_, DomainError>(())
        })
        .await
    }
}
