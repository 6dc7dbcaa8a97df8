use bytes::Bytes;
use ferrous_dnstap_domain::DnstapTarget;
use ferrous_dnstap_infrastructure::dnstap::frame_stream::control::{
    read_control_frame, read_frame, write_control_frame, ControlFrame, ControlType, Frame,
    CONTENT_TYPE,
};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::mpsc;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimal dnstap collector accepting a single Frame Streams session.
///
/// Every frame received, control frames included, is forwarded to the test
/// in arrival order.
pub struct TestCollector {
    target: DnstapTarget,
    frames: mpsc::UnboundedReceiver<Frame>,
    _dir: Option<TempDir>,
}

impl TestCollector {
    pub async fn unix(bidirectional: bool) -> Self {
        Self::unix_accepting(bidirectional, CONTENT_TYPE).await
    }

    /// A Unix collector whose ACCEPT advertises `content_type`.
    pub async fn unix_accepting(bidirectional: bool, content_type: &'static [u8]) -> Self {
        let (dir, listener) = bind_unix();
        let path = dir.path().join("dnstap.sock");
        let (tx, frames) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                serve(stream, bidirectional, content_type, tx).await;
            }
        });

        Self {
            target: DnstapTarget::Unix(path),
            frames,
            _dir: Some(dir),
        }
    }

    /// A Unix collector that completes the handshake and then never reads.
    pub async fn unix_stalling() -> Self {
        let (dir, listener) = bind_unix();
        let path = dir.path().join("dnstap.sock");
        let (tx, frames) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            if let Ok(ready) = read_control_frame(&mut stream).await {
                let _ = tx.send(Frame::Control(ready));
                let accept = ControlFrame::with_content_type(ControlType::Accept, CONTENT_TYPE);
                let _ = write_control_frame(&mut stream, &accept).await;
                let _ = stream.flush().await;
            }
            // Hold the socket open without reading from it
            std::future::pending::<()>().await;
        });

        Self {
            target: DnstapTarget::Unix(path),
            frames,
            _dir: Some(dir),
        }
    }

    /// A bidirectional Unix collector that hangs up after the first data
    /// frame of its first session, then serves a second session normally.
    ///
    /// The first data frame is forwarded only after the hang-up.
    pub async fn unix_restarting() -> Self {
        let (dir, listener) = bind_unix();
        let path = dir.path().join("dnstap.sock");
        let (tx, frames) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            if let Ok(ready) = read_control_frame(&mut stream).await {
                let _ = tx.send(Frame::Control(ready));
                let accept = ControlFrame::with_content_type(ControlType::Accept, CONTENT_TYPE);
                let _ = write_control_frame(&mut stream, &accept).await;
                let _ = stream.flush().await;
            }
            let mut first = Vec::new();
            while let Ok(frame) = read_frame(&mut stream, 1024 * 1024).await {
                let data = matches!(frame, Frame::Data(_));
                first.push(frame);
                if data {
                    break;
                }
            }
            drop(stream);
            for frame in first {
                let _ = tx.send(frame);
            }

            if let Ok((stream, _)) = listener.accept().await {
                serve(stream, true, CONTENT_TYPE, tx).await;
            }
        });

        Self {
            target: DnstapTarget::Unix(path),
            frames,
            _dir: Some(dir),
        }
    }

    pub async fn tcp(bidirectional: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, frames) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                serve(stream, bidirectional, CONTENT_TYPE, tx).await;
            }
        });

        Self {
            target: DnstapTarget::Tcp(addr),
            frames,
            _dir: None,
        }
    }

    pub fn target(&self) -> DnstapTarget {
        self.target.clone()
    }

    /// Next frame, or `None` once the session ended or nothing arrived in time.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        tokio::time::timeout(FRAME_TIMEOUT, self.frames.recv())
            .await
            .ok()
            .flatten()
    }

    pub async fn expect_control(&mut self, expected: ControlType) -> ControlFrame {
        match self.next_frame().await {
            Some(Frame::Control(frame)) if frame.control_type == expected => frame,
            other => panic!("expected {:?} control frame, got {:?}", expected, other),
        }
    }

    pub async fn expect_data(&mut self) -> Bytes {
        match self.next_frame().await {
            Some(Frame::Data(payload)) => payload,
            other => panic!("expected data frame, got {:?}", other),
        }
    }

    /// Skip the opening handshake frames.
    pub async fn expect_session_start(&mut self, bidirectional: bool) {
        if bidirectional {
            let ready = self.expect_control(ControlType::Ready).await;
            assert!(ready.accepts(CONTENT_TYPE));
        }
        let start = self.expect_control(ControlType::Start).await;
        assert!(start.accepts(CONTENT_TYPE));
    }
}

fn bind_unix() -> (TempDir, UnixListener) {
    let dir = tempfile::tempdir().unwrap();
    let listener = UnixListener::bind(dir.path().join("dnstap.sock")).unwrap();
    (dir, listener)
}

async fn serve<S>(
    mut stream: S,
    bidirectional: bool,
    content_type: &'static [u8],
    tx: mpsc::UnboundedSender<Frame>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if bidirectional {
        let Ok(ready) = read_control_frame(&mut stream).await else {
            return;
        };
        let _ = tx.send(Frame::Control(ready));
        let accept = ControlFrame::with_content_type(ControlType::Accept, content_type);
        if write_control_frame(&mut stream, &accept).await.is_err() {
            return;
        }
        let _ = stream.flush().await;
    }

    while let Ok(frame) = read_frame(&mut stream, 1024 * 1024).await {
        let stop = matches!(&frame, Frame::Control(c) if c.control_type == ControlType::Stop);
        let _ = tx.send(frame);
        if stop {
            if bidirectional {
                let finish = ControlFrame::new(ControlType::Finish);
                let _ = write_control_frame(&mut stream, &finish).await;
                let _ = stream.flush().await;
            }
            break;
        }
    }
}
