use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use compio::io::compat::AsyncStream;
use compio::net::TcpStream;
use futures::future::{Either, select};
use futures::io::BufReader;
use futures::{AsyncBufReadExt, AsyncWriteExt};
use snafu::{OptionExt, ResultExt, ensure};
use tracing::{debug, trace, warn};

use super::error::{
    BadFrameLengthSnafu, ConnectSnafu, ConnectTimeoutSnafu, ConnectionClosedSnafu,
    DecodeFailureSnafu, HandshakeExpiredSnafu, IoSnafu, NoServersConfiguredSnafu, ServerSnafu,
    ZkError,
};
use super::jute::{FRAME_HEADER_LEN, JuteReader, JuteWriter};
use super::proto::{
    ConnectRequest, ConnectResponse, MAX_FRAME_LEN, ReplyHeader, Request, RequestHeader,
    WatchedEvent, xid,
};
use crate::config::ClientConfig;

type Transport = Pin<Box<BufReader<AsyncStream<TcpStream>>>>;

/// A single session over one TCP connection.
///
/// Requests are never pipelined: [`Connection::call`] writes one request and
/// reads frames until the matching reply arrives. Watcher notifications
/// that show up in between are queued for [`Connection::next_event`].
pub struct Connection {
    transport: Transport,
    pending: Vec<u8>,
    next_xid: i32,
    session_id: i64,
    session_timeout: Duration,
    events: VecDeque<WatchedEvent>,
    server: String,
}

impl Connection {
    /// Tries every configured server in order and keeps the first session
    /// that completes its handshake.
    pub async fn open(config: &ClientConfig) -> Result<Self, ZkError> {
        let mut last_error = None;

        for server in &config.servers {
            match Self::open_to(server, config.session_timeout).await {
                Ok(connection) => return Ok(connection),
                Err(error) => {
                    warn!("Could not open a session with {}: {}", server, error);
                    last_error = Some(error);
                }
            }
        }

        let last_error = last_error.context(NoServersConfiguredSnafu)?;
        Err(ZkError::NoServerReachable {
            servers: config.servers.join(","),
            source: Box::new(last_error),
        })
    }

    async fn open_to(server: &str, session_timeout: Duration) -> Result<Self, ZkError> {
        debug!("Connecting to {}", server);
        let stream = compio::time::timeout(session_timeout, TcpStream::connect(server))
            .await
            .map_err(|_| ConnectTimeoutSnafu { server }.build())?
            .context(ConnectSnafu { server })?;

        let mut connection = Self {
            transport: Box::pin(BufReader::new(AsyncStream::new(stream))),
            pending: Vec::new(),
            next_xid: 1,
            session_id: 0,
            session_timeout,
            events: VecDeque::new(),
            server: server.to_string(),
        };
        connection.handshake().await?;
        Ok(connection)
    }

    async fn handshake(&mut self) -> Result<(), ZkError> {
        let mut writer = JuteWriter::new();
        ConnectRequest {
            last_zxid_seen: 0,
            timeout_ms: self.session_timeout.as_millis().min(i32::MAX as u128) as i32,
            session_id: 0,
        }
        .encode(&mut writer);
        self.write_frame(writer.into_frame()).await?;

        let frame = self.read_frame().await?;
        let response = ConnectResponse::decode(&mut JuteReader::new(&frame)).context(
            DecodeFailureSnafu {
                what: "connect response",
            },
        )?;
        ensure!(
            response.timeout_ms > 0,
            HandshakeExpiredSnafu {
                server: self.server.clone()
            }
        );

        self.session_id = response.session_id;
        self.session_timeout = Duration::from_millis(response.timeout_ms as u64);
        debug!(
            "Established session 0x{:x} with {} (timeout {:?})",
            self.session_id, self.server, self.session_timeout
        );
        Ok(())
    }

    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    /// Sends `request` and returns the reply body once the matching reply
    /// arrives. A non-zero error code in the reply header becomes
    /// [`ZkError::ServerError`].
    pub async fn call(&mut self, request: &Request<'_>) -> Result<Vec<u8>, ZkError> {
        let xid = self.allocate_xid();
        let op = request.op_code();

        let mut writer = JuteWriter::new();
        RequestHeader { xid, op }.encode(&mut writer);
        request.encode(&mut writer);
        trace!("Sending {:?} (xid {}) for {:?}", op, xid, request.path());
        self.write_frame(writer.into_frame()).await?;

        loop {
            let frame = self.read_frame().await?;
            let mut reader = JuteReader::new(&frame);
            let header = ReplyHeader::decode(&mut reader).context(DecodeFailureSnafu {
                what: "reply header",
            })?;

            match header.xid {
                xid::WATCHER_EVENT => {
                    let event = WatchedEvent::decode(&mut reader).context(DecodeFailureSnafu {
                        what: "watcher event",
                    })?;
                    debug!("Queued watcher event while waiting for a reply: {:?}", event);
                    self.events.push_back(event);
                }
                xid::PING => trace!("Ping acknowledged"),
                reply_xid if reply_xid == xid => {
                    ensure!(
                        header.err == 0,
                        ServerSnafu {
                            code: header.err,
                            path: request.path(),
                        }
                    );
                    return Ok(reader.remaining().to_vec());
                }
                other => warn!("Ignoring reply with unexpected xid {}", other),
            }
        }
    }

    /// Waits for the next watcher notification, pinging the server every
    /// third of the session timeout so the session outlives the wait.
    pub async fn next_event(&mut self) -> Result<WatchedEvent, ZkError> {
        if let Some(event) = self.events.pop_front() {
            return Ok(event);
        }

        let ping_interval = self.session_timeout / 3;
        loop {
            let outcome = match select(
                Box::pin(self.read_frame()),
                Box::pin(compio::time::sleep(ping_interval)),
            )
            .await
            {
                Either::Left((frame, _)) => Some(frame),
                Either::Right(_) => None,
            };

            let Some(frame) = outcome else {
                self.send_ping().await?;
                continue;
            };
            let frame = frame?;
            let mut reader = JuteReader::new(&frame);
            let header = ReplyHeader::decode(&mut reader).context(DecodeFailureSnafu {
                what: "reply header",
            })?;
            match header.xid {
                xid::WATCHER_EVENT => {
                    return WatchedEvent::decode(&mut reader).context(DecodeFailureSnafu {
                        what: "watcher event",
                    });
                }
                xid::PING => trace!("Ping acknowledged"),
                other => warn!("Ignoring reply with unexpected xid {}", other),
            }
        }
    }

    async fn send_ping(&mut self) -> Result<(), ZkError> {
        let mut writer = JuteWriter::new();
        RequestHeader {
            xid: xid::PING,
            op: Request::Ping.op_code(),
        }
        .encode(&mut writer);
        trace!("Sending ping");
        self.write_frame(writer.into_frame()).await
    }

    /// Ends the session. The server drops ephemeral nodes it owned.
    pub async fn close(mut self) -> Result<(), ZkError> {
        self.call(&Request::Close).await.map(|_| ())
    }

    fn allocate_xid(&mut self) -> i32 {
        let xid = self.next_xid;
        self.next_xid = self.next_xid.checked_add(1).unwrap_or(1);
        xid
    }

    async fn write_frame(&mut self, frame: Vec<u8>) -> Result<(), ZkError> {
        self.transport.write_all(&frame).await.context(IoSnafu)?;
        self.transport.flush().await.context(IoSnafu)
    }

    /// Reads one frame body. The only suspension point is `fill_buf`, and
    /// bytes are moved into `pending` before the next await, so dropping
    /// this future midway never loses data.
    async fn read_frame(&mut self) -> Result<Vec<u8>, ZkError> {
        loop {
            if let Some(frame) = self.take_buffered_frame()? {
                return Ok(frame);
            }

            let chunk = self.transport.fill_buf().await.context(IoSnafu)?;
            ensure!(!chunk.is_empty(), ConnectionClosedSnafu);
            let consumed = chunk.len();
            self.pending.extend_from_slice(chunk);
            self.transport.consume_unpin(consumed);
        }
    }

    fn take_buffered_frame(&mut self) -> Result<Option<Vec<u8>>, ZkError> {
        if self.pending.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }

        let mut prefix = [0u8; FRAME_HEADER_LEN];
        prefix.copy_from_slice(&self.pending[..FRAME_HEADER_LEN]);
        let length = i32::from_be_bytes(prefix);
        ensure!(
            length >= 0 && length as usize <= MAX_FRAME_LEN,
            BadFrameLengthSnafu { length }
        );

        let end = FRAME_HEADER_LEN + length as usize;
        if self.pending.len() < end {
            return Ok(None);
        }
        let frame = self.pending[FRAME_HEADER_LEN..end].to_vec();
        self.pending.drain(..end);
        Ok(Some(frame))
    }
}
