use snafu::Snafu;

use super::jute::DecodeError;
use super::proto::{ErrorCode, KeeperState};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ZkError {
    #[snafu(display("No ZooKeeper servers configured"))]
    NoServersConfigured,
    #[snafu(display("Failed to connect to any of {}", servers))]
    NoServerReachable {
        servers: String,
        source: Box<ZkError>,
    },
    #[snafu(display("Timed out connecting to {}", server))]
    ConnectTimeout { server: String },
    #[snafu(display("Failed to connect to {}", server))]
    ConnectError {
        server: String,
        source: std::io::Error,
    },
    #[snafu(display("Session expired while connecting to {}", server))]
    HandshakeExpired { server: String },
    #[snafu(display("Connection to the server failed"))]
    IoError { source: std::io::Error },
    #[snafu(display("Server closed the connection"))]
    ConnectionClosed,
    #[snafu(display("Malformed {} received from the server", what))]
    DecodeFailure {
        what: &'static str,
        source: DecodeError,
    },
    #[snafu(display("Frame of {} bytes is outside the accepted range", length))]
    BadFrameLength { length: i64 },
    #[snafu(display("{}", code))]
    ServerError { code: ErrorCode, path: String },
    #[snafu(display("zk: invalid path {:?}", path))]
    InvalidPath { path: String },
    #[snafu(display("Payload of {} bytes exceeds the {} byte limit", length, limit))]
    PayloadTooLarge { length: usize, limit: usize },
    #[snafu(display("Watch ended because the session is {}", state))]
    WatchInterrupted { state: KeeperState },
}

impl ZkError {
    /// Server-side error code, when the server rejected the request.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ZkError::ServerError { code, .. } => Some(*code),
            _ => None,
        }
    }
}
