use derive_more::Display;

use super::jute::{DecodeError, JuteReader, JuteWriter};

pub const PROTOCOL_VERSION: i32 = 0;

/// Largest payload the server accepts by default (`jute.maxbuffer`).
pub const MAX_PAYLOAD_LEN: usize = 1024 * 1024;

/// Upper bound for an incoming frame; replies carry a payload plus headers.
pub const MAX_FRAME_LEN: usize = MAX_PAYLOAD_LEN + 64 * 1024;

const PASSWORD_LEN: usize = 16;

/// Reserved xids used by the server for unsolicited packets.
pub mod xid {
    pub const WATCHER_EVENT: i32 = -1;
    pub const PING: i32 = -2;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum OpCode {
    Create = 1,
    Delete = 2,
    Exists = 3,
    GetData = 4,
    SetData = 5,
    GetChildren = 8,
    Ping = 11,
    Close = -11,
}

pub mod perms {
    pub const ALL: i32 = 0x1f;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    pub perms: i32,
    pub scheme: String,
    pub id: String,
}

impl Acl {
    /// `world:anyone` with every permission.
    pub fn open_unsafe() -> Self {
        Self {
            perms: perms::ALL,
            scheme: "world".into(),
            id: "anyone".into(),
        }
    }

    fn encode(&self, writer: &mut JuteWriter) {
        writer
            .write_i32(self.perms)
            .write_str(&self.scheme)
            .write_str(&self.id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub last_zxid_seen: i64,
    pub timeout_ms: i32,
    pub session_id: i64,
}

impl ConnectRequest {
    pub fn encode(&self, writer: &mut JuteWriter) {
        writer
            .write_i32(PROTOCOL_VERSION)
            .write_i64(self.last_zxid_seen)
            .write_i32(self.timeout_ms)
            .write_i64(self.session_id)
            .write_buffer(Some(&[0u8; PASSWORD_LEN]))
            .write_bool(false);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectResponse {
    pub protocol_version: i32,
    pub timeout_ms: i32,
    pub session_id: i64,
}

impl ConnectResponse {
    pub fn decode(reader: &mut JuteReader<'_>) -> Result<Self, DecodeError> {
        let protocol_version = reader.read_i32()?;
        let timeout_ms = reader.read_i32()?;
        let session_id = reader.read_i64()?;
        // Session password, unused since sessions are never resumed.
        let _ = reader.read_buffer()?;
        Ok(Self {
            protocol_version,
            timeout_ms,
            session_id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub xid: i32,
    pub op: OpCode,
}

impl RequestHeader {
    pub fn encode(&self, writer: &mut JuteWriter) {
        writer.write_i32(self.xid).write_i32(self.op as i32);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHeader {
    pub xid: i32,
    pub zxid: i64,
    pub err: i32,
}

impl ReplyHeader {
    pub fn decode(reader: &mut JuteReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            xid: reader.read_i32()?,
            zxid: reader.read_i64()?,
            err: reader.read_i32()?,
        })
    }
}

/// A request body. Each variant knows its op code and how to encode itself.
#[derive(Debug, Clone)]
pub enum Request<'a> {
    Exists {
        path: &'a str,
        watch: bool,
    },
    GetData {
        path: &'a str,
        watch: bool,
    },
    GetChildren {
        path: &'a str,
        watch: bool,
    },
    Create {
        path: &'a str,
        data: &'a [u8],
        acl: Vec<Acl>,
        flags: i32,
    },
    SetData {
        path: &'a str,
        data: &'a [u8],
        version: i32,
    },
    Delete {
        path: &'a str,
        version: i32,
    },
    Ping,
    Close,
}

impl Request<'_> {
    pub fn op_code(&self) -> OpCode {
        match self {
            Request::Exists { .. } => OpCode::Exists,
            Request::GetData { .. } => OpCode::GetData,
            Request::GetChildren { .. } => OpCode::GetChildren,
            Request::Create { .. } => OpCode::Create,
            Request::SetData { .. } => OpCode::SetData,
            Request::Delete { .. } => OpCode::Delete,
            Request::Ping => OpCode::Ping,
            Request::Close => OpCode::Close,
        }
    }

    /// Path the request addresses, for error reporting.
    pub fn path(&self) -> &str {
        match self {
            Request::Exists { path, .. }
            | Request::GetData { path, .. }
            | Request::GetChildren { path, .. }
            | Request::Create { path, .. }
            | Request::SetData { path, .. }
            | Request::Delete { path, .. } => *path,
            Request::Ping | Request::Close => "",
        }
    }

    pub fn encode(&self, writer: &mut JuteWriter) {
        match self {
            Request::Exists { path, watch }
            | Request::GetData { path, watch }
            | Request::GetChildren { path, watch } => {
                writer.write_str(path).write_bool(*watch);
            }
            Request::Create {
                path,
                data,
                acl,
                flags,
            } => {
                writer.write_str(path).write_buffer(Some(*data));
                writer.write_i32(acl.len() as i32);
                for entry in acl {
                    entry.encode(writer);
                }
                writer.write_i32(*flags);
            }
            Request::SetData {
                path,
                data,
                version,
            } => {
                writer
                    .write_str(path)
                    .write_buffer(Some(*data))
                    .write_i32(*version);
            }
            Request::Delete { path, version } => {
                writer.write_str(path).write_i32(*version);
            }
            Request::Ping | Request::Close => {}
        }
    }
}

/// Node metadata as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    pub czxid: i64,
    pub mzxid: i64,
    pub ctime: i64,
    pub mtime: i64,
    pub version: i32,
    pub cversion: i32,
    pub aversion: i32,
    pub ephemeral_owner: i64,
    pub data_length: i32,
    pub num_children: i32,
    pub pzxid: i64,
}

impl Stat {
    pub fn decode(reader: &mut JuteReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            czxid: reader.read_i64()?,
            mzxid: reader.read_i64()?,
            ctime: reader.read_i64()?,
            mtime: reader.read_i64()?,
            version: reader.read_i32()?,
            cversion: reader.read_i32()?,
            aversion: reader.read_i32()?,
            ephemeral_owner: reader.read_i64()?,
            data_length: reader.read_i32()?,
            num_children: reader.read_i32()?,
            pzxid: reader.read_i64()?,
        })
    }

    #[cfg(test)]
    pub fn encode(&self, writer: &mut JuteWriter) {
        writer
            .write_i64(self.czxid)
            .write_i64(self.mzxid)
            .write_i64(self.ctime)
            .write_i64(self.mtime)
            .write_i32(self.version)
            .write_i32(self.cversion)
            .write_i32(self.aversion)
            .write_i64(self.ephemeral_owner)
            .write_i32(self.data_length)
            .write_i32(self.num_children)
            .write_i64(self.pzxid);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EventType {
    #[display("none")]
    None,
    #[display("node created")]
    NodeCreated,
    #[display("node deleted")]
    NodeDeleted,
    #[display("node data changed")]
    NodeDataChanged,
    #[display("node children changed")]
    NodeChildrenChanged,
    #[display("unknown event {_0}")]
    Unknown(i32),
}

impl From<i32> for EventType {
    fn from(value: i32) -> Self {
        match value {
            -1 => EventType::None,
            1 => EventType::NodeCreated,
            2 => EventType::NodeDeleted,
            3 => EventType::NodeDataChanged,
            4 => EventType::NodeChildrenChanged,
            other => EventType::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum KeeperState {
    #[display("disconnected")]
    Disconnected,
    #[display("connected")]
    SyncConnected,
    #[display("authentication failed")]
    AuthFailed,
    #[display("connected read-only")]
    ConnectedReadOnly,
    #[display("expired")]
    Expired,
    #[display("closed")]
    Closed,
    #[display("unknown state {_0}")]
    Unknown(i32),
}

impl KeeperState {
    pub fn is_connected(&self) -> bool {
        matches!(self, KeeperState::SyncConnected | KeeperState::ConnectedReadOnly)
    }
}

impl From<i32> for KeeperState {
    fn from(value: i32) -> Self {
        match value {
            0 => KeeperState::Disconnected,
            3 => KeeperState::SyncConnected,
            4 => KeeperState::AuthFailed,
            5 => KeeperState::ConnectedReadOnly,
            7 => KeeperState::Closed,
            -112 => KeeperState::Expired,
            other => KeeperState::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedEvent {
    pub event_type: EventType,
    pub state: KeeperState,
    pub path: String,
}

impl WatchedEvent {
    pub fn decode(reader: &mut JuteReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            event_type: reader.read_i32()?.into(),
            state: reader.read_i32()?.into(),
            path: reader.read_string()?,
        })
    }
}

/// Error codes carried in the reply header. Messages keep the `zk: ` prefix
/// the command-line front end strips before printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorCode {
    #[display("zk: system error")]
    SystemError,
    #[display("zk: runtime inconsistency")]
    RuntimeInconsistency,
    #[display("zk: data inconsistency")]
    DataInconsistency,
    #[display("zk: connection loss")]
    ConnectionLoss,
    #[display("zk: marshalling error")]
    MarshallingError,
    #[display("zk: unimplemented")]
    Unimplemented,
    #[display("zk: operation timeout")]
    OperationTimeout,
    #[display("zk: bad arguments")]
    BadArguments,
    #[display("zk: api error")]
    ApiError,
    #[display("zk: node does not exist")]
    NoNode,
    #[display("zk: not authenticated")]
    NoAuth,
    #[display("zk: version conflict")]
    BadVersion,
    #[display("zk: ephemeral nodes may not have children")]
    NoChildrenForEphemerals,
    #[display("zk: node already exists")]
    NodeExists,
    #[display("zk: node has children")]
    NotEmpty,
    #[display("zk: session has been expired by the server")]
    SessionExpired,
    #[display("zk: invalid callback specified")]
    InvalidCallback,
    #[display("zk: invalid ACL specified")]
    InvalidAcl,
    #[display("zk: client authentication failed")]
    AuthFailed,
    #[display("zk: session moved to another server, so operation is ignored")]
    SessionMoved,
    #[display("zk: state changing request is passed to read-only server")]
    NotReadOnly,
    #[display("zk: unknown error {_0}")]
    Unknown(i32),
}

impl From<i32> for ErrorCode {
    fn from(value: i32) -> Self {
        match value {
            -1 => ErrorCode::SystemError,
            -2 => ErrorCode::RuntimeInconsistency,
            -3 => ErrorCode::DataInconsistency,
            -4 => ErrorCode::ConnectionLoss,
            -5 => ErrorCode::MarshallingError,
            -6 => ErrorCode::Unimplemented,
            -7 => ErrorCode::OperationTimeout,
            -8 => ErrorCode::BadArguments,
            -100 => ErrorCode::ApiError,
            -101 => ErrorCode::NoNode,
            -102 => ErrorCode::NoAuth,
            -103 => ErrorCode::BadVersion,
            -108 => ErrorCode::NoChildrenForEphemerals,
            -110 => ErrorCode::NodeExists,
            -111 => ErrorCode::NotEmpty,
            -112 => ErrorCode::SessionExpired,
            -113 => ErrorCode::InvalidCallback,
            -114 => ErrorCode::InvalidAcl,
            -115 => ErrorCode::AuthFailed,
            -118 => ErrorCode::SessionMoved,
            -119 => ErrorCode::NotReadOnly,
            other => ErrorCode::Unknown(other),
        }
    }
}

/// Checks a node path the way the server would, so malformed paths fail
/// before a round trip.
pub fn validate_path(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    if !path.starts_with('/') || path.ends_with('/') || path.contains('\0') {
        return false;
    }
    path[1..]
        .split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}
