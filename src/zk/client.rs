use snafu::{ResultExt, ensure};
use tracing::{debug, info};

use super::connection::Connection;
use super::error::{
    DecodeFailureSnafu, InvalidPathSnafu, PayloadTooLargeSnafu, WatchInterruptedSnafu, ZkError,
};
use super::jute::JuteReader;
use super::proto::{Acl, ErrorCode, MAX_PAYLOAD_LEN, Request, Stat, WatchedEvent, validate_path};
use crate::config::ClientConfig;
use crate::mirror::RemoteTreeClient;

/// Version that matches any node version on `set` and `delete`.
pub const ANY_VERSION: i32 = -1;

/// Blocking-style session API. Each call awaits its reply before returning,
/// so a client is only ever used by one operation at a time.
pub struct ZkClient {
    connection: Connection,
}

impl ZkClient {
    pub async fn connect(config: &ClientConfig) -> Result<Self, ZkError> {
        let connection = Connection::open(config).await?;
        info!(
            "Connected with session 0x{:x}, timeout {:?}",
            connection.session_id(),
            connection.session_timeout()
        );
        Ok(Self { connection })
    }

    /// Returns the node's stat, or `None` when it does not exist. With
    /// `watch` set the server notifies on creation, deletion or change.
    pub async fn exists(&mut self, path: &str, watch: bool) -> Result<Option<Stat>, ZkError> {
        check_path(path)?;
        match self.connection.call(&Request::Exists { path, watch }).await {
            Ok(body) => {
                let stat = Stat::decode(&mut JuteReader::new(&body))
                    .context(DecodeFailureSnafu { what: "stat" })?;
                Ok(Some(stat))
            }
            Err(error) if error.code() == Some(ErrorCode::NoNode) => Ok(None),
            Err(error) => Err(error),
        }
    }

    pub async fn get(
        &mut self,
        path: &str,
        watch: bool,
    ) -> Result<(Option<Vec<u8>>, Stat), ZkError> {
        check_path(path)?;
        let body = self
            .connection
            .call(&Request::GetData { path, watch })
            .await?;
        let mut reader = JuteReader::new(&body);
        let data = reader
            .read_buffer()
            .context(DecodeFailureSnafu { what: "node data" })?;
        let stat = Stat::decode(&mut reader).context(DecodeFailureSnafu { what: "stat" })?;
        Ok((data, stat))
    }

    /// Child names in the order the server lists them.
    pub async fn get_children(&mut self, path: &str, watch: bool) -> Result<Vec<String>, ZkError> {
        check_path(path)?;
        let body = self
            .connection
            .call(&Request::GetChildren { path, watch })
            .await?;
        JuteReader::new(&body)
            .read_string_vec()
            .context(DecodeFailureSnafu { what: "children" })
    }

    /// Creates a persistent node readable and writable by anyone and returns
    /// the path the server assigned.
    pub async fn create(&mut self, path: &str, data: &[u8]) -> Result<String, ZkError> {
        check_path(path)?;
        check_payload(data)?;
        let body = self
            .connection
            .call(&Request::Create {
                path,
                data,
                acl: vec![Acl::open_unsafe()],
                flags: 0,
            })
            .await?;
        JuteReader::new(&body)
            .read_string()
            .context(DecodeFailureSnafu {
                what: "created path",
            })
    }

    pub async fn set(&mut self, path: &str, data: &[u8], version: i32) -> Result<Stat, ZkError> {
        check_path(path)?;
        check_payload(data)?;
        let body = self
            .connection
            .call(&Request::SetData {
                path,
                data,
                version,
            })
            .await?;
        Stat::decode(&mut JuteReader::new(&body)).context(DecodeFailureSnafu { what: "stat" })
    }

    pub async fn delete(&mut self, path: &str, version: i32) -> Result<(), ZkError> {
        check_path(path)?;
        self.connection
            .call(&Request::Delete { path, version })
            .await
            .map(|_| ())
    }

    /// Waits for one watcher notification. Session-level events that leave
    /// the session unusable end the wait with an error.
    pub async fn wait_for_event(&mut self) -> Result<WatchedEvent, ZkError> {
        let event = self.connection.next_event().await?;
        debug!("Received watcher event: {:?}", event);
        ensure!(
            event.state.is_connected(),
            WatchInterruptedSnafu { state: event.state }
        );
        Ok(event)
    }

    /// Closes the session. Failures are logged, the process is ending anyway.
    pub async fn close(self) {
        if let Err(error) = self.connection.close().await {
            debug!("Error while closing the session: {}", error);
        }
    }
}

impl RemoteTreeClient for ZkClient {
    async fn children(&mut self, path: &str) -> Result<Vec<String>, ZkError> {
        self.get_children(path, false).await
    }

    async fn read(&mut self, path: &str) -> Result<Option<Vec<u8>>, ZkError> {
        self.get(path, false).await.map(|(data, _)| data)
    }
}

fn check_path(path: &str) -> Result<(), ZkError> {
    ensure!(validate_path(path), InvalidPathSnafu { path });
    Ok(())
}

fn check_payload(data: &[u8]) -> Result<(), ZkError> {
    ensure!(
        data.len() <= MAX_PAYLOAD_LEN,
        PayloadTooLargeSnafu {
            length: data.len(),
            limit: MAX_PAYLOAD_LEN
        }
    );
    Ok(())
}
