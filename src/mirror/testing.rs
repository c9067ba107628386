use hashlink::LinkedHashMap;

use super::RemoteTreeClient;
use crate::zk::{ErrorCode, ZkError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Children(String),
    Read(String),
}

/// In-memory store that records every call it serves.
#[derive(Debug, Default)]
pub struct MemoryTreeClient {
    nodes: LinkedHashMap<String, Option<Vec<u8>>>,
    failing: Option<Call>,
    pub calls: Vec<Call>,
}

impl MemoryTreeClient {
    pub fn new() -> Self {
        let mut nodes = LinkedHashMap::new();
        nodes.insert("/".to_string(), None);
        Self {
            nodes,
            ..Self::default()
        }
    }

    pub fn with_node(mut self, path: &str, data: Option<&[u8]>) -> Self {
        self.nodes.insert(path.to_string(), data.map(<[u8]>::to_vec));
        self
    }

    /// Makes the given call fail with a connection loss.
    pub fn failing_on(mut self, call: Call) -> Self {
        self.failing = Some(call);
        self
    }

    /// `/people` = {alice: "hi", bob: "b-data" {x: "bye"}}
    pub fn people() -> Self {
        Self::new()
            .with_node("/people", None)
            .with_node("/people/alice", Some(b"hi"))
            .with_node("/people/bob", Some(b"b-data"))
            .with_node("/people/bob/x", Some(b"bye"))
    }

    fn serve(&mut self, call: Call) -> Result<(), ZkError> {
        self.calls.push(call.clone());
        let path = match &call {
            Call::Children(path) | Call::Read(path) => path.clone(),
        };
        if self.failing.as_ref() == Some(&call) {
            return Err(ZkError::ServerError {
                code: ErrorCode::ConnectionLoss,
                path,
            });
        }
        if !self.nodes.contains_key(&path) {
            return Err(ZkError::ServerError {
                code: ErrorCode::NoNode,
                path,
            });
        }
        Ok(())
    }
}

impl RemoteTreeClient for MemoryTreeClient {
    async fn children(&mut self, path: &str) -> Result<Vec<String>, ZkError> {
        self.serve(Call::Children(path.to_string()))?;
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{path}/")
        };
        Ok(self
            .nodes
            .keys()
            .filter_map(|candidate| candidate.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(str::to_string)
            .collect())
    }

    async fn read(&mut self, path: &str) -> Result<Option<Vec<u8>>, ZkError> {
        self.serve(Call::Read(path.to_string()))?;
        Ok(self.nodes.get(path).cloned().flatten())
    }
}
