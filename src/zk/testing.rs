//! In-process fake server speaking just enough of the protocol to exercise
//! the client end to end.

use std::pin::Pin;

use compio::io::compat::AsyncStream;
use compio::net::{TcpListener, TcpStream};
use futures::io::BufReader;
use futures::{AsyncReadExt, AsyncWriteExt};
use hashlink::LinkedHashMap;

use super::jute::{JuteReader, JuteWriter};
use super::proto::{OpCode, Stat, xid};

const NO_NODE: i32 = -101;
const NODE_EXISTS: i32 = -110;
const NOT_EMPTY: i32 = -111;
const SYSTEM_ERROR: i32 = -1;

type ServerIo = Pin<Box<BufReader<AsyncStream<TcpStream>>>>;

/// Nodes keyed by full path, kept in insertion order so listings are
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct FakeTree {
    nodes: LinkedHashMap<String, Option<Vec<u8>>>,
    notify_watches: bool,
}

impl FakeTree {
    pub fn new() -> Self {
        let mut nodes = LinkedHashMap::new();
        nodes.insert("/".to_string(), None);
        Self {
            nodes,
            notify_watches: false,
        }
    }

    pub fn with_node(mut self, path: &str, data: Option<&[u8]>) -> Self {
        self.nodes.insert(path.to_string(), data.map(<[u8]>::to_vec));
        self
    }

    /// Sends a data-changed notification right after any reply to a request
    /// that set a watch.
    pub fn notifying_watches(mut self) -> Self {
        self.notify_watches = true;
        self
    }

    fn children_of(&self, path: &str) -> Vec<String> {
        self.nodes
            .keys()
            .filter(|candidate| candidate.as_str() != "/" && parent_of(candidate) == path)
            .map(|candidate| candidate.rsplit('/').next().unwrap_or_default().to_string())
            .collect()
    }

    fn stat_of(&self, path: &str) -> Stat {
        let data_length = self
            .nodes
            .get(path)
            .and_then(|data| data.as_ref())
            .map(|data| data.len() as i32)
            .unwrap_or(0);
        Stat {
            czxid: 337,
            mzxid: 460,
            ctime: 1_400_339_484_000,
            mtime: 1_400_363_385_000,
            version: 1,
            cversion: 3,
            data_length,
            num_children: self.children_of(path).len() as i32,
            pzxid: 413,
            ..Stat::default()
        }
    }

    /// Applies one request and returns the error code, the reply body and
    /// the path of a watch to fire.
    fn handle(&mut self, op: i32, reader: &mut JuteReader<'_>) -> (i32, Vec<u8>, Option<String>) {
        let mut body = JuteWriter::new();
        let path = if op == OpCode::Close as i32 {
            String::new()
        } else {
            reader.read_string().unwrap()
        };

        let (err, watch) = match op {
            op if op == OpCode::Exists as i32 => {
                let watch = reader.read_bool().unwrap();
                if self.nodes.contains_key(&path) {
                    self.stat_of(&path).encode(&mut body);
                    (0, watch)
                } else {
                    (NO_NODE, watch)
                }
            }
            op if op == OpCode::GetData as i32 => {
                let watch = reader.read_bool().unwrap();
                match self.nodes.get(&path) {
                    Some(data) => {
                        body.write_buffer(data.as_deref());
                        self.stat_of(&path).encode(&mut body);
                        (0, watch)
                    }
                    None => (NO_NODE, false),
                }
            }
            op if op == OpCode::GetChildren as i32 => {
                let watch = reader.read_bool().unwrap();
                if self.nodes.contains_key(&path) {
                    let children = self.children_of(&path);
                    body.write_i32(children.len() as i32);
                    for child in &children {
                        body.write_str(child);
                    }
                    (0, watch)
                } else {
                    (NO_NODE, false)
                }
            }
            op if op == OpCode::Create as i32 => {
                let data = reader.read_buffer().unwrap();
                if self.nodes.contains_key(&path) {
                    (NODE_EXISTS, false)
                } else if !self.nodes.contains_key(&parent_of(&path)) {
                    (NO_NODE, false)
                } else {
                    self.nodes.insert(path.clone(), data);
                    body.write_str(&path);
                    (0, false)
                }
            }
            op if op == OpCode::SetData as i32 => {
                let data = reader.read_buffer().unwrap();
                match self.nodes.get_mut(&path) {
                    Some(slot) => {
                        *slot = data;
                        self.stat_of(&path).encode(&mut body);
                        (0, false)
                    }
                    None => (NO_NODE, false),
                }
            }
            op if op == OpCode::Delete as i32 => {
                if !self.nodes.contains_key(&path) {
                    (NO_NODE, false)
                } else if !self.children_of(&path).is_empty() {
                    (NOT_EMPTY, false)
                } else {
                    self.nodes.remove(&path);
                    (0, false)
                }
            }
            op if op == OpCode::Close as i32 => (0, false),
            _ => (SYSTEM_ERROR, false),
        };

        let watch_path = (watch && self.notify_watches).then_some(path);
        let mut frame = body.into_frame();
        (err, frame.split_off(4), watch_path)
    }
}

fn parent_of(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => path[..index].to_string(),
    }
}

/// Binds an ephemeral port and serves a single connection in the
/// background. Returns the `host:port` to connect to.
pub async fn spawn_fake_server(tree: FakeTree) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake server");
    let address = listener
        .local_addr()
        .expect("Failed to read fake server address")
        .to_string();

    compio::runtime::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            serve(stream, tree).await;
        }
    })
    .detach();

    address
}

async fn serve(stream: TcpStream, mut tree: FakeTree) {
    let mut io: ServerIo = Box::pin(BufReader::new(AsyncStream::new(stream)));

    if read_frame(&mut io).await.is_none() {
        return;
    }
    let mut handshake = JuteWriter::new();
    handshake
        .write_i32(0)
        .write_i32(4000)
        .write_i64(0x42)
        .write_buffer(Some(&[0u8; 16]))
        .write_bool(false);
    write_frame(&mut io, handshake.into_frame()).await;

    while let Some(frame) = read_frame(&mut io).await {
        let mut reader = JuteReader::new(&frame);
        let request_xid = reader.read_i32().unwrap();
        let op = reader.read_i32().unwrap();

        if request_xid == xid::PING {
            write_frame(&mut io, reply(xid::PING, 0, &[])).await;
            continue;
        }

        let (err, body, watch_path) = tree.handle(op, &mut reader);
        write_frame(&mut io, reply(request_xid, err, &body)).await;

        if let Some(path) = watch_path {
            let mut event = JuteWriter::new();
            event.write_i32(3).write_i32(3).write_str(&path);
            let mut event = event.into_frame();
            write_frame(&mut io, reply(xid::WATCHER_EVENT, 0, &event.split_off(4))).await;
        }

        if op == OpCode::Close as i32 {
            break;
        }
    }
}

fn reply(reply_xid: i32, err: i32, body: &[u8]) -> Vec<u8> {
    let mut writer = JuteWriter::new();
    writer.write_i32(reply_xid).write_i64(1).write_i32(err);
    let mut frame = writer.into_frame();
    frame.extend_from_slice(body);
    let length = (frame.len() - 4) as i32;
    frame[..4].copy_from_slice(&length.to_be_bytes());
    frame
}

async fn read_frame(io: &mut ServerIo) -> Option<Vec<u8>> {
    let mut prefix = [0u8; 4];
    io.read_exact(&mut prefix).await.ok()?;
    let mut frame = vec![0u8; i32::from_be_bytes(prefix) as usize];
    io.read_exact(&mut frame).await.ok()?;
    Some(frame)
}

async fn write_frame(io: &mut ServerIo, frame: Vec<u8>) {
    io.write_all(&frame).await.expect("Failed to write frame");
    io.flush().await.expect("Failed to flush frame");
}
