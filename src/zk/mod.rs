//! Minimal ZooKeeper session client over the jute wire protocol.

mod client;
mod connection;
mod error;
mod jute;
mod proto;
#[cfg(test)]
pub(crate) mod testing;

pub use client::{ANY_VERSION, ZkClient};
pub use error::ZkError;
pub use proto::{ErrorCode, Stat};
