//! Namespace mirroring: fetch a remote subtree into a snapshot and
//! encode it as files and directories.
//!
//! Leaves become files holding their payload. Nodes with children become
//! directories, with their own non-empty payload stored in a `_data` file
//! inside. The mirrored root itself is never materialized; its children land
//! directly in the destination directory.

mod engine;
mod fetcher;
mod persister;
mod remote;
mod snapshot;
#[cfg(test)]
mod testing;

pub use engine::{MirrorEngine, MirrorError};
pub use remote::RemoteTreeClient;
