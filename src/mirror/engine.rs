use std::path::Path;

use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use super::fetcher::{FetchError, Fetcher};
use super::persister::{PersistError, Persister};
use super::remote::RemoteTreeClient;
use super::snapshot::normalize_root_path;
use crate::ext::BestEffortPathExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorSummary {
    pub nodes: usize,
    pub files_written: usize,
    pub directories_created: usize,
}

pub struct MirrorEngine;

impl MirrorEngine {
    /// Fetches the subtree at `remote_path` and, only once the whole fetch
    /// succeeded, writes it under `destination`.
    pub async fn mirror<C: RemoteTreeClient>(
        client: &mut C,
        remote_path: &str,
        destination: &Path,
    ) -> Result<MirrorSummary, MirrorError> {
        let root_path = normalize_root_path(remote_path);
        info!(
            "Mirroring {} into {}",
            root_path,
            destination.best_effort_path_display()
        );

        let snapshot = Fetcher::fetch(client, root_path)
            .await
            .inspect_err(|error| debug!("Fetch aborted at {}", error.path()))
            .context(FetchSnafu)?;
        let nodes = snapshot.node_count();
        debug!("Fetched {} nodes below {}", nodes, root_path);

        let persister = Persister::persist(destination, snapshot)
            .await
            .context(PersistSnafu)?;

        let summary = MirrorSummary {
            nodes,
            files_written: persister.files_written(),
            directories_created: persister.directories_created(),
        };
        info!(
            "Mirrored {} nodes: {} files written, {} directories created",
            summary.nodes, summary.files_written, summary.directories_created
        );
        Ok(summary)
    }
}

#[derive(Debug, Snafu)]
pub enum MirrorError {
    #[snafu(display("Failed to fetch the remote tree"))]
    FetchError { source: FetchError },
    #[snafu(display("Failed to write the mirrored tree"))]
    PersistError { source: PersistError },
}
