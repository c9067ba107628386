use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use compio::fs;
use snafu::{ResultExt, Snafu};
use tracing::{debug, trace};

use super::snapshot::{TreeNode, TreeSnapshot};
use crate::ext::BestEffortPathExt;

/// File holding the payload of a node that is encoded as a directory.
pub const DATA_FILE_NAME: &str = "_data";

/// Encodes a [`TreeSnapshot`] as files and directories.
///
/// Stops at the first filesystem error; whatever was written before stays
/// on disk.
#[derive(Debug, Default)]
pub struct Persister {
    files_written: usize,
    directories_created: usize,
}

impl Persister {
    pub async fn persist(
        destination: &Path,
        snapshot: TreeSnapshot,
    ) -> Result<Self, PersistError> {
        let mut persister = Self::default();
        let root = snapshot.root();
        debug_assert!(root.is_root());

        if root.children().is_empty() {
            debug!("{} has no children, nothing to write", root.remote_path());
            return Ok(persister);
        }
        if root.data().is_some_and(|data| !data.is_empty()) {
            debug!(
                "Payload of {} itself is not part of the mirror",
                root.remote_path()
            );
        }

        persister.ensure_directory(destination).await?;
        for child in root.children() {
            persister.persist_node(destination, child).await?;
        }

        Ok(persister)
    }

    pub fn files_written(&self) -> usize {
        self.files_written
    }

    pub fn directories_created(&self) -> usize {
        self.directories_created
    }

    async fn persist_node(&mut self, directory: &Path, node: &TreeNode) -> Result<(), PersistError> {
        let target = directory.join(node.name());

        if node.children().is_empty() {
            return self
                .write_file(&target, node.data().unwrap_or_default())
                .await;
        }

        self.ensure_directory(&target).await?;
        if let Some(data) = node.data().filter(|data| !data.is_empty()) {
            self.write_file(&target.join(DATA_FILE_NAME), data).await?;
        }
        for child in node.children() {
            Box::pin(self.persist_node(&target, child)).await?;
        }

        Ok(())
    }

    async fn ensure_directory(&mut self, path: &Path) -> Result<(), PersistError> {
        match fs::create_dir(path).await {
            Ok(()) => {
                trace!("Created directory {}", path.display());
                self.directories_created += 1;
                Ok(())
            }
            Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                trace!("Directory {} already exists", path.display());
                Ok(())
            }
            Err(error) => Err(error).context(CreateDirectorySnafu { path }),
        }
    }

    async fn write_file(&mut self, path: &Path, data: &[u8]) -> Result<(), PersistError> {
        fs::write(path, data.to_vec())
            .await
            .0
            .context(WriteFileSnafu { path })?;
        trace!("Wrote {} bytes to {}", data.len(), path.display());
        self.files_written += 1;
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum PersistError {
    #[snafu(display("Failed to create directory {}", path.best_effort_path_display()))]
    CreateDirectoryError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to write {}", path.best_effort_path_display()))]
    WriteFileError {
        path: PathBuf,
        source: std::io::Error,
    },
}
