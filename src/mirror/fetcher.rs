use snafu::{ResultExt, Snafu};
use tracing::{debug, trace};

use super::remote::RemoteTreeClient;
use super::snapshot::{TreeNode, TreeSnapshot, join_path};
use crate::zk::ZkError;

/// Walks a remote subtree depth-first and captures it as a [`TreeSnapshot`].
///
/// A node's payload is read by its parent when the node is discovered,
/// before the node's own children are listed. The walk is not atomic: a
/// node removed between being listed and being read fails the whole fetch.
pub struct Fetcher;

impl Fetcher {
    pub async fn fetch<C: RemoteTreeClient>(
        client: &mut C,
        root_path: &str,
    ) -> Result<TreeSnapshot, FetchError> {
        let mut root = TreeNode::root(root_path);
        Self::visit(client, &mut root).await?;
        Ok(TreeSnapshot::new(root))
    }

    async fn visit<C: RemoteTreeClient>(
        client: &mut C,
        node: &mut TreeNode,
    ) -> Result<(), FetchError> {
        let path = node.remote_path();
        debug!("Visiting {}", path);

        let names = client
            .children(&path)
            .await
            .context(ListChildrenSnafu { path: &path })?;
        trace!("{} has {} children", path, names.len());

        for name in names {
            let child_path = join_path(&path, &name);
            let data = client
                .read(&child_path)
                .await
                .context(ReadNodeSnafu { path: &child_path })?;
            trace!(
                "Read {} ({} bytes)",
                child_path,
                data.as_ref().map_or(0, Vec::len)
            );

            let mut child = TreeNode::new(name, path.as_str(), data);
            Box::pin(Self::visit(client, &mut child)).await?;
            node.push_child(child);
        }

        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum FetchError {
    #[snafu(display("Failed to list children of {}", path))]
    ListChildrenError { path: String, source: ZkError },
    #[snafu(display("Failed to read {}", path))]
    ReadNodeError { path: String, source: ZkError },
}

impl FetchError {
    pub fn path(&self) -> &str {
        match self {
            FetchError::ListChildrenError { path, .. } | FetchError::ReadNodeError { path, .. } => {
                path
            }
        }
    }
}
