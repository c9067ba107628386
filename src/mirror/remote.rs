use crate::zk::ZkError;

/// The part of a store session the mirror needs. Calls are awaited one at a
/// time; implementations never see two requests in flight.
pub trait RemoteTreeClient {
    /// Immediate child names of `path`, in the store's listing order.
    async fn children(&mut self, path: &str) -> Result<Vec<String>, ZkError>;

    /// Payload stored at `path`. `None` when the node holds no data at all,
    /// as opposed to an empty payload.
    async fn read(&mut self, path: &str) -> Result<Option<Vec<u8>>, ZkError>;
}
