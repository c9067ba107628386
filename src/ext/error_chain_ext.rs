use std::error::Error;

/// Prefix the store's own error messages carry.
const STORE_PREFIX: &str = "zk: ";

pub trait ErrorChainExt {
    /// The error and all of its sources joined with `: ` on one line.
    fn single_line(&self) -> String;
}

impl<E: Error + ?Sized> ErrorChainExt for E {
    fn single_line(&self) -> String {
        let mut segments = vec![segment(&self.to_string())];
        let mut source = self.source();
        while let Some(error) = source {
            segments.push(segment(&error.to_string()));
            source = error.source();
        }
        segments.join(": ")
    }
}

fn segment(message: &str) -> String {
    message
        .strip_prefix(STORE_PREFIX)
        .unwrap_or(message)
        .to_string()
}
