mod best_effort_path_ext;
mod error_chain_ext;

pub use best_effort_path_ext::BestEffortPathExt;
pub use error_chain_ext::ErrorChainExt;
