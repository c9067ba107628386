use std::path::PathBuf;

use crate::cli::{Cli, Command};

/// What the application needs from the command line, minus logging setup.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub command: Command,
    pub servers: Option<String>,
    pub session_timeout_ms: Option<u64>,
    pub config_file: Option<PathBuf>,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            command: cli.command,
            servers: cli.servers,
            session_timeout_ms: cli.session_timeout,
            config_file: cli.config,
        }
    }
}
