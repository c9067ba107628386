use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::data::LogLevel;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Command-line access to a ZooKeeper namespace")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(long, short, default_value = "warn", value_enum, global = true)]
    pub log_level: LogLevel,

    /// Comma-separated host:port list of servers to try in order
    #[clap(long, env = "ZOOKEEPER_SERVERS", global = true)]
    pub servers: Option<String>,

    /// Requested session timeout in milliseconds
    #[clap(long, global = true)]
    pub session_timeout: Option<u64>,

    /// YAML config file, `zk.yaml` in the working directory when omitted
    #[clap(long, short, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show if node exists, printing `y` or `n`
    Exists {
        path: String,
        /// Wait for a change in the presence of the node before exiting
        #[clap(long, short)]
        watch: bool,
    },
    /// Show node details
    Stat { path: String },
    /// Show node data
    Get {
        path: String,
        /// Wait for a change to the node before exiting
        #[clap(long, short)]
        watch: bool,
    },
    /// Create node with initial data read from stdin
    Create { path: String },
    /// Write node data read from stdin, checking `version` when given
    Set { path: String, version: Option<i32> },
    /// Delete node, checking `version` when given
    Delete { path: String, version: Option<i32> },
    /// List node children, one name per line
    Children {
        path: String,
        /// Wait for a change in the names of the node's children before exiting
        #[clap(long, short)]
        watch: bool,
    },
    /// Recursively get node children and data, and save them to disk
    Mirror {
        path: String,
        /// Destination directory in which to save the node tree
        #[clap(long, short, default_value = ".")]
        dest: PathBuf,
    },
}
