use std::{
    borrow::Cow,
    path::{Path, PathBuf},
    time::Duration,
};

use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::ext::BestEffortPathExt;

pub const CONFIG_FILE_NAME: &str = "zk.yaml";
pub const DEFAULT_PORT: u16 = 2181;
pub const DEFAULT_SERVER: &str = "127.0.0.1:2181";
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(1);

/// Settings read from the optional YAML config file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileConfig {
    pub servers: Option<Vec<String>>,
    pub session_timeout: Option<Duration>,
}

impl FileConfig {
    /// Reads `explicit` when given, failing if it is missing. Otherwise
    /// looks for `zk.yaml` in the working directory and falls back to no
    /// settings when there is none.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ClientConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path).await;
        }

        let path = PathBuf::from(CONFIG_FILE_NAME);
        if !path.exists() {
            debug!("No {} found, using defaults", CONFIG_FILE_NAME);
            return Ok(Self::default());
        }
        Self::from_path(&path).await
    }

    pub async fn from_path(path: &Path) -> Result<Self, ClientConfigError> {
        debug!("Reading config file: {}", path.best_effort_path_display());
        let bytes = fs::read(path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        contents.as_str().try_into()
    }

    fn parse_servers(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Option<Vec<String>>, ClientConfigError> {
        let Some(value) = top_level.get(&Yaml::Value(Scalar::String(Cow::Borrowed("servers"))))
        else {
            return Ok(None);
        };

        if let Some(list) = value.as_str() {
            return Ok(Some(parse_server_list(list)));
        }

        value
            .as_sequence()
            .ok_or(ClientConfigError::InvalidServers)?
            .iter()
            .map(|item| {
                item.as_str()
                    .map(with_default_port)
                    .ok_or(ClientConfigError::InvalidServers)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    fn parse_session_timeout(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Option<Duration>, ClientConfigError> {
        match top_level.get(&Yaml::Value(Scalar::String(Cow::Borrowed(
            "session_timeout_ms",
        )))) {
            None => Ok(None),
            Some(Yaml::Value(Scalar::Integer(millis))) if *millis > 0 => {
                Ok(Some(Duration::from_millis(*millis as u64)))
            }
            Some(_) => Err(ClientConfigError::InvalidSessionTimeout),
        }
    }
}

impl TryFrom<&str> for FileConfig {
    type Error = ClientConfigError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents)
            .map_err(|e| ClientConfigError::ParseError { source: e })?;
        // An empty file carries no settings.
        let Some(document) = documents.first() else {
            return Ok(Self::default());
        };

        let top_level = document
            .as_mapping()
            .ok_or(ClientConfigError::TopLevelNotMap)?;

        Ok(Self {
            servers: Self::parse_servers(top_level)?,
            session_timeout: Self::parse_session_timeout(top_level)?,
        })
    }
}

/// Connection settings after applying precedence: command line or
/// environment first, then the config file, then built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub servers: Vec<String>,
    pub session_timeout: Duration,
}

impl ClientConfig {
    pub fn resolve(servers: Option<&str>, session_timeout_ms: Option<u64>, file: FileConfig) -> Self {
        let servers = servers
            .map(parse_server_list)
            .filter(|list| !list.is_empty())
            .or(file.servers.filter(|list| !list.is_empty()))
            .unwrap_or_else(|| vec![DEFAULT_SERVER.to_string()]);

        let session_timeout = session_timeout_ms
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis)
            .or(file.session_timeout)
            .unwrap_or(DEFAULT_SESSION_TIMEOUT);

        Self {
            servers,
            session_timeout,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::resolve(None, None, FileConfig::default())
    }
}

/// Splits a comma-separated server list, dropping blanks and adding the
/// default port where none is given.
pub fn parse_server_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|server| !server.is_empty())
        .map(with_default_port)
        .collect()
}

fn with_default_port(server: &str) -> String {
    let has_port = server
        .rsplit_once(':')
        .is_some_and(|(_, port)| port.parse::<u16>().is_ok());
    if has_port {
        server.to_string()
    } else {
        format!("{server}:{DEFAULT_PORT}")
    }
}

#[derive(Debug, Snafu)]
pub enum ClientConfigError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Config file {} is not valid UTF-8", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("'servers' should be a list or a comma-separated string of host:port"))]
    InvalidServers,
    #[snafu(display("'session_timeout_ms' should be a positive integer"))]
    InvalidSessionTimeout,
}
