use std::io::{Read, Write};

use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info};

use super::output;
use crate::application::RuntimeConfig;
use crate::cli::Command;
use crate::config::{ClientConfig, ClientConfigError, FileConfig};
use crate::mirror::{MirrorEngine, MirrorError};
use crate::zk::{ANY_VERSION, ZkClient, ZkError};

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        let file_config = FileConfig::load(app_config.config_file.as_deref())
            .await
            .context(ConfigSnafu)?;
        let client_config = ClientConfig::resolve(
            app_config.servers.as_deref(),
            app_config.session_timeout_ms,
            file_config,
        );
        debug!("Resolved client config: {:?}", client_config);

        let mut client = ZkClient::connect(&client_config)
            .await
            .context(ConnectSnafu)?;
        let result = Self::execute(&mut client, app_config.command).await;
        client.close().await;

        result
    }

    async fn execute(client: &mut ZkClient, command: Command) -> Result<(), ApplicationError> {
        match command {
            Command::Exists { path, watch } => {
                let stat = client
                    .exists(&path, watch)
                    .await
                    .context(CommandSnafu { command: "exists", path: &path })?;
                write_stdout(output::presence_line(stat.is_some()).as_bytes())?;
                if watch {
                    Self::wait_for_change(client, &path).await?;
                }
            }
            Command::Stat { path } => {
                let (_, stat) = client
                    .get(&path, false)
                    .await
                    .context(CommandSnafu { command: "stat", path: &path })?;
                write_stdout(output::stat_block(&stat).as_bytes())?;
            }
            Command::Get { path, watch } => {
                let (data, _) = client
                    .get(&path, watch)
                    .await
                    .context(CommandSnafu { command: "get", path: &path })?;
                write_stdout(data.as_deref().unwrap_or_default())?;
                if watch {
                    Self::wait_for_change(client, &path).await?;
                }
            }
            Command::Create { path } => {
                let data = read_stdin()?;
                let created = client
                    .create(&path, &data)
                    .await
                    .context(CommandSnafu { command: "create", path: &path })?;
                debug!("Created {}", created);
            }
            Command::Set { path, version } => {
                let data = read_stdin()?;
                let stat = client
                    .set(&path, &data, version.unwrap_or(ANY_VERSION))
                    .await
                    .context(CommandSnafu { command: "set", path: &path })?;
                debug!("{} is now at version {}", path, stat.version);
            }
            Command::Delete { path, version } => {
                client
                    .delete(&path, version.unwrap_or(ANY_VERSION))
                    .await
                    .context(CommandSnafu { command: "delete", path: &path })?;
            }
            Command::Children { path, watch } => {
                let names = client
                    .get_children(&path, watch)
                    .await
                    .context(CommandSnafu { command: "children", path: &path })?;
                write_stdout(output::children_lines(names).as_bytes())?;
                if watch {
                    Self::wait_for_change(client, &path).await?;
                }
            }
            Command::Mirror { path, dest } => {
                let destination = std::env::current_dir()
                    .context(CurrentDirSnafu)?
                    .join(dest);
                MirrorEngine::mirror(client, &path, &destination)
                    .await
                    .context(MirrorSnafu { path: &path })?;
            }
        }

        Ok(())
    }

    async fn wait_for_change(client: &mut ZkClient, path: &str) -> Result<(), ApplicationError> {
        let event = client
            .wait_for_event()
            .await
            .context(WatchSnafu { path })?;
        info!("Observed {} on {}", event.event_type, event.path);
        Ok(())
    }
}

fn read_stdin() -> Result<Vec<u8>, ApplicationError> {
    let mut data = Vec::new();
    std::io::stdin()
        .lock()
        .read_to_end(&mut data)
        .context(InputSnafu)?;
    Ok(data)
}

fn write_stdout(bytes: &[u8]) -> Result<(), ApplicationError> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(bytes).context(OutputSnafu)?;
    stdout.flush().context(OutputSnafu)
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Failed to load client configuration"))]
    ConfigError { source: ClientConfigError },
    #[snafu(display("Failed to open a session"))]
    ConnectError { source: ZkError },
    #[snafu(display("{} {}", command, path))]
    CommandError {
        command: &'static str,
        path: String,
        source: ZkError,
    },
    #[snafu(display("watch {}", path))]
    WatchError { path: String, source: ZkError },
    #[snafu(display("mirror {}", path))]
    MirrorError { path: String, source: MirrorError },
    #[snafu(display("Failed to obtain current dir"))]
    CurrentDirError { source: std::io::Error },
    #[snafu(display("Failed to read node data from stdin"))]
    InputError { source: std::io::Error },
    #[snafu(display("Failed to write to stdout"))]
    OutputError { source: std::io::Error },
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::zk::testing::{FakeTree, spawn_fake_server};
    use tempfile::TempDir;

    fn people() -> FakeTree {
        FakeTree::new()
            .with_node("/people", None)
            .with_node("/people/alice", Some(b"hi"))
            .with_node("/people/bob", Some(b"b-data"))
            .with_node("/people/bob/x", Some(b"bye"))
    }

    async fn connect_to(tree: FakeTree) -> ZkClient {
        let config = ClientConfig {
            servers: vec![spawn_fake_server(tree).await],
            session_timeout: Duration::from_secs(4),
        };
        ZkClient::connect(&config)
            .await
            .expect("Failed to connect to fake server")
    }

    #[compio::test]
    async fn mirror_command_writes_the_subtree() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let destination = temp_dir.path().join("out");
        let mut client = connect_to(people()).await;

        Application::execute(
            &mut client,
            Command::Mirror {
                path: "/people".to_string(),
                dest: destination.clone(),
            },
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(destination.join("alice")).unwrap(), b"hi");
        assert_eq!(std::fs::read(destination.join("bob/_data")).unwrap(), b"b-data");
        assert_eq!(std::fs::read(destination.join("bob/x")).unwrap(), b"bye");
    }

    #[compio::test]
    async fn mirror_of_missing_node_names_the_command() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut client = connect_to(people()).await;

        let error = Application::execute(
            &mut client,
            Command::Mirror {
                path: "/nobody".to_string(),
                dest: temp_dir.path().to_path_buf(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(error, ApplicationError::MirrorError { .. }));
        assert!(error.to_string().starts_with("mirror /nobody"));
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[compio::test]
    async fn delete_with_explicit_version_removes_the_node() {
        let mut client = connect_to(people()).await;

        Application::execute(
            &mut client,
            Command::Delete {
                path: "/people/alice".to_string(),
                version: Some(1),
            },
        )
        .await
        .unwrap();

        assert!(client.exists("/people/alice", false).await.unwrap().is_none());
    }

    #[compio::test]
    async fn failed_command_reports_command_and_path() {
        let mut client = connect_to(people()).await;

        let error = Application::execute(
            &mut client,
            Command::Stat {
                path: "/people/carol".to_string(),
            },
        )
        .await
        .unwrap_err();

        match error {
            ApplicationError::CommandError {
                command, path, source,
            } => {
                assert_eq!(command, "stat");
                assert_eq!(path, "/people/carol");
                assert_eq!(source.code(), Some(crate::zk::ErrorCode::NoNode));
            }
            other => panic!("Expected CommandError, got {other:?}"),
        }
    }

    #[compio::test]
    async fn unreachable_server_fails_to_connect() {
        let result = Application::run(RuntimeConfig {
            command: Command::Exists {
                path: "/".to_string(),
                watch: false,
            },
            servers: Some("127.0.0.1:1".to_string()),
            session_timeout_ms: Some(200),
            config_file: None,
        })
        .await;

        assert!(matches!(result, Err(ApplicationError::ConnectError { .. })));
    }

    #[compio::test]
    async fn missing_config_file_fails_before_connecting() {
        let result = Application::run(RuntimeConfig {
            command: Command::Children {
                path: "/".to_string(),
                watch: false,
            },
            servers: None,
            session_timeout_ms: None,
            config_file: Some(PathBuf::from("does-not-exist.yaml")),
        })
        .await;

        assert!(matches!(result, Err(ApplicationError::ConfigError { .. })));
    }
}
