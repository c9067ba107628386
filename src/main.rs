#![allow(clippy::enum_variant_names)]

use std::process::ExitCode;

use clap::Parser as _;
use colored::Colorize;
use supports_color::Stream;
use tracing::debug;

use crate::{
    application::{Application, ApplicationError},
    cli::Cli,
    ext::ErrorChainExt,
};

mod application;
mod cli;
mod config;
mod ext;
mod mirror;
mod zk;

#[compio::main]
async fn main() -> ExitCode {
    let cli_args = Cli::parse();
    setup_tracing(&cli_args);
    debug!("Parsed CLI arguments: {cli_args:?}");

    match Application::run(cli_args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            ExitCode::FAILURE
        }
    }
}

fn setup_tracing(cli_args: &Cli) {
    if let Some(level) = cli_args.log_level.to_tracing_level() {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .without_time()
            .compact()
            .init();
    }
}

fn report(error: &ApplicationError) {
    let label = if supports_color::on(Stream::Stderr).is_some() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    };
    eprintln!("{} {}", label, error.single_line());
}
