//! Serve command implementation.

use std::path::PathBuf;

use clap::Args;
use lrs_config::{CliSettings, Config};
use lrs_server::{run_server, server_config_from_lrs_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for serving a directory.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Directory to serve.
    #[arg(value_parser = existing_dir)]
    path: PathBuf,

    /// Path to configuration file (default: auto-discover lrs.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Don't reload browsers when files change.
    #[arg(long)]
    no_watch: bool,

    /// Enable verbose output (debug logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Settings that override the configuration file.
    pub(crate) fn cli_settings(&self) -> CliSettings {
        CliSettings {
            host: self.host.clone(),
            port: self.port,
            watch_enabled: self.no_watch.then_some(false),
        }
    }

    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = Config::load(self.config.as_deref(), Some(&self.cli_settings()))?;

        output.serving(
            self.path.display(),
            &format!("http://{}:{}/", config.server.host, config.server.port),
        );
        if let Some(path) = &config.config_path {
            output.detail("config", path.display());
        }
        output.detail(
            "live reload",
            if config.watch.enabled { "on" } else { "off" },
        );

        run_server(server_config_from_lrs_config(&config, self.path)).await?;

        Ok(())
    }
}

/// Clap value parser accepting only existing directories.
fn existing_dir(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("{value} is not a directory"))
    }
}
