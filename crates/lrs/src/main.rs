//! LRS CLI - Live-reloading static file server.
//!
//! `lrs <DIR>` serves `DIR` over HTTP, injects the livereload script into
//! HTML pages and reloads connected browsers when files change.

mod error;
mod output;
mod serve;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use output::Output;
use serve::ServeArgs;

/// LRS - Live-reloading static file server.
#[derive(Parser)]
#[command(name = "lrs", version, about)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables DEBUG, otherwise RUST_LOG or INFO
    let filter = if cli.serve.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = tokio::runtime::Runtime::new()
        .map_err(error::CliError::from)
        .and_then(|rt| rt.block_on(cli.serve.execute()));

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_directory_argument_is_required() {
        let err = Cli::try_parse_from(["lrs"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_missing_directory_is_usage_error() {
        let err = Cli::try_parse_from(["lrs", "/nonexistent/lrs-site"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_parses_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "lrs",
            dir.path().to_str().unwrap(),
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--no-watch",
            "-v",
        ])
        .unwrap();

        assert!(cli.serve.verbose);
        let settings = cli.serve.cli_settings();
        assert_eq!(settings.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(settings.port, Some(9000));
        assert_eq!(settings.watch_enabled, Some(false));
    }

    #[test]
    fn test_defaults_leave_config_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from(["lrs", dir.path().to_str().unwrap()]).unwrap();

        let settings = cli.serve.cli_settings();
        assert!(settings.host.is_none());
        assert!(settings.port.is_none());
        assert!(settings.watch_enabled.is_none());
    }
}
