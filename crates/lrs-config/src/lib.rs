//! `lrs.toml` loading for the lrs live-reload server.
//!
//! A config file is optional. When `--config` isn't given, the nearest
//! `lrs.toml` in the working directory or one of its ancestors is used, and
//! built-in defaults apply when there is none. Command-line flags
//! ([`CliSettings`]) are layered on top and the merged result is validated.
//!
//! `server.host` may reference environment variables as `${VAR}` or
//! `${VAR:-fallback}`; an unset variable without a fallback is an error.

mod expand;

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Name of the file looked up during discovery.
const CONFIG_FILENAME: &str = "lrs.toml";

/// Default read size for streamed files (256 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Upper bound for `watch.debounce_ms`.
const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Values given on the command line. `None` keeps the file's value.
#[derive(Debug, Default)]
pub struct CliSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// `Some(false)` for `--no-watch`.
    pub watch_enabled: Option<bool>,
}

/// Merged configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub serve: ServeConfig,
    pub watch: WatchConfig,
    /// File the values came from, if any.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// `[server]` table.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Interface to listen on.
    pub host: String,
    /// Listening port, also advertised to browsers in the injected script.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 8000,
        }
    }
}

/// `[serve]` table.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    /// Bytes read from disk per streamed chunk.
    pub chunk_size: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// `[watch]` table.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Broadcast a reload when served files change.
    pub enabled: bool,
    /// How long a path must stay quiet before its change is reported.
    pub debounce_ms: u64,
    /// Globs, relative to the served directory, whose changes are ignored.
    pub ignore: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 100,
            ignore: [".git/**", "**/*.swp", "**/*~"]
                .map(str::to_owned)
                .to_vec(),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid lrs.toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("cannot expand {field}: {message}")]
    EnvVar { field: String, message: String },
}

impl Config {
    /// Load the configuration and apply `cli_settings` on top.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit `config_path` is missing, the file
    /// cannot be read or parsed, or the merged values are invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let source = match config_path {
            Some(path) if path.is_file() => Some(path.to_path_buf()),
            Some(path) => return Err(ConfigError::NotFound(path.to_path_buf())),
            None => std::env::current_dir().ok().as_deref().and_then(discover),
        };

        let mut config = match source {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&raw)?;
        config.server.host = expand::expand_env(&config.server.host, "server.host")?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        self.server.port = settings.port.unwrap_or(self.server.port);
        self.watch.enabled = settings.watch_enabled.unwrap_or(self.watch.enabled);
    }

    /// Check value ranges and glob syntax.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.server.host.trim().is_empty(), "server.host must not be empty"),
            // Advertised to browsers in the injected script.
            (self.server.port == 0, "server.port must be a fixed port, not 0"),
            (self.serve.chunk_size == 0, "serve.chunk_size must be positive"),
        ];
        if let Some((_, message)) = checks.into_iter().find(|(failed, _)| *failed) {
            return Err(ConfigError::Validation(message.to_owned()));
        }

        if self.watch.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Validation(format!(
                "watch.debounce_ms must be at most {MAX_DEBOUNCE_MS}"
            )));
        }

        if let Some((pattern, e)) = self
            .watch
            .ignore
            .iter()
            .find_map(|p| glob::Pattern::new(p).err().map(|e| (p, e)))
        {
            return Err(ConfigError::Validation(format!(
                "watch.ignore entry {pattern:?}: {e}"
            )));
        }

        Ok(())
    }
}

/// Nearest `lrs.toml` in `start` or its ancestors.
fn discover(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.serve.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(config.watch.enabled);
        assert_eq!(config.watch.debounce_ms, 100);
        assert!(config.config_path.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.serve.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_every_table() {
        let config: Config = toml::from_str(
            r#"
[server]
host = "127.0.0.1"
port = 3000

[serve]
chunk_size = 4096

[watch]
enabled = false
debounce_ms = 250
ignore = ["node_modules/**"]
"#,
        )
        .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.serve.chunk_size, 4096);
        assert!(!config.watch.enabled);
        assert_eq!(config.watch.debounce_ms, 250);
        assert_eq!(config.watch.ignore, ["node_modules/**"]);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = toml::from_str::<Config>("[server]\nprot = 1\n").unwrap_err();
        assert!(err.to_string().contains("prot"), "{err}");
    }

    #[test]
    fn test_validation_messages_name_the_key() {
        let cases: [(fn(&mut Config), &str); 5] = [
            (|c| c.server.host = " ".to_owned(), "server.host"),
            (|c| c.server.port = 0, "server.port"),
            (|c| c.serve.chunk_size = 0, "serve.chunk_size"),
            (|c| c.watch.debounce_ms = 60_000, "watch.debounce_ms"),
            (|c| c.watch.ignore = vec!["[".to_owned()], "watch.ignore"),
        ];

        for (mutate, key) in cases {
            let mut config = Config::default();
            mutate(&mut config);
            let err = config.validate().unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)));
            assert!(err.to_string().contains(key), "{err}");
        }
    }

    #[test]
    fn test_cli_settings_override_only_given_values() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings {
            port: Some(9000),
            watch_enabled: Some(false),
            ..CliSettings::default()
        });

        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 9000);
        assert!(!config.watch.enabled);
    }

    #[test]
    fn test_load_explicit_file() {
        let (_dir, path) = write_config("[server]\nport = 3000\n");

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/lrs.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_validates_file_values() {
        let (_dir, path) = write_config("[serve]\nchunk_size = 0\n");

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_cli_settings_win_over_file() {
        let (_dir, path) = write_config("[server]\nhost = \"0.0.0.0\"\nport = 3000\n");
        let settings = CliSettings {
            port: Some(4000),
            ..CliSettings::default()
        };

        let config = Config::load(Some(&path), Some(&settings)).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn test_discover_walks_up_to_ancestor() {
        let (dir, path) = write_config("");
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(discover(&nested), Some(path));
    }
}
