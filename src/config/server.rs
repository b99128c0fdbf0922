use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Server settings. Every field may be set in a TOML file; command-line
/// flags override the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Lifetime of login tokens. `None` issues tokens that never expire.
    pub token_ttl_seconds: Option<i64>,
    /// How often department asset totals are snapshotted. Zero disables it.
    pub stats_interval_seconds: u64,
}

impl ServerConfig {
    /// Reads a TOML file; fields it leaves out keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("assetry.db")
    }

    #[must_use]
    pub fn token_ttl(&self) -> Option<chrono::Duration> {
        self.token_ttl_seconds
            .filter(|s| *s > 0)
            .map(chrono::Duration::seconds)
    }

    #[must_use]
    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_seconds > 0).then(|| Duration::from_secs(self.stats_interval_seconds))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            token_ttl_seconds: Some(7 * 24 * 60 * 60),
            stats_interval_seconds: 24 * 60 * 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("assetry.toml");
        std::fs::write(&path, "port = 9000\ntoken_ttl_seconds = 60\n").unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.token_ttl(), Some(chrono::Duration::seconds(60)));
        assert_eq!(config.db_path(), PathBuf::from("./data/assetry.db"));
        assert_eq!(config.socket_addr().unwrap().port(), 9000);
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("assetry.toml");
        std::fs::write(&path, "port = \"eighty\"").unwrap();
        assert!(matches!(ServerConfig::load(&path), Err(Error::Config(_))));
        assert!(matches!(
            ServerConfig::load(temp.path().join("missing.toml")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_zero_disables_intervals() {
        let config = ServerConfig {
            token_ttl_seconds: Some(0),
            stats_interval_seconds: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.token_ttl(), None);
        assert_eq!(config.stats_interval(), None);
    }
}
