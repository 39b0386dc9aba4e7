use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Server settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    /// Primary store, the system of record.
    pub db_path: PathBuf,
    /// Secondary store to mirror writes into. Unset means no mirroring.
    pub secondary_db_path: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub mirror_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = get("QUILL_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("QUILL_PORT must be a port number")?;
        let mirror_timeout_ms: u64 = get("QUILL_MIRROR_TIMEOUT_MS")
            .unwrap_or_else(|| "2000".into())
            .parse()
            .context("QUILL_MIRROR_TIMEOUT_MS must be a number of milliseconds")?;

        Ok(Self {
            db_path: get("QUILL_DB_PATH").unwrap_or_else(|| "quill.db".into()).into(),
            secondary_db_path: get("QUILL_SECONDARY_DB_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            host: get("QUILL_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            mirror_timeout: Duration::from_millis(mirror_timeout_ms),
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))?;
        Ok(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("quill.db"));
        assert!(cfg.secondary_db_path.is_none());
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.mirror_timeout, Duration::from_millis(2000));
        assert_eq!(cfg.bind_addr().unwrap().to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn explicit_values_win() {
        let cfg = config(&[
            ("QUILL_DB_PATH", "/data/blog.db"),
            ("QUILL_SECONDARY_DB_PATH", "/data/mirror.db"),
            ("QUILL_HOST", "127.0.0.1"),
            ("QUILL_PORT", "8080"),
            ("QUILL_MIRROR_TIMEOUT_MS", "250"),
        ])
        .unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("/data/blog.db"));
        assert_eq!(cfg.secondary_db_path, Some(PathBuf::from("/data/mirror.db")));
        assert_eq!(cfg.mirror_timeout, Duration::from_millis(250));
        assert_eq!(cfg.bind_addr().unwrap().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn empty_secondary_path_means_no_mirror() {
        let cfg = config(&[("QUILL_SECONDARY_DB_PATH", "")]).unwrap();
        assert!(cfg.secondary_db_path.is_none());
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(config(&[("QUILL_PORT", "http")]).is_err());
    }
}
