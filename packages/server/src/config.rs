//! Server configuration, populated from environment variables.

use std::net::SocketAddr;

/// A configuration variable held a value that could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Runtime configuration for a riverdata server.
///
/// All fields are populated from environment variables with sensible
/// defaults, so a server can be started with zero configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `RIVERDATA_BIND` | `0.0.0.0:7000` | TCP socket address to listen on |
/// | `RIVERDATA_DB` | (absent = in-memory) | Path to the SQLite database file |
/// | `RIVERDATA_DEFAULT_PAGE_SIZE` | `500` | Page size when neither cursor nor `page-size` gives one |
/// | `RIVERDATA_MAX_PAGE_SIZE` | `5000` | Upper bound for requested page sizes |
/// | `RIVERDATA_SEED` | (absent) | JSON seed document loaded at start-up |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    /// Path to the SQLite database file.
    /// `None` means use an in-memory store (data is lost on restart).
    pub db_path: Option<String>,

    pub default_page_size: u32,

    /// Requested page sizes above this are clamped down to it.
    pub max_page_size: u32,

    /// Seed document to load before serving.
    pub seed_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 7000)),
            db_path: None,
            default_page_size: 500,
            max_page_size: 5000,
            seed_path: None,
        }
    }
}

impl ServerConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Populate config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = match lookup("RIVERDATA_BIND") {
            Some(v) => parse(
                "RIVERDATA_BIND",
                v,
                "a valid socket address (e.g. 0.0.0.0:7000)",
            )?,
            None => defaults.bind_addr,
        };

        let default_page_size = match lookup("RIVERDATA_DEFAULT_PAGE_SIZE") {
            Some(v) => positive("RIVERDATA_DEFAULT_PAGE_SIZE", v)?,
            None => defaults.default_page_size,
        };

        let max_page_size = match lookup("RIVERDATA_MAX_PAGE_SIZE") {
            Some(v) => positive("RIVERDATA_MAX_PAGE_SIZE", v)?,
            None => defaults.max_page_size,
        };

        Ok(Self {
            bind_addr,
            db_path: lookup("RIVERDATA_DB").filter(|v| !v.is_empty()),
            default_page_size: default_page_size.min(max_page_size),
            max_page_size,
            seed_path: lookup("RIVERDATA_SEED").filter(|v| !v.is_empty()),
        })
    }
}

fn parse<T: std::str::FromStr>(
    var: &'static str,
    value: String,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value,
        expected,
    })
}

fn positive(var: &'static str, value: String) -> Result<u32, ConfigError> {
    match parse::<u32>(var, value.clone(), "a positive integer")? {
        0 => Err(ConfigError::Invalid {
            var,
            value,
            expected: "a positive integer",
        }),
        n => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let c = config(&[]).unwrap();
        assert_eq!(c.bind_addr.port(), 7000);
        assert_eq!(c.default_page_size, 500);
        assert_eq!(c.max_page_size, 5000);
        assert!(c.db_path.is_none());
        assert!(c.seed_path.is_none());
    }

    #[test]
    fn reads_overrides() {
        let c = config(&[
            ("RIVERDATA_BIND", "127.0.0.1:8080"),
            ("RIVERDATA_DB", "/tmp/rd.db"),
            ("RIVERDATA_DEFAULT_PAGE_SIZE", "20"),
            ("RIVERDATA_MAX_PAGE_SIZE", "100"),
        ])
        .unwrap();
        assert_eq!(c.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(c.db_path.as_deref(), Some("/tmp/rd.db"));
        assert_eq!(c.default_page_size, 20);
        assert_eq!(c.max_page_size, 100);
    }

    #[test]
    fn default_page_size_never_exceeds_max() {
        let c = config(&[("RIVERDATA_MAX_PAGE_SIZE", "50")]).unwrap();
        assert_eq!(c.default_page_size, 50);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("RIVERDATA_BIND", "nowhere")]).is_err());
        let err = config(&[("RIVERDATA_MAX_PAGE_SIZE", "0")]).unwrap_err();
        assert!(err.to_string().contains("RIVERDATA_MAX_PAGE_SIZE"));
    }
}
