//! Flat string-keyed configuration.
//!
//! Every option is a string; typed accessors parse on demand and fall back
//! to the defaults below when a key is absent.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::net::addr::{EndpointSpec, parse_endpoint_list};

pub const LISTENING_PORTS: &str = "listening_ports";
pub const ENABLE_KEEP_ALIVE: &str = "enable_keep_alive";
pub const MAX_REQUEST_SIZE: &str = "max_request_size";
pub const MAX_HEADERS: &str = "max_headers";
pub const AUTO_CHUNK_SIZE: &str = "auto_chunk_size";
pub const ACCESS_LOG_PATH: &str = "access_log_path";

const DEFAULTS: &[(&str, &str)] = &[
    (LISTENING_PORTS, "8080"),
    (ENABLE_KEEP_ALIVE, "yes"),
    (MAX_REQUEST_SIZE, "16384"),
    (MAX_HEADERS, "64"),
    (AUTO_CHUNK_SIZE, "4096"),
];

/// On-disk shape: a single mapping of option names to scalars.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct RawConfig(BTreeMap<String, Value>);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    options: BTreeMap<String, String>,
}

impl Config {
    /// Loads the YAML file named by `TETHER_CONFIG`, if any, then applies the
    /// `LISTEN` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var_os("TETHER_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(listen) = std::env::var("LISTEN") {
            cfg.set(LISTENING_PORTS, listen);
        }

        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Parses a YAML mapping of option names to scalars.
    ///
    /// Booleans become `yes`/`no`, numbers their decimal text. Nested values
    /// are skipped with a warning.
    pub fn from_yaml_str(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        let RawConfig(raw) = serde_yaml::from_str(text)?;
        let mut cfg = Self::default();

        for (key, value) in raw {
            let value = match value {
                Value::String(s) => s,
                Value::Bool(true) => "yes".to_string(),
                Value::Bool(false) => "no".to_string(),
                Value::Number(n) => n.to_string(),
                Value::Null => String::new(),
                _ => {
                    tracing::warn!(key = %key, "Ignoring non-scalar configuration value");
                    continue;
                }
            };
            cfg.options.insert(key, value);
        }

        Ok(cfg)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }

    /// Raw value, falling back to the built-in default.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str).or_else(|| {
            DEFAULTS
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| *v)
        })
    }

    pub fn enable_keep_alive(&self) -> bool {
        self.get(ENABLE_KEEP_ALIVE)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("yes"))
    }

    /// Largest header block accepted before a request is rejected with 413.
    pub fn max_request_size(&self) -> Result<usize> {
        self.get_usize(MAX_REQUEST_SIZE)
    }

    pub fn max_headers(&self) -> Result<usize> {
        self.get_usize(MAX_HEADERS)
    }

    pub fn auto_chunk_size(&self) -> Result<usize> {
        self.get_usize(AUTO_CHUNK_SIZE)
    }

    pub fn listening_ports(&self) -> &str {
        self.get(LISTENING_PORTS).unwrap_or_default()
    }

    pub fn listening_endpoints(&self) -> Result<Vec<EndpointSpec>> {
        parse_endpoint_list(self.listening_ports())
    }

    pub fn access_log_path(&self) -> Option<&str> {
        self.get(ACCESS_LOG_PATH).filter(|v| !v.trim().is_empty())
    }

    fn get_usize(&self, key: &str) -> Result<usize> {
        let value = self.get(key).unwrap_or_default();
        value.trim().parse().map_err(|_| Error::InvalidConfig {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}
