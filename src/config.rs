//! Kernel configuration.
//!
//! Loaded from the environment (and a `.env` file when present):
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `RESTPARAM_ADDR` | `0.0.0.0:3000` | listen address |
//! | `RESTPARAM_MAX_BODY_SIZE` | `8388608` | request body limit in bytes |
//! | `RESTPARAM_PARAM_FETCHER_LISTENER` | `enabled` | `enabled` or `force` |
//! | `RESTPARAM_PARAMETER_<NAME>` | | placeholder `%name%` (lowercased) |
//!
//! or deserialized from any serde format with the same field names.

use std::net::SocketAddr;
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;
use crate::parameters::Parameters;

const PREFIX: &str = "RESTPARAM_";
const PARAMETER_PREFIX: &str = "RESTPARAM_PARAMETER_";

/// What the kernel does with declared params before calling a handler.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ListenerMode {
    /// Handlers fetch params on demand through `Request::param_fetcher`.
    #[default]
    Enabled,
    /// Every param is fetched up front and stored as a request attribute;
    /// a failure short-circuits the handler.
    Force,
}

impl FromStr for ListenerMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enabled" | "true" => Ok(Self::Enabled),
            "force" => Ok(Self::Force),
            other => Err(Error::Config(format!("unknown param fetcher listener mode `{other}`"))),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub addr: SocketAddr,
    /// Larger request bodies are rejected with a 400.
    pub max_body_size: usize,
    pub param_fetcher_listener: ListenerMode,
    /// Values for `%name%` placeholders in param defaults and requirements.
    pub parameters: Parameters,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_body_size: 8 * 1024 * 1024,
            param_fetcher_listener: ListenerMode::default(),
            parameters: Parameters::default(),
        }
    }
}

impl Config {
    /// Reads `RESTPARAM_*` variables, loading `.env` first if it exists.
    pub fn from_env() -> Result<Self, Error> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded environment file");
        }
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            if let Some(name) = key.strip_prefix(PARAMETER_PREFIX) {
                config.parameters.insert(name.to_ascii_lowercase(), value);
                continue;
            }
            match key.strip_prefix(PREFIX) {
                Some("ADDR") => {
                    config.addr = value
                        .parse()
                        .map_err(|e| Error::Config(format!("{key}=`{value}`: {e}")))?;
                }
                Some("MAX_BODY_SIZE") => {
                    config.max_body_size = value
                        .parse()
                        .map_err(|e| Error::Config(format!("{key}=`{value}`: {e}")))?;
                }
                Some("PARAM_FETCHER_LISTENER") => config.param_fetcher_listener = value.parse()?,
                _ => {}
            }
        }
        Ok(config)
    }

    /// Parses a JSON document.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn with_listener(mut self, mode: ListenerMode) -> Self {
        self.param_fetcher_listener = mode;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters = self.parameters.with(name, value);
        self
    }
}
