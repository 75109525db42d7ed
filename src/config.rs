//! Strongly-typed session configuration.
//!
//! Configuration values can be constructed from defaults, loaded from
//! environment variables (with optional `.env` support), or merged with
//! explicit overrides for ergonomic programmatic updates.

use std::env;
use std::fmt;
use std::num::ParseIntError;

use dotenvy::dotenv;
use serde::de::{Deserialize, Deserializer, Error as DeError};
use serde::ser::{Serialize, Serializer};
use serde::{Deserialize as DeriveDeserialize, Serialize as DeriveSerialize};
use thiserror::Error;

use crate::logging::LogCallback;

/// User agent presented by the default transport.
pub const DEFAULT_USER_AGENT: &str = concat!("pagewalk/", env!("CARGO_PKG_VERSION"));

/// Verbosity level for session logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Minimal,
    Medium,
    Detailed,
}

impl Verbosity {
    fn as_u8(self) -> u8 {
        match self {
            Verbosity::Minimal => 0,
            Verbosity::Medium => 1,
            Verbosity::Detailed => 2,
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Verbosity::Minimal),
            1 => Some(Verbosity::Medium),
            2 => Some(Verbosity::Detailed),
            _ => None,
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Medium
    }
}

impl Serialize for Verbosity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Verbosity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Verbosity::from_u8(value).ok_or_else(|| {
            DeError::custom(format!(
                "invalid verbosity value {value}; expected 0, 1, or 2"
            ))
        })
    }
}

/// Configuration values for a page session.
#[derive(DeriveSerialize, DeriveDeserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// Base URL that relative `visit` targets resolve against.
    #[serde(alias = "baseUrl")]
    pub base_url: Option<String>,
    #[serde(alias = "userAgent")]
    pub user_agent: String,
    #[serde(alias = "followRedirects")]
    pub follow_redirects: bool,
    #[serde(alias = "maxRedirects")]
    pub max_redirects: usize,
    #[serde(alias = "timeoutMs")]
    pub timeout_ms: Option<u64>,
    pub verbose: Verbosity,
    #[serde(skip_serializing, skip_deserializing)]
    pub logger: Option<LogCallback>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            base_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            follow_redirects: true,
            max_redirects: 10,
            timeout_ms: Some(30_000),
            verbose: Verbosity::default(),
            logger: None,
        }
    }
}

impl SessionConfig {
    /// Construct a configuration by reading relevant environment variables,
    /// after loading a `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv();
        let mut config = SessionConfig::default();

        if let Some(value) = env_var("PAGEWALK_BASE_URL") {
            config.base_url = Some(value);
        }

        if let Some(value) = env_var("PAGEWALK_USER_AGENT") {
            config.user_agent = value;
        }

        if let Some(value) = env_var("PAGEWALK_FOLLOW_REDIRECTS") {
            config.follow_redirects = parse_bool("PAGEWALK_FOLLOW_REDIRECTS", &value)?;
        }

        if let Some(value) = env_var("PAGEWALK_MAX_REDIRECTS") {
            config.max_redirects = parse_usize("PAGEWALK_MAX_REDIRECTS", &value)?;
        }

        if let Some(value) = env_var("PAGEWALK_TIMEOUT_MS") {
            config.timeout_ms = Some(parse_u64("PAGEWALK_TIMEOUT_MS", &value)?);
        }

        if let Some(value) = env_var("PAGEWALK_VERBOSE") {
            let parsed = parse_u8("PAGEWALK_VERBOSE", &value)?;
            config.verbose = Verbosity::from_u8(parsed).ok_or_else(|| {
                ConfigError::invalid_enum("PAGEWALK_VERBOSE", parsed.to_string())
            })?;
        }

        Ok(config)
    }

    /// Create a new configuration with explicit field overrides applied.
    pub fn with_overrides(&self, overrides: SessionConfigOverrides) -> SessionConfig {
        let mut next = self.clone();

        if let Some(value) = overrides.base_url {
            next.base_url = value;
        }
        if let Some(value) = overrides.user_agent {
            next.user_agent = value;
        }
        if let Some(value) = overrides.follow_redirects {
            next.follow_redirects = value;
        }
        if let Some(value) = overrides.max_redirects {
            next.max_redirects = value;
        }
        if let Some(value) = overrides.timeout_ms {
            next.timeout_ms = value;
        }
        if let Some(value) = overrides.verbose {
            next.verbose = value;
        }
        if let Some(value) = overrides.logger {
            next.logger = value;
        }

        next
    }
}

/// Field-level overrides for [`SessionConfig::with_overrides`].
#[derive(Default, Clone)]
pub struct SessionConfigOverrides {
    pub base_url: Option<Option<String>>,
    pub user_agent: Option<String>,
    pub follow_redirects: Option<bool>,
    pub max_redirects: Option<usize>,
    pub timeout_ms: Option<Option<u64>>,
    pub verbose: Option<Verbosity>,
    pub logger: Option<Option<LogCallback>>,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("follow_redirects", &self.follow_redirects)
            .field("max_redirects", &self.max_redirects)
            .field("timeout_ms", &self.timeout_ms)
            .field("verbose", &self.verbose)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// Failures while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {variable} holds an invalid number [{value}]")]
    InvalidNumber {
        variable: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("environment variable {variable} holds an invalid boolean [{value}]")]
    InvalidFlag {
        variable: &'static str,
        value: String,
    },
    #[error("environment variable {variable} holds an unsupported value [{value}]")]
    InvalidEnum {
        variable: &'static str,
        value: String,
    },
}

impl ConfigError {
    fn invalid_enum(variable: &'static str, value: String) -> Self {
        ConfigError::InvalidEnum { variable, value }
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_bool(variable: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            variable,
            value: value.to_string(),
        }),
    }
}

fn parse_u8(variable: &'static str, value: &str) -> Result<u8, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|source| ConfigError::InvalidNumber {
            variable,
            value: value.to_string(),
            source,
        })
}

fn parse_u64(variable: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|source| ConfigError::InvalidNumber {
            variable,
            value: value.to_string(),
            source,
        })
}

fn parse_usize(variable: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|source| ConfigError::InvalidNumber {
            variable,
            value: value.to_string(),
            source,
        })
}
