//! Runtime configuration
//!
//! Values come from the environment (optionally seeded from a `.env` file by
//! the binary) and can be overridden on the command line.

use directories::ProjectDirs;
use std::path::PathBuf;
use thiserror::Error;

use crate::cache::LoadPolicy;
use crate::cli::Cli;
use crate::upstream::{DEFAULT_LANGUAGE, TMDB_BASE_URL};

#[derive(Debug, Error)]
pub enum ConfigError {
    /// No bearer credential for the upstream API
    #[error("TMDB_BEARER_TOKEN environment variable is required")]
    MissingToken,

    /// A variable was set but could not be parsed
    #[error("Invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub cache_dir: PathBuf,
    pub load_policy: LoadPolicy,
    pub bearer_token: String,
    pub base_url: String,
    pub language: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cache_dir", &self.cache_dir)
            .field("load_policy", &self.load_policy)
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl Config {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const FALLBACK_CACHE_DIR: &'static str = "./cache";

    /// Reads configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bearer_token = lookup("TMDB_BEARER_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let port = match lookup("SHOWCACHE_PORT") {
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "SHOWCACHE_PORT",
                value,
            })?,
            None => Self::DEFAULT_PORT,
        };

        let load_policy = match lookup("SHOWCACHE_STRICT_CACHE_LOAD").as_deref() {
            None => LoadPolicy::FallbackEmpty,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => LoadPolicy::Strict,
                "0" | "false" | "no" | "" => LoadPolicy::FallbackEmpty,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "SHOWCACHE_STRICT_CACHE_LOAD",
                        value: value.to_string(),
                    })
                }
            },
        };

        Ok(Self {
            host: lookup("SHOWCACHE_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            port,
            cache_dir: lookup("SHOWCACHE_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_cache_dir),
            load_policy,
            bearer_token,
            base_url: lookup("TMDB_BASE_URL").unwrap_or_else(|| TMDB_BASE_URL.to_string()),
            language: lookup("TMDB_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        })
    }

    /// Applies command-line overrides on top of the environment values
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(dir) = &cli.cache_dir {
            self.cache_dir = dir.clone();
        }
        if cli.strict_cache {
            self.load_policy = LoadPolicy::Strict;
        }
        self
    }

    /// Address the server binds to, as `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// XDG-compliant cache directory (`~/.cache/showcache/` on Linux), or
/// `./cache` when no home directory can be determined.
fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("", "", "showcache")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(Config::FALLBACK_CACHE_DIR))
}
