//! Startup configuration: memory file location and cache freshness window.

use mem_graph::DEFAULT_CACHE_TTL;
use std::path::PathBuf;
use std::time::Duration;

pub const PATH_ENV: &str = "MEMORY_FILE_PATH";
pub const CACHE_TTL_ENV: &str = "MEMORY_CACHE_TTL_SECS";
pub const DEFAULT_FILE_NAME: &str = "memory.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub memory_file_path: PathBuf,
    pub cache_ttl: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid MEMORY_CACHE_TTL_SECS value {0:?}: expected whole seconds")]
    InvalidCacheTtl(String),
    #[error("cannot locate the running executable: {0}")]
    Executable(#[source] std::io::Error),
}

impl Config {
    /// Resolve from the process arguments and environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    /// Path: `--path <p>` / `-p <p>` / `--path=<p>`, then `MEMORY_FILE_PATH`, then
    /// `memory.json` beside the executable. TTL: `MEMORY_CACHE_TTL_SECS`, then 300s.
    pub fn resolve<I, F>(args: I, env: F) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let memory_file_path = match path_from_args(args).or_else(|| env(PATH_ENV)) {
            Some(p) => PathBuf::from(p),
            None => default_memory_path()?,
        };

        let cache_ttl = match env(CACHE_TTL_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidCacheTtl(raw))?,
            None => DEFAULT_CACHE_TTL,
        };

        Ok(Self {
            memory_file_path,
            cache_ttl,
        })
    }
}

fn path_from_args<I: IntoIterator<Item = String>>(args: I) -> Option<String> {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--path=") {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        } else if arg == "--path" || arg == "-p" {
            // A flag without a value falls through to the next source.
            return args.next().filter(|v| !v.is_empty());
        }
    }
    None
}

fn default_memory_path() -> Result<PathBuf, ConfigError> {
    let exe = std::env::current_exe().map_err(ConfigError::Executable)?;
    let dir = exe.parent().map(PathBuf::from).unwrap_or_default();
    Ok(dir.join(DEFAULT_FILE_NAME))
}
