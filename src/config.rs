use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TICK_ENV: &str = "L2UNITY_TICK_MS";
pub const LOG_ENV: &str = "L2UNITY_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("usage: l2unity <data-root> [config-file]")]
    Usage,
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        if args.len() < 2 {
            return Err(ConfigError::Usage);
        }

        let root = Path::new(&args[1]).to_path_buf();
        let config_path = if args.len() > 2 {
            PathBuf::from(&args[2])
        } else {
            root.join("server.yaml")
        };
        let mut server = ServerConfig::load(&config_path)?;
        server.apply_overrides(env_value(TICK_ENV), env_value(LOG_ENV))?;
        Ok(Self {
            root,
            config_path,
            server,
        })
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub buffs_max_amount: u32,
    pub triggered_buffs_max_amount: u32,
    pub dances_max_amount: u32,
    pub debuffs_max_amount: u32,
    pub max_evasion: f64,
    pub tick_millis: u64,
    pub log_filter: String,
    pub log_to_file: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            buffs_max_amount: 20,
            triggered_buffs_max_amount: 12,
            dances_max_amount: 12,
            debuffs_max_amount: 24,
            max_evasion: 250.0,
            tick_millis: 100,
            log_filter: "info".to_string(),
            log_to_file: true,
        }
    }
}

impl ServerConfig {
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_overrides(
        &mut self,
        tick_millis: Option<String>,
        log_filter: Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = tick_millis {
            self.tick_millis = value
                .parse::<u64>()
                .ok()
                .filter(|millis| *millis > 0)
                .ok_or(ConfigError::InvalidEnv {
                    name: TICK_ENV,
                    value,
                })?;
        }
        if let Some(value) = log_filter {
            self.log_filter = value;
        }
        Ok(())
    }

    pub fn rules(&self) -> GameRules {
        GameRules {
            buffs_max_amount: self.buffs_max_amount,
            triggered_buffs_max_amount: self.triggered_buffs_max_amount,
            dances_max_amount: self.dances_max_amount,
            debuffs_max_amount: self.debuffs_max_amount,
            max_evasion: self.max_evasion,
        }
    }
}

/// The gameplay limits creatures are simulated under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameRules {
    pub buffs_max_amount: u32,
    pub triggered_buffs_max_amount: u32,
    pub dances_max_amount: u32,
    pub debuffs_max_amount: u32,
    pub max_evasion: f64,
}

impl Default for GameRules {
    fn default() -> Self {
        ServerConfig::default().rules()
    }
}
