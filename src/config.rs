//! Configuration management

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Address the listeners bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP ports to open deception listeners on.
    #[serde(default = "default_ports")]
    pub ports: Vec<u16>,
    /// Directory holding the day-named capture logs, created on first use.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Global cap on concurrent connection handlers; connections beyond the
    /// cap wait at accept rather than spawning without bound.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Per-read idle timeout. A peer that connects and goes silent is
    /// disconnected after this long instead of holding its task forever.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_ports() -> Vec<u16> {
    vec![21, 22, 80, 443]
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("honeypot_logs")
}

fn default_max_connections() -> usize {
    256
}

fn default_idle_timeout_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            ports: default_ports(),
            log_dir: default_log_dir(),
            max_connections: default_max_connections(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config.toml").required(false))
            .add_source(config::Environment::with_prefix("PORTSNARE").separator("__"));

        let settings = builder.build()?;
        let config: Config = settings.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.capture.host.is_empty() {
            anyhow::bail!("Capture host cannot be empty");
        }
        if self.capture.ports.is_empty() {
            anyhow::bail!("At least one capture port must be configured");
        }

        let mut seen = HashSet::new();
        for &port in &self.capture.ports {
            if port == 0 {
                anyhow::bail!("Invalid capture port: 0 is not allowed");
            }
            if !seen.insert(port) {
                anyhow::bail!("Duplicate capture port: {}", port);
            }
        }

        if self.capture.max_connections == 0 {
            anyhow::bail!("max_connections must be greater than 0");
        }
        if self.capture.idle_timeout_secs == 0 {
            anyhow::bail!("idle_timeout_secs must be greater than 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid logging level '{}'. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config {
            capture: CaptureConfig::default(),
            logging: LoggingConfig::default(),
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.capture.ports, vec![21, 22, 80, 443]);
    }

    #[test]
    fn rejects_port_zero() {
        let mut config = Config {
            capture: CaptureConfig::default(),
            logging: LoggingConfig::default(),
        };
        config.capture.ports.push(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_ports() {
        let mut config = Config {
            capture: CaptureConfig::default(),
            logging: LoggingConfig::default(),
        };
        config.capture.ports.push(22);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = Config {
            capture: CaptureConfig::default(),
            logging: LoggingConfig::default(),
        };
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }
}
