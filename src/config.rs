// src/config.rs
//! Unified configuration management - single place that reads the environment

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::autosave::AutosaveConfig;

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub environment: EnvironmentConfig,
    pub service: ServiceConfig,
    pub autosave: AutosaveConfig,
}

#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub database_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub ai_service_url: String,
    pub timeout_seconds: u64,
}

impl ConfigManager {
    /// Load all configurations
    pub fn load() -> Result<Self> {
        Ok(Self {
            environment: Self::load_environment()?,
            service: Self::load_service(),
            autosave: Self::load_autosave(),
        })
    }

    fn load_environment() -> Result<EnvironmentConfig> {
        let env = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "local".to_string());
        info!("Loading environment configuration for: {}", env);

        let base_dir = if env == "production" {
            PathBuf::from("/app")
        } else {
            std::env::current_dir().context("Failed to get current directory")?
        };

        Ok(EnvironmentConfig {
            database_path: base_dir.join("resume_builder.db"),
        })
    }

    fn load_service() -> ServiceConfig {
        let ai_service_url = std::env::var("AI_SERVICE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:5555".to_string());

        ServiceConfig {
            ai_service_url,
            timeout_seconds: 60,
        }
    }

    fn load_autosave() -> AutosaveConfig {
        let debounce_ms = std::env::var("AUTOSAVE_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(2500);

        AutosaveConfig {
            debounce: Duration::from_millis(debounce_ms),
            ..AutosaveConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autosave_defaults() {
        let autosave = AutosaveConfig::default();
        assert_eq!(autosave.debounce, Duration::from_millis(2500));
        assert_eq!(autosave.status_revert, Duration::from_millis(2000));
    }
}
