use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::core::catalog;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/v1/openai";
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    /// Chat backend base URL (e.g., "https://chat.example.com/v1/openai").
    pub base_url: Option<String>,
    /// Catalog identifier used when no `--model` flag is given.
    pub default_model: Option<String>,
    pub temperature: Option<f32>,
    /// Transcript log file, appended to as the conversation progresses.
    pub log_file: Option<String>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Record a model switch so the next session starts on the same model.
    /// Other fields in the file are left untouched.
    pub fn persist_default_model(model_id: &str) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::config_path()?;
        Self::persist_default_model_at(&config_path, model_id)
    }

    pub fn persist_default_model_at(
        config_path: &PathBuf,
        model_id: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut config = Self::load_from_path(config_path)?;
        config.default_model = Some(model_id.to_string());
        config.save_to_path(config_path)
    }

    fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "palaver")
            .ok_or("failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn default_model(&self) -> String {
        self.default_model
            .clone()
            .unwrap_or_else(|| catalog::default_model().id.to_string())
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }
}
