use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
    pub suggestions: SuggestionsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub stations_csv: PathBuf,
    pub residents_csv: PathBuf,
    pub geometry_csv: PathBuf,
    /// Name of the postal-code column shared by all three tables.
    pub join_column: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub layer_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SuggestionsConfig {
    pub path: PathBuf,
    pub admin_password: String,
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
