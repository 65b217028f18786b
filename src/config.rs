use std::path::PathBuf;

use color_eyre::{Result, eyre::Context, eyre::eyre};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    database: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: "~/.local/share/recipe-manager/recipes.db".to_string(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Get the config file path (similar to beets)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("recipe-manager").join("config.toml"))
    }

    /// Load config with default fallback
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path().ok_or_else(|| eyre!("Config file not found"))?;

        Self::from_file(&config_path)
    }

    /// Create a default config file, unless one already exists
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or_else(|| eyre!("No default config path found"))?;
        if path.exists() {
            return Ok(path);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context(format!(
                "Failed to create config directory: {}",
                parent.display()
            ))?;
        }

        let contents =
            toml::to_string_pretty(&Config::default()).context("Failed to serialize config")?;
        std::fs::write(&path, contents)
            .context(format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if path.starts_with("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(&path[2..]);
            }
        }
        PathBuf::from(path)
    }

    /// Get expanded database path
    pub fn database_path(&self) -> PathBuf {
        self.expand_path(&self.database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "database = \"/tmp/recipes.db\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/tmp/recipes.db"));
    }

    #[test]
    fn test_expands_home_directory() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "database = \"~/recipes.db\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.database_path(), home.join("recipes.db"));
    }
}
