use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Startup configuration read from `config.json` in the data directory.
/// Every key is individually optional; remote sync only activates when all
/// three are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    pub server: Option<String>,
    pub server_port: Option<u16>,
    pub password: Option<String>,
}

impl Settings {
    /// A missing or unreadable config file is fatal. Create an empty json
    /// object to run local-only.
    pub fn load(data_dir: &Path) -> Result<Settings> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("{} not found at {:?}", CONFIG_FILE_NAME, path))?;
        let settings = serde_json::from_str(&text)
            .with_context(|| format!("invalid {}", CONFIG_FILE_NAME))?;
        Ok(settings)
    }
}
