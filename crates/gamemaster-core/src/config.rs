//! Configuration resolution for `GameMaster`.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/gamemaster/settings.json)
//! 3. Project config (.gamemaster/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete `GameMaster` configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub referee: RefereeConfig,
}

/// Referee-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefereeConfig {
    /// Player command lines in launch order. Index 0 is the master.
    pub programs: Vec<String>,
    pub log_level: String,
    pub log_json: bool,
    /// How long shutdown waits for a killed player to be reaped.
    pub kill_timeout_ms: u64,
}

/// One `settings.json` layer. Fields it leaves out keep the lower layer's value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    referee: RefereeFile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RefereeFile {
    programs: Option<Vec<String>>,
    log_level: Option<String>,
    log_json: Option<bool>,
    kill_timeout_ms: Option<u64>,
}

impl Default for RefereeConfig {
    fn default() -> Self {
        Self {
            programs: Vec::new(),
            log_level: "info".to_string(),
            log_json: false,
            kill_timeout_ms: 2_000,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path()
        && global_path.exists()
    {
        let global = load_config_file(&global_path)?;
        merge_config(&mut config, global);
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".gamemaster").join("settings.json");
        if project_path.exists() {
            let project = load_config_file(&project_path)?;
            merge_config(&mut config, project);
        }
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("gamemaster").join("settings.json"))
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: ConfigFile) {
    let overlay = overlay.referee;
    // An empty lineup keeps the lower layer's programs.
    if let Some(programs) = overlay.programs.filter(|p| !p.is_empty()) {
        base.referee.programs = programs;
    }
    if let Some(level) = overlay.log_level {
        base.referee.log_level = level;
    }
    if let Some(json) = overlay.log_json {
        base.referee.log_json = json;
    }
    if let Some(ms) = overlay.kill_timeout_ms {
        base.referee.kill_timeout_ms = ms;
    }
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("GAMEMASTER_LOG_LEVEL") {
        config.referee.log_level = val;
    }
    if let Some(val) = var("GAMEMASTER_LOG_JSON") {
        config.referee.log_json = matches!(val.as_str(), "1" | "true" | "yes");
    }
    if let Some(val) = var("GAMEMASTER_KILL_TIMEOUT_MS")
        && let Ok(n) = val.parse()
    {
        config.referee.kill_timeout_ms = n;
    }
}
