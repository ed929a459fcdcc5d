//! Application configuration for mdcc.
//!
//! User config lives at `~/.mdcc/mdcc.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MdccError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "mdcc.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".mdcc";

/// Placeholder in instruction args replaced by the instruction text.
pub const INSTRUCTION_PLACEHOLDER: &str = "{instruction}";

// ---------------------------------------------------------------------------
// Config structs (matching mdcc.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Defaults applied to every file group.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// External instruction command settings.
    #[serde(default)]
    pub instructions: InstructionsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum concurrent instruction runs; 0 means available parallelism.
    #[serde(default)]
    pub threads: usize,

    /// Context lines kept before each matching line.
    #[serde(default)]
    pub lines_before: usize,

    /// Context lines kept after each matching line.
    #[serde(default)]
    pub lines_after: usize,

    /// Prefix emitted lines with their 1-based line number.
    #[serde(default)]
    pub line_numbers: bool,
}

/// `[instructions]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionsConfig {
    /// Program invoked once per instruction.
    #[serde(default = "default_command")]
    pub command: String,

    /// Arguments; `{instruction}` is replaced by the instruction text.
    /// The current content is written to stdin and stdout is the result.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Seconds before a single instruction run is abandoned.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for InstructionsConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_command() -> String {
    "claude".into()
}
fn default_args() -> Vec<String> {
    vec!["--print".into(), INSTRUCTION_PLACEHOLDER.into()]
}
fn default_timeout_secs() -> u64 {
    600
}

impl InstructionsConfig {
    /// Check that the command is usable before any file is processed.
    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(MdccError::config("[instructions] command must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(MdccError::config(
                "[instructions] timeout_secs must be greater than zero",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.mdcc/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| MdccError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.mdcc/mdcc.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MdccError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| MdccError::config(format!("failed to parse {}: {e}", path.display())))?;
    config.instructions.validate()?;

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    init_config_in(&config_dir()?)
}

/// Write a default config file into `dir`, creating it if needed.
pub fn init_config_in(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| MdccError::io(dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MdccError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MdccError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
