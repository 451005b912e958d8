//! User settings from `<config_dir>/cordage/settings.json`, overridden by
//! command-line arguments.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::buffer::SaveOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Editor settings. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Spaces inserted for Tab
    pub tab_width: usize,
    /// Keep the previous file contents as `<name>~` when saving
    pub backup_on_save: bool,
    /// Lines kept visible above and below the cursor
    pub scroll_margin: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tab_width: 2,
            backup_on_save: false,
            scroll_margin: 3,
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cordage")
            .join("settings.json")
    }

    /// Loads the user's settings, falling back to defaults when the file is
    /// missing or broken.
    pub fn load() -> Self {
        let path = Self::config_path();
        match Self::from_file(&path) {
            Ok(Some(settings)) => settings,
            Ok(None) => Self::default(),
            Err(err) => {
                warn!("{err}; using default settings");
                Self::default()
            }
        }
    }

    /// `Ok(None)` when the file does not exist.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let settings = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("loaded settings from {}", path.display());
        Ok(Some(settings))
    }

    pub fn apply(&mut self, cli: &Cli) {
        if let Some(tab_width) = cli.tab_width {
            self.tab_width = tab_width;
        }
        if cli.backup {
            self.backup_on_save = true;
        }
    }

    pub fn save_options(&self) -> SaveOptions {
        SaveOptions {
            backup: self.backup_on_save,
        }
    }
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "cordage", version, about = "A terminal text editor", long_about = None)]
pub struct Cli {
    /// File to open; created on first save if it does not exist
    pub file: Option<PathBuf>,

    /// Log file, or directory to place it in
    #[arg(long, env = "CORDAGE_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Spaces inserted for Tab
    #[arg(long)]
    pub tab_width: Option<usize>,

    /// Keep a `<name>~` copy of the previous contents on save
    #[arg(long)]
    pub backup: bool,
}
