//! Application path management for portable and installed modes.
//!
//! ## Mode Detection
//!
//! - **Portable mode**: If a `.portable` marker file exists next to the
//!   executable, all data files are stored in the same directory.
//! - **Installed mode** (default): Data is stored in the platform data
//!   directory (`~/.local/share/frontend-input` on Linux).

use std::path::PathBuf;
use tracing::debug;

use crate::config::AppConfig;

/// Application name used for directories in installed mode
const APP_NAME: &str = "frontend-input";

/// Application paths for config, settings database and mapping documents.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Path to the configuration file
    pub config: PathBuf,
    /// Path to the state directory (sled database, mapping documents)
    pub state_dir: PathBuf,
    /// Whether running in portable mode (config next to exe)
    pub is_portable: bool,
}

impl AppPaths {
    /// Detect the appropriate paths based on environment.
    ///
    /// **Debug mode**: If `config.yaml` exists in the current working directory,
    /// use that directory.
    ///
    /// **Portable mode**: If a `.portable` marker file exists next to the
    /// executable, all data files are stored in the same directory.
    ///
    /// **Installed mode** (default): Data is stored in the platform data dir.
    ///
    /// Note: This is called before logging is initialized, so we use eprintln
    /// for early diagnostic output.
    pub fn detect() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));

        #[cfg(debug_assertions)]
        {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            let cwd_config = cwd.join("config.yaml");
            if cwd_config.exists() {
                eprintln!(
                    "[paths] Running in DEV mode (config.yaml found in cwd: {})",
                    cwd.display()
                );
                return Self::in_dir(cwd, true);
            }
        }

        if exe_dir.join(".portable").exists() {
            #[cfg(debug_assertions)]
            eprintln!("[paths] Running in PORTABLE mode (.portable marker found)");
            Self::in_dir(exe_dir, true)
        } else {
            let app_data = dirs::data_dir()
                .unwrap_or_else(|| {
                    eprintln!(
                        "[paths] WARNING: dirs::data_dir() returned None, falling back to exe dir"
                    );
                    exe_dir.clone()
                })
                .join(APP_NAME);
            Self {
                config: app_data.join("config.yaml"),
                state_dir: app_data.join("state"),
                is_portable: false,
            }
        }
    }

    /// Paths rooted at `dir` (config next to a `.state` directory)
    pub fn in_dir(dir: PathBuf, is_portable: bool) -> Self {
        Self {
            config: dir.join("config.yaml"),
            state_dir: dir.join(".state"),
            is_portable,
        }
    }

    /// Use an explicit config file; state stays where it was detected
    pub fn with_config(mut self, config: PathBuf) -> Self {
        self.config = config;
        self
    }

    /// Get the sled database path, honouring `storage.path`
    pub fn sled_db_path(&self, config: &AppConfig) -> PathBuf {
        config
            .storage
            .path
            .clone()
            .unwrap_or_else(|| self.state_dir.join("sled"))
    }

    /// Get the mapping document directory, honouring `input.mapping_dir`
    pub fn mappings_dir(&self, config: &AppConfig) -> PathBuf {
        config
            .input
            .mapping_dir
            .clone()
            .unwrap_or_else(|| self.state_dir.join("mappings"))
    }

    /// Ensure the state directory exists.
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        if !self.state_dir.exists() {
            debug!("Creating state directory: {}", self.state_dir.display());
            std::fs::create_dir_all(&self.state_dir)?;
        }
        Ok(())
    }
}
