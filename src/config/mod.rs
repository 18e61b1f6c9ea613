use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "mapstitch";
const APP_CONFIG_FILE: &str = "config.json";

const DEFAULT_ZOOM_PERCENT: u16 = 100;
const DEFAULT_FRAME_WAIT_BUDGET: u32 = 10;
const DEFAULT_RETRY_BUDGET: u32 = 10;

/// Capture settings from `config.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CaptureConfig {
    /// Display zoom applied for the duration of the capture, in percent.
    #[serde(default = "default_zoom_percent")]
    pub zoom_percent: u16,
    /// Frame boundaries awaited after a redraw on a tile's first attempt.
    #[serde(default = "default_frame_wait_budget")]
    pub frame_wait_budget: u32,
    /// Extra validation attempts allowed per tile after the first.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            zoom_percent: DEFAULT_ZOOM_PERCENT,
            frame_wait_budget: DEFAULT_FRAME_WAIT_BUDGET,
            retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }
}

fn default_zoom_percent() -> u16 {
    DEFAULT_ZOOM_PERCENT
}

fn default_frame_wait_budget() -> u32 {
    DEFAULT_FRAME_WAIT_BUDGET
}

fn default_retry_budget() -> u32 {
    DEFAULT_RETRY_BUDGET
}

pub fn load_capture_config() -> CaptureConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_capture_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_capture_config_with(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> CaptureConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return CaptureConfig::default(),
    };
    if !path.exists() {
        return CaptureConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            CaptureConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            CaptureConfig::default()
        }
    }
}

fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}
