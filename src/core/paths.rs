// src/core/paths.rs

use crate::constants::{HOME_ENV_VAR, SETTINGS_FILENAME, TOOL_REGISTRY_FILENAME};
use lazy_static::lazy_static;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

lazy_static! {
    static ref TOOLWRAP_CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Could not create config directory at '{path}': {source}")]
    ConfigDirCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not expand path template '{template}': {reason}")]
    Expansion { template: String, reason: String },
}

/// Returns the toolwrap configuration directory: `$TOOLWRAP_HOME` when set, otherwise
/// `<system config dir>/toolwrap`. Creates it if it doesn't exist.
///
/// Memoized: the first call computes and caches the path.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    let mut cached_path_guard = TOOLWRAP_CONFIG_DIR
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(path) = &*cached_path_guard {
        return Ok(path.clone());
    }

    let override_dir = std::env::var_os(HOME_ENV_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    let config_path = resolve_config_dir(override_dir, dirs::config_dir())?;
    ensure_dir(&config_path)?;

    *cached_path_guard = Some(config_path.clone());
    Ok(config_path)
}

/// Picks the configuration directory from an explicit override or the system default.
pub fn resolve_config_dir(
    override_dir: Option<PathBuf>,
    system_config_dir: Option<PathBuf>,
) -> Result<PathBuf, PathError> {
    match override_dir {
        Some(dir) => Ok(dir),
        None => system_config_dir
            .map(|d| d.join("toolwrap"))
            .ok_or(PathError::ConfigDirNotFound),
    }
}

fn ensure_dir(path: &Path) -> Result<(), PathError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| PathError::ConfigDirCreation {
            path: path.display().to_string(),
            source: e,
        })?;
    }
    Ok(())
}

/// Path of `settings.toml`.
pub fn get_settings_path() -> Result<PathBuf, PathError> {
    get_config_dir().map(|dir| dir.join(SETTINGS_FILENAME))
}

/// Path of the persisted tool registry.
pub fn get_tool_registry_path() -> Result<PathBuf, PathError> {
    get_config_dir().map(|dir| dir.join(TOOL_REGISTRY_FILENAME))
}

/// Expands `~` and environment variables (`$VAR`, `${VAR}`) in a path template.
pub fn expand_path_template(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        reason: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins_over_system_dir() {
        let dir = resolve_config_dir(
            Some(PathBuf::from("/custom/home")),
            Some(PathBuf::from("/etc/xdg")),
        )
        .unwrap();
        assert_eq!(dir, PathBuf::from("/custom/home"));
    }

    #[test]
    fn test_system_dir_gets_toolwrap_suffix() {
        let dir = resolve_config_dir(None, Some(PathBuf::from("/home/u/.config"))).unwrap();
        assert_eq!(dir, PathBuf::from("/home/u/.config/toolwrap"));
        assert!(matches!(
            resolve_config_dir(None, None),
            Err(PathError::ConfigDirNotFound)
        ));
    }

    #[test]
    fn test_expand_path_template() {
        let plain = expand_path_template("/opt/payloads").unwrap();
        assert_eq!(plain, PathBuf::from("/opt/payloads"));
        assert!(matches!(
            expand_path_template("$TOOLWRAP_SURELY_UNDEFINED_VAR/x"),
            Err(PathError::Expansion { .. })
        ));
    }
}
