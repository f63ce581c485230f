// src/core/settings.rs

//! Loading of `settings.toml`, created with defaults on first use.

use crate::constants::{
    DEFAULT_CONFIG_FILE_NAME, DEFAULT_CONFIG_FILE_SWITCH, DEFAULT_EXECUTABLE_SUBDIR,
};
use crate::core::command_generator::{ListEmission, PluginSettings};
use crate::core::paths::{self, PathError};
use crate::core::payload::PayloadDirectory;
use crate::models::AppSettings;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Could not access settings file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Path(#[from] PathError),
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            payload_dir: None,
            executable_subdir: DEFAULT_EXECUTABLE_SUBDIR.to_string(),
            list_emission: ListEmission::default(),
            config_file_switch: DEFAULT_CONFIG_FILE_SWITCH.to_string(),
            config_file_name: DEFAULT_CONFIG_FILE_NAME.to_string(),
        }
    }
}

impl AppSettings {
    /// Reads `path`, or writes and returns the defaults if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if !path.exists() {
            let defaults = Self::default();
            let toml_string = toml::to_string_pretty(&defaults)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
            fs::write(path, toml_string).map_err(io_err)?;
            log::debug!("Created default settings at {}", path.display());
            Ok(defaults)
        } else {
            let content = fs::read_to_string(path).map_err(io_err)?;
            Ok(toml::from_str(&content)?)
        }
    }

    /// Directory under which every plugin's payload lives.
    pub fn payload_base(&self, config_dir: &Path) -> Result<PathBuf, SettingsError> {
        match &self.payload_dir {
            Some(template) => Ok(paths::expand_path_template(template)?),
            None => Ok(config_dir.join("payload")),
        }
    }

    /// The payload directory of `plugin_name`.
    pub fn payload_for(
        &self,
        config_dir: &Path,
        plugin_name: &str,
    ) -> Result<PayloadDirectory, SettingsError> {
        Ok(PayloadDirectory::new(
            self.payload_base(config_dir)?.join(plugin_name),
            &self.executable_subdir,
        ))
    }

    /// Generation settings for `plugin_name`.
    pub fn plugin_settings(&self, plugin_name: &str) -> PluginSettings {
        PluginSettings {
            plugin_name: plugin_name.to_string(),
            list_emission: self.list_emission,
            config_file_switch: self.config_file_switch.clone(),
            config_file_name: self.config_file_name.clone(),
        }
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_written_on_first_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        let settings = AppSettings::load_or_create(&path).unwrap();
        assert_eq!(settings, AppSettings::default());
        assert!(path.exists());
        assert_eq!(AppSettings::load_or_create(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            "list_emission = \"single-option\"\npayload_dir = \"/srv/payloads\"\n",
        )
        .unwrap();
        let settings = AppSettings::load_or_create(&path).unwrap();
        assert_eq!(settings.list_emission, ListEmission::SingleOption);
        assert_eq!(settings.executable_subdir, "bin");

        let payload = settings.payload_for(dir.path(), "blast").unwrap();
        assert_eq!(payload.path(), Path::new("/srv/payloads/blast"));
        assert_eq!(payload.executable_dir(), PathBuf::from("/srv/payloads/blast/bin"));

        let plugin = settings.plugin_settings("blast");
        assert_eq!(plugin.plugin_name, "blast");
        assert_eq!(plugin.list_emission, ListEmission::SingleOption);
        assert_eq!(plugin.config_file_switch, "-ini");
    }

    #[test]
    fn test_default_payload_base_is_under_config_dir() {
        let dir = TempDir::new().unwrap();
        let base = AppSettings::default().payload_base(dir.path()).unwrap();
        assert_eq!(base, dir.path().join("payload"));
    }
}
