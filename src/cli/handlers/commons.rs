// src/cli/handlers/commons.rs

// This module contains shared functions used by multiple handlers.

use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use crate::{
    CancellationToken,
    core::{
        binaries_manager::BinariesManager,
        command_generator::ValueStore,
        descriptor::ToolDescriptor,
        paths,
        payload::PayloadArchive,
        tool_registry::ExternalTool,
    },
    models::AppSettings,
    state::RegistryStore,
};

/// Everything a handler needs from the toolwrap configuration directory.
#[derive(Debug)]
pub struct AppContext {
    pub config_dir: PathBuf,
    pub settings: AppSettings,
    pub registry: RegistryStore,
}

impl AppContext {
    /// Loads settings (creating defaults) and the persisted tool registry.
    pub fn load() -> Result<Self> {
        let config_dir = paths::get_config_dir()?;
        let settings_path = paths::get_settings_path()?;
        let settings = AppSettings::load_or_create(&settings_path)
            .with_context(|| format!("Failed to load {}", settings_path.display()))?;
        let registry_path = paths::get_tool_registry_path()?;
        let registry = RegistryStore::load(&registry_path)
            .with_context(|| format!("Failed to load {}", registry_path.display()))?;
        Ok(Self {
            config_dir,
            settings,
            registry,
        })
    }

    /// Writes the registry back if a handler changed it.
    pub fn persist(&mut self) -> Result<()> {
        self.registry
            .save_if_needed()
            .context("Failed to save the tool registry")?;
        Ok(())
    }

    /// Builds the binaries manager of `plugin_name` for a bundle directory.
    pub fn binaries_manager(
        &self,
        plugin_name: &str,
        bundle_dir: &Path,
        tools: Vec<ExternalTool>,
    ) -> Result<BinariesManager> {
        let payload = self
            .settings
            .payload_for(&self.config_dir, plugin_name)?;
        Ok(BinariesManager::new(
            plugin_name,
            payload,
            PayloadArchive::locate(bundle_dir),
            tools,
        ))
    }
}

pub fn load_descriptor(path: &Path) -> Result<ToolDescriptor> {
    ToolDescriptor::load(path)
        .with_context(|| format!("Could not load tool descriptor '{}'", path.display()))
}

/// Parses a `key=value` assignment given on the command line.
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

/// Collects assignments into a store. Repeating a key appends to its values.
pub fn build_store(assignments: &[(String, String)]) -> ValueStore {
    let mut store = ValueStore::new();
    for (key, value) in assignments {
        store.push(key.clone(), value.clone());
    }
    store
}

/// The plugin name: explicit, else the bundle directory's name, else the fallback.
pub fn plugin_name(explicit: Option<&str>, bundle_dir: Option<&Path>, fallback: &str) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| {
            bundle_dir
                .and_then(|d| dunce::canonicalize(d).ok())
                .and_then(|d| d.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| fallback.to_string())
}

/// Resolves the working directory, defaulting to the current directory.
pub fn working_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    let dir = match explicit {
        Some(dir) => dir,
        None => std::env::current_dir().context("Could not determine the current directory")?,
    };
    if !dir.is_dir() {
        return Err(anyhow!(
            "Working directory '{}' does not exist.",
            dir.display()
        ));
    }
    Ok(dir)
}

pub fn check_for_cancellation(token: &CancellationToken) -> Result<()> {
    if token.load(Ordering::SeqCst) {
        return Err(anyhow!("Operation cancelled by the user."));
    }
    Ok(())
}

// MARK: --- UNIT TESTS ---
