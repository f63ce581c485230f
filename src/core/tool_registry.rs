// src/core/tool_registry.rs

//! Persistent record of where each external tool lives.
//!
//! A tool can have two candidate paths: the one shipped in the payload and one configured
//! by the user. Its *configured type* selects which candidate is used. Updates keep the
//! pair consistent: clearing the path the tool currently uses also resets its type, so a
//! tool never resolves to a path that has been removed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by registry updates and persistence.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No entry exists for the named tool.
    #[error("Tool '{0}' is not registered.")]
    UnknownTool(String),
    /// The requested type has no stored path.
    #[error("Tool '{name}' has no {ty} path to select.")]
    MissingPath {
        /// The tool.
        name: String,
        /// The type that was requested.
        ty: ToolPathType,
    },
    /// [`ToolPathType::Unknown`] has no path slot.
    #[error("A path cannot be stored for the '{0}' type.")]
    UntypedPath(ToolPathType),
    /// `tools.toml` could not be read or written.
    #[error("Could not read or write the tool registry at '{}': {source}", .path.display())]
    Io {
        /// The registry file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// `tools.toml` is not valid TOML for a registry.
    #[error("Failed to parse the tool registry: {0}")]
    Parse(#[from] toml::de::Error),
    /// The registry could not be rendered as TOML.
    #[error("Failed to serialize the tool registry: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Which candidate path a tool uses.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ToolPathType {
    /// No choice made yet.
    #[default]
    Unknown,
    /// The executable extracted from the payload.
    Shipped,
    /// A path entered by the user.
    UserConfigured,
}

impl std::fmt::Display for ToolPathType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::Shipped => "shipped",
            Self::UserConfigured => "user-configured",
        })
    }
}

/// A tool a plugin depends on.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExternalTool {
    /// Registry key.
    pub name: String,
    /// File name of the executable inside the payload, without platform suffix.
    pub executable: String,
}

impl ExternalTool {
    /// A tool registered as `name` whose payload executable is `executable`.
    pub fn new(name: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
        }
    }
}

/// The persisted state of one tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolEntry {
    /// Executable name probed inside the payload.
    pub executable: String,
    /// The candidate currently in use.
    #[serde(default)]
    pub mode: ToolPathType,
    /// Path of the executable extracted from the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipped: Option<PathBuf>,
    /// Path entered by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_configured: Option<PathBuf>,
}

impl ToolEntry {
    fn slot(&mut self, ty: ToolPathType) -> Option<&mut Option<PathBuf>> {
        match ty {
            ToolPathType::Unknown => None,
            ToolPathType::Shipped => Some(&mut self.shipped),
            ToolPathType::UserConfigured => Some(&mut self.user_configured),
        }
    }

    fn path(&self, ty: ToolPathType) -> Option<&Path> {
        match ty {
            ToolPathType::Unknown => None,
            ToolPathType::Shipped => self.shipped.as_deref(),
            ToolPathType::UserConfigured => self.user_configured.as_deref(),
        }
    }
}

/// All known tools, keyed by name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolRegistry {
    #[serde(default)]
    tools: BTreeMap<String, ToolEntry>,
}

impl ToolRegistry {
    /// Reads the registry from `path`. A missing file yields an empty registry.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Writes the registry to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        let io_err = |source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_err)
    }

    /// Adds `tool` if it is not known yet. Existing paths and types are kept.
    pub fn register(&mut self, tool: &ExternalTool) {
        let entry = self.tools.entry(tool.name.clone()).or_default();
        entry.executable = tool.executable.clone();
    }

    /// Drops `name` and both of its paths.
    pub fn remove(&mut self, name: &str) -> Option<ToolEntry> {
        self.tools.remove(name)
    }

    /// The entry of `name`, if registered.
    pub fn entry(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.get(name)
    }

    /// All entries in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ToolEntry)> {
        self.tools.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The stored `ty` path of `name`, whether or not it is the one in use.
    pub fn tool_path(&self, name: &str, ty: ToolPathType) -> Option<&Path> {
        self.tools.get(name).and_then(|e| e.path(ty))
    }

    /// Stores the `ty` path of a registered tool without changing its configured type.
    pub fn set_tool_path(
        &mut self,
        name: &str,
        path: impl Into<PathBuf>,
        ty: ToolPathType,
    ) -> Result<(), RegistryError> {
        let entry = self
            .tools
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))?;
        let slot = entry.slot(ty).ok_or(RegistryError::UntypedPath(ty))?;
        *slot = Some(path.into());
        Ok(())
    }

    /// Forgets the `ty` path of `name`. If the tool was using it, its type falls back to
    /// [`ToolPathType::Unknown`].
    pub fn clear_tool_path(&mut self, name: &str, ty: ToolPathType) {
        let Some(entry) = self.tools.get_mut(name) else {
            return;
        };
        if let Some(slot) = entry.slot(ty) {
            *slot = None;
        }
        if entry.mode == ty {
            entry.mode = ToolPathType::Unknown;
        }
    }

    /// The candidate `name` uses; [`ToolPathType::Unknown`] for unregistered tools.
    pub fn configured_type(&self, name: &str) -> ToolPathType {
        self.tools.get(name).map(|e| e.mode).unwrap_or_default()
    }

    /// Selects which candidate `name` uses. Selecting a type without a stored path fails.
    pub fn update_tool_path_type(
        &mut self,
        name: &str,
        ty: ToolPathType,
    ) -> Result<(), RegistryError> {
        let entry = self
            .tools
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))?;
        if ty != ToolPathType::Unknown && entry.path(ty).is_none() {
            return Err(RegistryError::MissingPath {
                name: name.to_string(),
                ty,
            });
        }
        entry.mode = ty;
        Ok(())
    }

    /// The path `name` should be launched from, according to its configured type.
    pub fn resolve(&self, name: &str) -> Option<&Path> {
        let entry = self.tools.get(name)?;
        entry.path(entry.mode)
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry_with_blast() -> ToolRegistry {
        let mut registry = ToolRegistry::default();
        registry.register(&ExternalTool::new("blastall", "blastall"));
        registry
    }

    #[test]
    fn test_new_tool_is_unknown_and_unresolved() {
        let registry = registry_with_blast();
        assert_eq!(registry.configured_type("blastall"), ToolPathType::Unknown);
        assert_eq!(registry.configured_type("missing"), ToolPathType::Unknown);
        assert!(registry.resolve("blastall").is_none());
    }

    #[test]
    fn test_set_and_select_paths() {
        let mut registry = registry_with_blast();
        registry
            .set_tool_path("blastall", "/payload/bin/blastall", ToolPathType::Shipped)
            .unwrap();
        registry
            .set_tool_path("blastall", "/usr/bin/blastall", ToolPathType::UserConfigured)
            .unwrap();
        assert!(registry.resolve("blastall").is_none());

        registry
            .update_tool_path_type("blastall", ToolPathType::UserConfigured)
            .unwrap();
        assert_eq!(
            registry.resolve("blastall"),
            Some(Path::new("/usr/bin/blastall"))
        );
        assert_eq!(
            registry.tool_path("blastall", ToolPathType::Shipped),
            Some(Path::new("/payload/bin/blastall"))
        );
    }

    #[test]
    fn test_selecting_type_without_path_fails() {
        let mut registry = registry_with_blast();
        assert!(matches!(
            registry.update_tool_path_type("blastall", ToolPathType::Shipped),
            Err(RegistryError::MissingPath { .. })
        ));
        assert!(matches!(
            registry.set_tool_path("blastall", "/x", ToolPathType::Unknown),
            Err(RegistryError::UntypedPath(_))
        ));
        assert!(matches!(
            registry.set_tool_path("nope", "/x", ToolPathType::Shipped),
            Err(RegistryError::UnknownTool(_))
        ));
    }

    #[test]
    fn test_clearing_active_path_resets_type() {
        let mut registry = registry_with_blast();
        registry
            .set_tool_path("blastall", "/payload/bin/blastall", ToolPathType::Shipped)
            .unwrap();
        registry
            .update_tool_path_type("blastall", ToolPathType::Shipped)
            .unwrap();

        registry.clear_tool_path("blastall", ToolPathType::Shipped);
        assert_eq!(registry.configured_type("blastall"), ToolPathType::Unknown);
        assert!(registry.resolve("blastall").is_none());
    }

    #[test]
    fn test_clearing_other_path_keeps_type() {
        let mut registry = registry_with_blast();
        registry
            .set_tool_path("blastall", "/usr/bin/blastall", ToolPathType::UserConfigured)
            .unwrap();
        registry
            .set_tool_path("blastall", "/payload/bin/blastall", ToolPathType::Shipped)
            .unwrap();
        registry
            .update_tool_path_type("blastall", ToolPathType::UserConfigured)
            .unwrap();

        registry.clear_tool_path("blastall", ToolPathType::Shipped);
        assert_eq!(
            registry.configured_type("blastall"),
            ToolPathType::UserConfigured
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tools.toml");
        assert_eq!(ToolRegistry::load(&path).unwrap(), ToolRegistry::default());

        let mut registry = registry_with_blast();
        registry
            .set_tool_path("blastall", "/payload/bin/blastall", ToolPathType::Shipped)
            .unwrap();
        registry
            .update_tool_path_type("blastall", ToolPathType::Shipped)
            .unwrap();
        registry.save(&path).unwrap();

        assert_eq!(ToolRegistry::load(&path).unwrap(), registry);
    }
}
