// src/state.rs

use crate::core::tool_registry::{RegistryError, ToolRegistry};
use std::path::{Path, PathBuf};

/// Represents the state of the tool registry.
/// It holds the current registry and, once a mutation was requested, a snapshot of the
/// registry as it was loaded.
#[derive(Debug)]
enum RegistryState {
    /// No mutable access has been handed out yet.
    Pristine(ToolRegistry),
    /// Mutable access was requested. We hold both the loaded snapshot and the current state.
    Dirty {
        original: ToolRegistry,
        current: ToolRegistry,
    },
}

/// The persisted tool registry plus its journaling state.
#[derive(Debug)]
pub struct RegistryStore {
    path: PathBuf,
    state: RegistryState,
}

impl RegistryStore {
    /// Loads the registry persisted at `path` (empty if the file does not exist).
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let registry = ToolRegistry::load(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            state: RegistryState::Pristine(registry),
        })
    }

    /// Where the registry is persisted.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks if the registry needs to be written back by comparing the current state
    /// against the snapshot, if one exists.
    pub fn needs_saving(&self) -> bool {
        match &self.state {
            RegistryState::Pristine(_) => false,
            RegistryState::Dirty { original, current } => original != current,
        }
    }

    /// Read-only access to the current registry.
    pub fn registry(&self) -> &ToolRegistry {
        match &self.state {
            RegistryState::Pristine(registry) => registry,
            RegistryState::Dirty { current, .. } => current,
        }
    }

    /// Mutable access. The first call takes the snapshot used by [`Self::needs_saving`].
    pub fn registry_mut(&mut self) -> &mut ToolRegistry {
        if let RegistryState::Pristine(_) = self.state {
            let previous = std::mem::replace(
                &mut self.state,
                RegistryState::Pristine(ToolRegistry::default()),
            );
            if let RegistryState::Pristine(registry) = previous {
                self.state = RegistryState::Dirty {
                    original: registry.clone(),
                    current: registry,
                };
            }
        }

        match &mut self.state {
            RegistryState::Dirty { current, .. } => current,
            RegistryState::Pristine(registry) => registry,
        }
    }

    /// Writes the registry if it changed since it was loaded. Returns whether it wrote.
    pub fn save_if_needed(&mut self) -> Result<bool, RegistryError> {
        if !self.needs_saving() {
            log::debug!("Tool registry unchanged, not saving.");
            return Ok(false);
        }
        self.registry().save(&self.path)?;
        log::debug!("Saved tool registry to {}", self.path.display());
        if let RegistryState::Dirty { original, current } = &mut self.state {
            *original = current.clone();
        }
        Ok(true)
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tool_registry::{ExternalTool, ToolPathType};
    use tempfile::TempDir;

    #[test]
    fn test_untouched_store_is_not_saved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tools.toml");
        let mut store = RegistryStore::load(&path).unwrap();
        assert!(!store.needs_saving());
        assert!(!store.save_if_needed().unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_mutation_without_change_is_not_saved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tools.toml");
        let mut store = RegistryStore::load(&path).unwrap();
        let _ = store.registry_mut().configured_type("x");
        assert!(!store.needs_saving());
    }

    #[test]
    fn test_changes_are_persisted_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tools.toml");
        let mut store = RegistryStore::load(&path).unwrap();
        let registry = store.registry_mut();
        registry.register(&ExternalTool::new("blastall", "blastall"));
        registry
            .set_tool_path("blastall", "/usr/bin/blastall", ToolPathType::UserConfigured)
            .unwrap();

        assert!(store.needs_saving());
        assert!(store.save_if_needed().unwrap());
        assert!(!store.save_if_needed().unwrap());

        let reloaded = RegistryStore::load(&path).unwrap();
        assert_eq!(
            reloaded
                .registry()
                .tool_path("blastall", ToolPathType::UserConfigured),
            Some(Path::new("/usr/bin/blastall"))
        );
    }
}
