// src/core/binaries_manager.rs

//! Lifecycle of the binaries shipped with a plugin.
//!
//! The manager owns one payload directory and knows the tools whose executables the payload
//! should provide. It validates the payload against the tool registry, (re-)extracts the
//! bundled archive, and registers the extracted executables:
//!
//! ```text
//! Validating --valid--> register --> Registered
//!     |
//!   invalid --> Extracting --> register --> Validating --> Registered | Invalid
//! no archive --> NoPayload
//! ```

use crate::constants::EXECUTABLE_SUFFIXES;
use crate::core::archive;
use crate::core::environment::PackagedEnvironment;
use crate::core::payload::{PayloadArchive, PayloadDirectory, PayloadError, PayloadStamp};
use crate::core::progress::ProgressMonitor;
use crate::core::tool_registry::{ExternalTool, ToolPathType, ToolRegistry};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where a manager stands in the payload lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadState {
    /// Nothing is bundled for this platform; tools must be configured by hand.
    NoPayload,
    /// The archive is being decompressed into a freshly wiped payload.
    Extracting,
    /// The payload is being checked against the registry.
    Validating,
    /// Every tool resolves to an executable inside the payload.
    Registered,
    /// Re-extraction did not produce a valid payload.
    Invalid,
}

/// What an extraction did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// No archive is bundled; nothing was written.
    NoArchive,
    /// The archive was decompressed.
    Extracted { entries: usize },
}

/// Which tools `register` could bind to a shipped executable.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Tools now holding a shipped path, in tool order.
    pub registered: Vec<String>,
    /// Tools with no executable in the payload.
    pub missing: Vec<String>,
}

/// Extracts, validates and registers the shipped binaries of one plugin.
pub struct BinariesManager {
    plugin_name: String,
    payload: PayloadDirectory,
    archive: Option<PayloadArchive>,
    tools: Vec<ExternalTool>,
    environment: PackagedEnvironment,
    state: PayloadState,
}

impl BinariesManager {
    /// A manager for `plugin_name`. Without an archive it starts in [`PayloadState::NoPayload`].
    pub fn new(
        plugin_name: impl Into<String>,
        payload: PayloadDirectory,
        archive: Option<PayloadArchive>,
        tools: Vec<ExternalTool>,
    ) -> Self {
        let state = if archive.is_some() {
            PayloadState::Validating
        } else {
            PayloadState::NoPayload
        };
        Self {
            plugin_name: plugin_name.into(),
            payload,
            archive,
            tools,
            environment: PackagedEnvironment::default(),
            state,
        }
    }

    /// The state reached by the last operation.
    pub fn state(&self) -> PayloadState {
        self.state
    }

    /// The payload directory this manager owns.
    pub fn payload(&self) -> &PayloadDirectory {
        &self.payload
    }

    /// The tools the payload is expected to provide.
    pub fn tools(&self) -> &[ExternalTool] {
        &self.tools
    }

    /// Variables to inject into launched tools.
    pub fn environment(&self) -> &PackagedEnvironment {
        &self.environment
    }

    /// Whether an archive is bundled for this platform.
    pub fn has_payload(&self) -> bool {
        self.archive.is_some()
    }

    /// Checks that every tool's shipped path exists inside the payload root.
    ///
    /// Tools failing the check lose their shipped path, and a tool that was using it falls
    /// back to [`ToolPathType::Unknown`]. Any fault during the scan counts as invalid.
    pub fn has_valid_payload(&self, registry: &mut ToolRegistry) -> bool {
        match self.scan_payload(registry) {
            Ok(valid) => valid,
            Err(e) => {
                log::warn!(
                    "Could not validate the payload of {}: {}",
                    self.plugin_name,
                    e
                );
                false
            }
        }
    }

    fn scan_payload(&self, registry: &mut ToolRegistry) -> Result<bool, PayloadError> {
        if self.payload.is_empty() {
            log::debug!("Payload directory {} is empty", self.payload.path().display());
            return Ok(false);
        }
        let root = dunce::canonicalize(self.payload.path())
            .map_err(|e| PayloadError::io(self.payload.path(), e))?;

        let mut all_valid = true;
        for tool in &self.tools {
            registry.register(tool);
            let valid = match registry.tool_path(&tool.name, ToolPathType::Shipped) {
                Some(path) if path.exists() => dunce::canonicalize(path)
                    .map_err(|e| PayloadError::io(path, e))?
                    .starts_with(&root),
                _ => false,
            };
            if !valid {
                log::info!(
                    "Shipped executable of '{}' is missing or outside {}",
                    tool.name,
                    root.display()
                );
                registry.clear_tool_path(&tool.name, ToolPathType::Shipped);
                all_valid = false;
            }
        }
        Ok(all_valid)
    }

    /// Whether the bundled archive differs from the one the payload was extracted from.
    pub fn is_stale(&self) -> bool {
        let Some(archive) = &self.archive else {
            return false;
        };
        let Some(stamp) = PayloadStamp::read(&self.payload) else {
            return true;
        };
        match archive.content_hash() {
            Ok(hash) => hash != stamp.archive_hash,
            Err(e) => {
                log::warn!("Could not hash {}: {}", archive.path().display(), e);
                true
            }
        }
    }

    /// Deletes the payload directory and forgets the packaged environment.
    ///
    /// The shipped path of every tool is cleared first, so a tool using it falls back to
    /// [`ToolPathType::Unknown`] instead of pointing into a deleted directory.
    pub fn clean_payload(&mut self, registry: &mut ToolRegistry) -> Result<(), PayloadError> {
        for tool in &self.tools {
            registry.clear_tool_path(&tool.name, ToolPathType::Shipped);
        }
        self.environment.clear();
        self.payload.clean()
    }

    /// Wipes the payload, decompresses the bundled archive into it and marks every file in
    /// the executable directory as executable. Without an archive only the wipe happens.
    ///
    /// A failed or cancelled extraction leaves no payload directory behind, and no tool
    /// keeps a shipped path until [`Self::register`] runs again.
    pub fn extract_binaries(
        &mut self,
        registry: &mut ToolRegistry,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<ExtractionOutcome, PayloadError> {
        self.clean_payload(registry)?;
        let Some(archive) = self.archive.clone() else {
            log::debug!("No payload bundled for {}", self.plugin_name);
            return Ok(ExtractionOutcome::NoArchive);
        };
        self.state = PayloadState::Extracting;
        log::info!(
            "Extracting binaries for {} from {}",
            self.plugin_name,
            archive.path().display()
        );

        let cleanup = scopeguard::guard(self.payload.clone(), |payload| {
            log::warn!("Removing incomplete payload at {}", payload.path().display());
            if let Err(e) = payload.clean() {
                log::error!("{}", e);
            }
        });

        self.payload.ensure_exists()?;
        monitor.begin_task(
            &format!("Checking shipped binaries for {}", self.plugin_name),
            None,
        );
        let total = archive::count_entries(archive.path())?;
        monitor.done();

        monitor.begin_task(
            &format!("Extracting shipped binaries for {}", self.plugin_name),
            Some(u64::try_from(total).unwrap_or(u64::MAX)),
        );
        let entries = archive::decompress_to(archive.path(), self.payload.path(), monitor)?;
        monitor.done();

        make_tree_executable(&self.payload.executable_dir())?;
        PayloadStamp {
            archive_hash: archive.content_hash()?,
            entries,
        }
        .write(&self.payload)?;

        scopeguard::ScopeGuard::into_inner(cleanup);
        log::info!("Extracted {} entries for {}", entries, self.plugin_name);
        Ok(ExtractionOutcome::Extracted { entries })
    }

    /// Finds `executable` in the executable directory, trying each platform suffix in turn.
    pub fn resolve_executable(&self, executable: &str) -> Option<PathBuf> {
        let dir = self.payload.executable_dir();
        EXECUTABLE_SUFFIXES
            .iter()
            .map(|suffix| dir.join(format!("{executable}{suffix}")))
            .find(|candidate| candidate.exists())
    }

    /// Loads the packaged environment and records the shipped path of every tool found in
    /// the payload. A tool switches to the shipped path only if it had no configured type.
    pub fn register(
        &mut self,
        registry: &mut ToolRegistry,
    ) -> Result<RegistrationReport, PayloadError> {
        let env_file = self.payload.env_file();
        if !env_file.is_file() {
            return Err(PayloadError::MissingResource { path: env_file });
        }
        let root = dunce::canonicalize(self.payload.path())
            .map_err(|e| PayloadError::io(self.payload.path(), e))?;
        self.environment.load(&env_file, &root)?;

        let mut report = RegistrationReport::default();
        for tool in &self.tools {
            registry.register(tool);
            let Some(executable) = self.resolve_executable(&tool.executable) else {
                log::warn!(
                    "Did not find any binaries of '{}' for your platform.",
                    tool.name
                );
                registry.clear_tool_path(&tool.name, ToolPathType::Shipped);
                report.missing.push(tool.name.clone());
                continue;
            };
            if let Err(e) = make_executable(&executable) {
                log::warn!("{}", e);
            }
            registry.set_tool_path(&tool.name, &executable, ToolPathType::Shipped)?;
            if registry.configured_type(&tool.name) == ToolPathType::Unknown {
                registry.update_tool_path_type(&tool.name, ToolPathType::Shipped)?;
            }
            log::debug!("Registered {} -> {}", tool.name, executable.display());
            report.registered.push(tool.name.clone());
        }
        Ok(report)
    }

    /// Brings the payload to a usable state, re-extracting at most once.
    ///
    /// Failures are logged and end in [`PayloadState::Invalid`] rather than an error, so
    /// that tools stay usable with manually configured paths.
    pub fn ensure(
        &mut self,
        registry: &mut ToolRegistry,
        monitor: &mut dyn ProgressMonitor,
    ) -> PayloadState {
        if self.archive.is_none() {
            log::warn!("Did not find any binaries for your platform.");
            self.state = PayloadState::NoPayload;
            return self.state;
        }

        self.state = PayloadState::Validating;
        if !self.is_stale() && self.has_valid_payload(registry) {
            match self.register(registry) {
                Ok(_) => {
                    self.state = PayloadState::Registered;
                    return self.state;
                }
                Err(e) => log::warn!("Existing payload could not be registered: {}", e),
            }
        }

        self.state = PayloadState::Invalid;
        self.reextract(registry, monitor)
    }

    /// Unconditionally wipes and re-extracts the payload, then validates it.
    pub fn reextract(
        &mut self,
        registry: &mut ToolRegistry,
        monitor: &mut dyn ProgressMonitor,
    ) -> PayloadState {
        match self.extract_binaries(registry, monitor) {
            Ok(ExtractionOutcome::NoArchive) => {
                self.state = PayloadState::NoPayload;
                return self.state;
            }
            Ok(ExtractionOutcome::Extracted { .. }) => {}
            // The shipped paths were cleared before the wipe.
            Err(e) => {
                log::error!("Extraction failed, assuming no payload: {}", e);
                self.state = PayloadState::Invalid;
                return self.state;
            }
        }
        if let Err(e) = self.register(registry) {
            log::error!("{}", e);
        }

        self.state = PayloadState::Validating;
        self.state = if self.has_valid_payload(registry) {
            PayloadState::Registered
        } else {
            PayloadState::Invalid
        };
        self.state
    }
}

fn make_tree_executable(dir: &Path) -> Result<(), PayloadError> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            PayloadError::io(&path, e.into())
        })?;
        if entry.file_type().is_file() {
            make_executable(entry.path())?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), PayloadError> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = fs::metadata(path).map_err(|e| PayloadError::io(path, e))?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions).map_err(|e| PayloadError::io(path, e))
}

#[cfg(not(unix))]
fn make_executable(path: &Path) -> Result<(), PayloadError> {
    fs::metadata(path)
        .map(|_| ())
        .map_err(|e| PayloadError::io(path, e))
}

// MARK: --- UNIT TESTS ---
