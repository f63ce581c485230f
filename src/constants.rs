// src/constants.rs

//! File names and defaults shared across the crate.

/// The name of the application settings file (inside the toolwrap config directory).
pub const SETTINGS_FILENAME: &str = "settings.toml";

/// The name of the persisted tool-path registry (inside the toolwrap config directory).
pub const TOOL_REGISTRY_FILENAME: &str = "tools.toml";

/// Environment variable that overrides the toolwrap config directory.
pub const HOME_ENV_VAR: &str = "TOOLWRAP_HOME";

/// The fixed name of the platform payload archive inside a plugin bundle.
pub const PAYLOAD_ARCHIVE_FILENAME: &str = "binaries.zip";

/// The fixed name of the packaged environment file inside the payload.
pub const PAYLOAD_ENV_FILENAME: &str = "binaries.ini";

/// Stamp written after a successful extraction, recording which archive produced the payload.
pub const PAYLOAD_STAMP_FILENAME: &str = ".payload-stamp.toml";

/// Default subdirectory of the payload holding the executables.
pub const DEFAULT_EXECUTABLE_SUBDIR: &str = "bin";

/// Suffixes probed, in order, when resolving a tool's executable.
pub const EXECUTABLE_SUFFIXES: [&str; 3] = ["", ".bin", ".exe"];

/// Placeholder in packaged environment values that expands to the payload root.
pub const PAYLOAD_ROOT_PLACEHOLDER: &str = "$ROOT";

/// Default command-line switch used by the config-file generator.
pub const DEFAULT_CONFIG_FILE_SWITCH: &str = "-ini";

/// Default name of the parameter file written by the config-file generator.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "params.ini";
