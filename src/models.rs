// src/models.rs

use crate::core::command_generator::{GeneratorKind, ListEmission};
use serde::{Deserialize, Serialize};

// --- TOOL DESCRIPTOR MODELS (FOR TOML) ---
// These are what a plugin author writes in a `<tool>.toml` descriptor.

/// The raw, deserialized form of a tool descriptor file.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DescriptorFile {
    pub tool: ToolSection,
    #[serde(default, rename = "group")]
    pub groups: Vec<GroupSpec>,
    #[serde(default, rename = "param")]
    pub params: Vec<ParamSpec>,
    #[serde(default)]
    pub cli: Vec<CliSpec>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ToolSection {
    /// Root node name; every key in the tree starts with it.
    pub name: String,
    pub version: Option<String>,
    /// Executable base name inside the payload. Defaults to `name`.
    pub executable: Option<String>,
    #[serde(default)]
    pub generator: GeneratorKind,
    pub description: Option<String>,
}

/// Optional metadata for a grouping node.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub key: String,
    pub description: Option<String>,
}

/// Declared type of a parameter, or of a list's elements.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    #[default]
    String,
    Int,
    Float,
    Bool,
    Path,
    Choice,
    List,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Dotted path below the root node. Missing groups are created.
    pub key: String,
    #[serde(rename = "type", default)]
    pub kind: ParamKind,
    /// Element type of a `list` parameter.
    pub element: Option<ParamKind>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub advanced: bool,
    pub default: Option<toml::Value>,
    #[serde(default)]
    pub choices: Vec<String>,
    /// Inclusive lower bound of a numeric parameter.
    pub min: Option<toml::Value>,
    /// Inclusive upper bound of a numeric parameter.
    pub max: Option<toml::Value>,
    #[serde(default)]
    pub extensions: Vec<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CliSpec {
    /// Option identifier; empty for a positional element.
    #[serde(default)]
    pub option: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub list: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub mapping: Vec<String>,
}

// --- APPLICATION SETTINGS (settings.toml) ---

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppSettings {
    /// Where payloads are extracted; `~` and environment variables are expanded.
    /// Each plugin gets its own subdirectory.
    pub payload_dir: Option<String>,
    pub executable_subdir: String,
    pub list_emission: ListEmission,
    pub config_file_switch: String,
    pub config_file_name: String,
}
