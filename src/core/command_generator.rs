// src/core/command_generator.rs

//! # Command Generator
//!
//! Turns a [`NodeConfiguration`] plus the current values into the ordered argument list
//! handed to the process launcher. Two strategies are available and selected per tool:
//!
//! - [`GeneratorKind::Direct`]: walks the CLI mapping table and emits flags and values
//!   (see [`crate::core::direct_args`]).
//! - [`GeneratorKind::ConfigFile`]: writes the whole parameter tree to a file in the working
//!   directory and emits a single switch pointing at it (see [`crate::core::param_file`]).
//!
//! Generation never mutates the caller's tree: store values are applied to a private copy,
//! and nothing is returned unless the whole command could be built.

use crate::core::cli_mapping::CliMapping;
use crate::core::config_tree::{ConfigurationTree, KEY_SEPARATOR};
use crate::core::parameters::ValidationError;
use crate::core::{direct_args, param_file};
use crate::constants::{DEFAULT_CONFIG_FILE_NAME, DEFAULT_CONFIG_FILE_SWITCH};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures that abort command generation. Each carries the offending CLI element.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// A required element, or a required parameter, resolved to no value at all.
    #[error("required CLI element '{option}' has no value")]
    MissingRequiredValue {
        /// The element's option identifier or positional label, or the parameter key.
        option: String,
    },
    /// A mapping points at a key missing from the tree.
    #[error("CLI element '{option}' references unknown node '{reference}'")]
    UnresolvedReference {
        /// The element's option identifier or positional label.
        option: String,
        /// The unresolved key.
        reference: String,
    },
    /// The element's mappings cannot be emitted as declared.
    #[error("CLI element '{option}' has an inconsistent mapping: {reason}")]
    InconsistentMapping {
        /// The element's option identifier or positional label.
        option: String,
        /// What is inconsistent.
        reason: String,
    },
    /// A parameter holds a value that fails validation at generation time.
    #[error("CLI element '{option}' cannot use an invalid value: {source}")]
    InvalidValue {
        /// The element's option identifier, or the config-file switch.
        option: String,
        /// The violation.
        #[source]
        source: ValidationError,
    },
    /// The parameter file could not be serialized.
    #[error("parameters for '{option}' could not be serialized: {reason}")]
    Serialization {
        /// The config-file switch.
        option: String,
        /// The serializer's message.
        reason: String,
    },
}

/// Top-level error of [`CommandGenerator::generate`].
#[derive(Error, Debug)]
pub enum CommandError {
    /// A supplied value violates its parameter's declaration.
    #[error("Invalid parameter value: {0}")]
    Validation(#[from] ValidationError),
    /// The command could not be built.
    #[error("Command generation failed: {0}")]
    Generation(#[from] GenerationError),
    /// Writing into the working directory failed.
    #[error("I/O failure at '{}': {source}", .path.display())]
    Io {
        /// The path being written or resolved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// How list-valued CLI elements are emitted.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ListEmission {
    /// `-in a -in b -in c`
    #[default]
    RepeatOption,
    /// `-in a b c`
    SingleOption,
}

/// Which command-generation strategy a tool uses.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GeneratorKind {
    /// Flags and values straight from the CLI mapping table.
    #[default]
    Direct,
    /// A generated parameter file passed through a single switch.
    ConfigFile,
}

/// Plugin-wide settings consulted during generation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PluginSettings {
    /// The plugin's display name.
    pub plugin_name: String,
    /// How list elements are emitted by the direct strategy.
    pub list_emission: ListEmission,
    /// The switch emitted before the parameter file path.
    pub config_file_switch: String,
    /// The file name of the generated parameter file.
    pub config_file_name: String,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            plugin_name: "toolwrap".to_string(),
            list_emission: ListEmission::default(),
            config_file_switch: DEFAULT_CONFIG_FILE_SWITCH.to_string(),
            config_file_name: DEFAULT_CONFIG_FILE_NAME.to_string(),
        }
    }
}

/// The in-memory model of one tool: its parameter tree and CLI mapping table.
#[derive(Debug, Clone)]
pub struct NodeConfiguration {
    /// Tool name.
    pub name: String,
    /// Tool version, if declared.
    pub version: Option<String>,
    /// The parameter tree.
    pub tree: ConfigurationTree,
    /// The CLI mapping table.
    pub cli: CliMapping,
}

/// Current values supplied by the dialog layer: key to ordered raw values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueStore {
    values: BTreeMap<String, Vec<String>>,
}

impl ValueStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a single value for `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), vec![value.into()]);
    }

    /// Sets every value for `key`; used for list parameters.
    pub fn set_all(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.values.insert(key.into(), values);
    }

    /// Appends one more value for `key`.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    /// The values for `key`.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.values.get(key).map(Vec::as_slice)
    }

    /// Removes `key`.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.values.remove(key)
    }

    /// Iterates over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Whether the store holds nothing.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a copy of `tree` with every store value parsed, validated and applied.
    /// Keys may be given in full (`tool.group.param`) or relative to the root (`group.param`).
    pub fn apply_to(&self, tree: &ConfigurationTree) -> Result<ConfigurationTree, ValidationError> {
        let mut effective = tree.clone();
        for (key, raw) in &self.values {
            let full_key = resolve_key(tree, key).ok_or_else(|| ValidationError::UnknownKey {
                key: key.clone(),
            })?;
            let parameter = effective
                .parameter_mut(&full_key)
                .ok_or_else(|| ValidationError::UnknownKey { key: key.clone() })?;
            parameter
                .set_from_strings(raw)
                .map_err(|e| e.for_key(&full_key))?;
        }
        Ok(effective)
    }
}

fn resolve_key(tree: &ConfigurationTree, key: &str) -> Option<String> {
    if tree.find(key).is_some() {
        return Some(key.to_string());
    }
    let prefixed = format!("{}{}{}", tree.name(), KEY_SEPARATOR, key);
    tree.find(&prefixed).map(|_| prefixed)
}

/// The strategy-selecting command generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandGenerator {
    kind: GeneratorKind,
}

impl CommandGenerator {
    /// A generator using the given strategy.
    pub fn new(kind: GeneratorKind) -> Self {
        Self { kind }
    }

    /// The selected strategy.
    pub fn kind(&self) -> GeneratorKind {
        self.kind
    }

    /// Builds the ordered argument list for `config` with the current `store` values.
    ///
    /// The working directory must already exist and be writable when the config-file
    /// strategy is used; it is not created here.
    pub fn generate(
        &self,
        config: &NodeConfiguration,
        store: &ValueStore,
        settings: &PluginSettings,
        working_dir: &Path,
    ) -> Result<Vec<String>, CommandError> {
        let effective_tree = store.apply_to(&config.tree)?;
        for (key, parameter) in effective_tree.parameters() {
            parameter.validate().map_err(|e| e.for_key(key))?;
        }

        log::debug!(
            "Generating command for '{}' with the {:?} strategy",
            config.name,
            self.kind
        );

        // Both strategies honor the mapping table's required elements.
        config.cli.validate(&effective_tree)?;
        direct_args::check_required_elements(&effective_tree, &config.cli)?;
        if let Some((key, _)) = effective_tree
            .parameters()
            .into_iter()
            .find(|(_, p)| p.is_required() && !p.is_set())
        {
            return Err(GenerationError::MissingRequiredValue {
                option: key.to_string(),
            }
            .into());
        }

        match self.kind {
            GeneratorKind::Direct => {
                Ok(direct_args::generate_arguments(
                    &effective_tree,
                    &config.cli,
                    settings.list_emission,
                )?)
            }
            GeneratorKind::ConfigFile => {
                let file = param_file::write_param_file(
                    config,
                    &effective_tree,
                    settings,
                    working_dir,
                )?;
                Ok(vec![
                    settings.config_file_switch.clone(),
                    file.to_string_lossy().into_owned(),
                ])
            }
        }
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cli_mapping::CliElement;
    use crate::core::parameters::{Parameter, ParameterType};
    use tempfile::TempDir;

    /// Two required file flags, `-i` and `-d`, and nothing else.
    fn blastall() -> NodeConfiguration {
        let mut tree = ConfigurationTree::new("blastall");
        let root = tree.root();
        let file = || {
            Parameter::new(ParameterType::Path {
                extensions: Vec::new(),
            })
            .required(true)
        };
        tree.add_parameter(root, "i", file()).unwrap();
        tree.add_parameter(root, "d", file()).unwrap();
        let cli = [
            CliElement::new("-i").required(true).map("blastall.i"),
            CliElement::new("-d").required(true).map("blastall.d"),
        ]
        .into_iter()
        .collect();
        NodeConfiguration {
            name: "blastall".into(),
            version: Some("2.2.26".into()),
            tree,
            cli,
        }
    }

    fn store() -> ValueStore {
        let mut store = ValueStore::new();
        store.set("i", "in.txt");
        store.set("blastall.d", "db.fa");
        store
    }

    #[test]
    fn test_direct_end_to_end() {
        let dir = TempDir::new().unwrap();
        let tokens = CommandGenerator::new(GeneratorKind::Direct)
            .generate(&blastall(), &store(), &PluginSettings::default(), dir.path())
            .unwrap();
        assert_eq!(tokens, vec!["-i", "in.txt", "-d", "db.fa"]);
    }

    #[test]
    fn test_config_file_end_to_end() {
        let dir = TempDir::new().unwrap();
        let config = blastall();
        let tokens = CommandGenerator::new(GeneratorKind::ConfigFile)
            .generate(&config, &store(), &PluginSettings::default(), dir.path())
            .unwrap();

        let expected_path = dunce::canonicalize(dir.path()).unwrap().join("params.ini");
        assert_eq!(
            tokens,
            vec!["-ini".to_string(), expected_path.to_string_lossy().into_owned()]
        );
        let content = std::fs::read_to_string(&expected_path).unwrap();
        assert!(content.contains("in.txt"));
        assert!(content.contains("db.fa"));
    }

    #[test]
    fn test_generation_never_mutates_the_tree() {
        let dir = TempDir::new().unwrap();
        let config = blastall();
        CommandGenerator::default()
            .generate(&config, &store(), &PluginSettings::default(), dir.path())
            .unwrap();
        assert!(config.tree.parameter("blastall.i").unwrap().value().is_none());
    }

    #[test]
    fn test_missing_required_value_aborts() {
        let dir = TempDir::new().unwrap();
        let mut partial = ValueStore::new();
        partial.set("i", "in.txt");
        let err = CommandGenerator::default()
            .generate(&blastall(), &partial, &PluginSettings::default(), dir.path())
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Generation(GenerationError::MissingRequiredValue { ref option }) if option == "-d"
        ));
    }

    #[test]
    fn test_config_file_missing_required_value_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut partial = ValueStore::new();
        partial.set("i", "in.txt");
        let err = CommandGenerator::new(GeneratorKind::ConfigFile)
            .generate(&blastall(), &partial, &PluginSettings::default(), dir.path())
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Generation(GenerationError::MissingRequiredValue { ref option }) if option == "-d"
        ));
        assert!(!dir.path().join("params.ini").exists());
    }

    #[test]
    fn test_required_parameter_without_element_is_enforced() {
        let mut config = blastall();
        let root = config.tree.root();
        config
            .tree
            .add_parameter(root, "out", Parameter::new(ParameterType::String).required(true))
            .unwrap();
        let dir = TempDir::new().unwrap();
        for kind in [GeneratorKind::Direct, GeneratorKind::ConfigFile] {
            let err = CommandGenerator::new(kind)
                .generate(&config, &store(), &PluginSettings::default(), dir.path())
                .unwrap_err();
            assert!(matches!(
                err,
                CommandError::Generation(GenerationError::MissingRequiredValue { ref option })
                    if option == "blastall.out"
            ));
        }

        let mut complete = store();
        complete.set("out", "hits.txt");
        let tokens = CommandGenerator::new(GeneratorKind::Direct)
            .generate(&config, &complete, &PluginSettings::default(), dir.path())
            .unwrap();
        assert_eq!(tokens, vec!["-i", "in.txt", "-d", "db.fa"]);
    }

    #[test]
    fn test_unknown_store_key_is_validation_error() {
        let dir = TempDir::new().unwrap();
        let mut bad = store();
        bad.set("nope", "x");
        let err = CommandGenerator::default()
            .generate(&blastall(), &bad, &PluginSettings::default(), dir.path())
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Validation(ValidationError::UnknownKey { .. })
        ));
    }

    #[test]
    fn test_store_value_violating_type_is_rejected() {
        let mut config = blastall();
        let root = config.tree.root();
        config
            .tree
            .add_parameter(
                root,
                "e",
                Parameter::new(ParameterType::Float {
                    min: Some(0.0),
                    max: None,
                }),
            )
            .unwrap();
        let mut values = store();
        values.set("e", "-1");
        let dir = TempDir::new().unwrap();
        let err = CommandGenerator::default()
            .generate(&config, &values, &PluginSettings::default(), dir.path())
            .unwrap_err();
        assert!(err.to_string().contains("blastall.e"));
    }

    #[test]
    fn test_config_file_write_failure_is_io() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let err = CommandGenerator::new(GeneratorKind::ConfigFile)
            .generate(&blastall(), &store(), &PluginSettings::default(), &missing)
            .unwrap_err();
        assert!(matches!(err, CommandError::Io { .. }));
    }

    #[test]
    fn test_value_store_push_and_remove() {
        let mut s = ValueStore::new();
        s.push("k", "a");
        s.push("k", "b");
        assert_eq!(s.get("k"), Some(&["a".to_string(), "b".to_string()][..]));
        assert_eq!(s.iter().count(), 1);
        s.remove("k");
        assert!(s.is_empty());
    }
}
