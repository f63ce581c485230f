// src/core/param_file.rs

//! Config-file generation: the current parameter tree is written as a TOML document into
//! the working directory, and the tool receives a single switch pointing at it.
//!
//! Layout of the generated file:
//!
//! ```toml
//! [tool]
//! name = "blastall"
//! version = "2.2.26"
//!
//! [parameters]
//! i = "in.txt"
//!
//! [parameters.group]
//! nested = 3
//! ```
//!
//! Grouping nodes become tables, set parameters become keys, unset parameters are omitted.

use crate::core::command_generator::{
    CommandError, GenerationError, NodeConfiguration, PluginSettings,
};
use crate::core::config_tree::{ConfigurationTree, NodeId};
use crate::core::parameters::Value;
use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value as TomlValue};

/// Writes the parameter file for `config` (with values taken from `tree`) into `working_dir`
/// and returns its canonical absolute path.
pub fn write_param_file(
    config: &NodeConfiguration,
    tree: &ConfigurationTree,
    settings: &PluginSettings,
    working_dir: &Path,
) -> Result<PathBuf, CommandError> {
    let content = render(config, tree, &settings.config_file_switch)?;
    let file_path = working_dir.join(&settings.config_file_name);

    fs::write(&file_path, content).map_err(|source| CommandError::Io {
        path: file_path.clone(),
        source,
    })?;
    let canonical = dunce::canonicalize(&file_path).map_err(|source| CommandError::Io {
        path: file_path.clone(),
        source,
    })?;
    log::debug!("Wrote parameter file {}", canonical.display());
    Ok(canonical)
}

/// Renders the parameter document. `switch` only labels errors.
pub fn render(
    config: &NodeConfiguration,
    tree: &ConfigurationTree,
    switch: &str,
) -> Result<String, GenerationError> {
    let mut tool = Table::new();
    tool.insert("name".to_string(), TomlValue::String(config.name.clone()));
    if let Some(version) = &config.version {
        tool.insert("version".to_string(), TomlValue::String(version.clone()));
    }

    let mut document = Table::new();
    document.insert("tool".to_string(), TomlValue::Table(tool));
    document.insert(
        "parameters".to_string(),
        TomlValue::Table(subtree_table(tree, tree.root(), switch)?),
    );

    let body = toml::to_string_pretty(&document).map_err(|e| GenerationError::Serialization {
        option: switch.to_string(),
        reason: e.to_string(),
    })?;
    Ok(format!(
        "# Parameters for {} generated by toolwrap.\n{}",
        config.name, body
    ))
}

fn subtree_table(
    tree: &ConfigurationTree,
    parent: NodeId,
    switch: &str,
) -> Result<Table, GenerationError> {
    let mut table = Table::new();
    for child in tree.all_children(parent) {
        let Some(node) = tree.node(*child) else {
            continue;
        };
        match node.parameter() {
            Some(parameter) => {
                parameter
                    .validate()
                    .map_err(|source| GenerationError::InvalidValue {
                        option: switch.to_string(),
                        source: source.for_key(node.key()),
                    })?;
                if let Some(value) = parameter.value().filter(|_| parameter.is_set()) {
                    table.insert(node.name().to_string(), to_toml(value));
                }
            }
            None => {
                let nested = subtree_table(tree, *child, switch)?;
                if !nested.is_empty() {
                    table.insert(node.name().to_string(), TomlValue::Table(nested));
                }
            }
        }
    }
    Ok(table)
}

fn to_toml(value: &Value) -> TomlValue {
    match value {
        Value::Str(s) | Value::Choice(s) => TomlValue::String(s.clone()),
        Value::Int(i) => TomlValue::Integer(*i),
        Value::Float(x) => TomlValue::Float(*x),
        Value::Bool(b) => TomlValue::Boolean(*b),
        Value::Path(p) => TomlValue::String(p.to_string_lossy().into_owned()),
        Value::List(items) => TomlValue::Array(
            items
                .iter()
                .filter(|v| !v.is_empty())
                .map(to_toml)
                .collect(),
        ),
    }
}

// MARK: --- UNIT TESTS ---
