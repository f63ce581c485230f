// src/core/descriptor.rs

//! Tool descriptors: the TOML files that declare a tool's parameters and how they map onto
//! its command line.
//!
//! ```toml
//! [tool]
//! name = "blastall"
//! executable = "blastall"
//! generator = "direct"
//!
//! [[param]]
//! key = "i"
//! type = "path"
//! required = true
//!
//! [[cli]]
//! option = "-i"
//! required = true
//! mapping = ["blastall.i"]
//! ```
//!
//! Parameter keys are relative to the root node. Mapping references may be written either
//! as full keys (`blastall.i`) or relative to the root (`i`).

use crate::core::cli_mapping::{CliElement, CliMapping};
use crate::core::command_generator::{GenerationError, GeneratorKind, NodeConfiguration};
use crate::core::config_tree::{ConfigurationTree, KEY_SEPARATOR, TreeError};
use crate::core::parameters::{Parameter, ParameterType, ValidationError};
use crate::core::tool_registry::ExternalTool;
use crate::models::{CliSpec, DescriptorFile, ParamKind, ParamSpec};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Could not read descriptor '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse descriptor '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid parameter '{key}': {reason}")]
    InvalidParameter { key: String, reason: String },
    #[error("Invalid default for '{key}': {source}")]
    InvalidDefault {
        key: String,
        #[source]
        source: ValidationError,
    },
    #[error("CLI element '{option}' refers to unknown parameter '{reference}'.")]
    UnresolvedReference { option: String, reference: String },
    #[error("Invalid CLI mapping: {0}")]
    InvalidMapping(GenerationError),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// A loaded descriptor: the tool identity, its generation strategy and its model.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub tool: ExternalTool,
    pub generator: GeneratorKind,
    pub config: NodeConfiguration,
}

impl ToolDescriptor {
    /// Reads and builds the descriptor at `path`.
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let content = fs::read_to_string(path).map_err(|source| DescriptorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Builds a descriptor from TOML text. `origin` only labels errors.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, DescriptorError> {
        let file: DescriptorFile =
            toml::from_str(content).map_err(|source| DescriptorError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
        Self::from_file(file)
    }

    /// Builds the in-memory model from a deserialized descriptor.
    pub fn from_file(file: DescriptorFile) -> Result<Self, DescriptorError> {
        let name = file.tool.name.clone();
        let mut tree = ConfigurationTree::new(&name);
        if let Some(description) = &file.tool.description {
            tree.set_description(tree.root(), description)?;
        }

        for group in &file.groups {
            let id = tree.ensure_group(&group.key)?;
            if let Some(description) = &group.description {
                tree.set_description(id, description)?;
            }
        }
        for spec in &file.params {
            add_parameter(&mut tree, spec)?;
        }

        let cli = file
            .cli
            .iter()
            .map(|spec| build_element(&tree, spec))
            .collect::<CliMapping>();
        cli.validate(&tree).map_err(|e| match e {
            GenerationError::UnresolvedReference { option, reference } => {
                DescriptorError::UnresolvedReference { option, reference }
            }
            other => DescriptorError::InvalidMapping(other),
        })?;

        log::debug!(
            "Loaded descriptor for '{}': {} nodes, {} CLI elements",
            name,
            tree.len(),
            cli.len()
        );
        let executable = file.tool.executable.unwrap_or_else(|| name.clone());
        Ok(Self {
            tool: ExternalTool::new(&name, executable),
            generator: file.tool.generator,
            config: NodeConfiguration {
                name,
                version: file.tool.version,
                tree,
                cli,
            },
        })
    }
}

fn add_parameter(tree: &mut ConfigurationTree, spec: &ParamSpec) -> Result<(), DescriptorError> {
    let (group_path, leaf) = match spec.key.rsplit_once(KEY_SEPARATOR) {
        Some((group, leaf)) => (group, leaf),
        None => ("", spec.key.as_str()),
    };
    let ty = parameter_type(spec)?;

    let mut parameter = Parameter::new(ty)
        .required(spec.required)
        .advanced(spec.advanced);
    if let Some(description) = &spec.description {
        parameter = parameter.described(description.clone());
    }
    if let Some(default) = &spec.default {
        let raw = raw_strings(default);
        let invalid = |source| DescriptorError::InvalidDefault {
            key: spec.key.clone(),
            source,
        };
        if let Some(value) = parameter.ty().parse_all(&raw).map_err(invalid)? {
            parameter = parameter.with_default(value).map_err(invalid)?;
        }
    }

    let parent = tree.ensure_group(group_path)?;
    tree.add_parameter(parent, leaf, parameter)?;
    Ok(())
}

fn parameter_type(spec: &ParamSpec) -> Result<ParameterType, DescriptorError> {
    match spec.kind {
        ParamKind::List => {
            let element = spec.element.unwrap_or_default();
            if element == ParamKind::List {
                return Err(DescriptorError::InvalidParameter {
                    key: spec.key.clone(),
                    reason: "lists of lists are not supported".to_string(),
                });
            }
            Ok(ParameterType::List(Box::new(scalar_type(element, spec)?)))
        }
        kind => scalar_type(kind, spec),
    }
}

fn scalar_type(kind: ParamKind, spec: &ParamSpec) -> Result<ParameterType, DescriptorError> {
    Ok(match kind {
        ParamKind::String => ParameterType::String,
        ParamKind::Bool => ParameterType::Bool,
        ParamKind::Int => ParameterType::Int {
            min: int_bound(spec, spec.min.as_ref())?,
            max: int_bound(spec, spec.max.as_ref())?,
        },
        ParamKind::Float => ParameterType::Float {
            min: float_bound(spec, spec.min.as_ref())?,
            max: float_bound(spec, spec.max.as_ref())?,
        },
        ParamKind::Path => ParameterType::Path {
            extensions: spec.extensions.clone(),
        },
        ParamKind::Choice => {
            if spec.choices.is_empty() {
                return Err(DescriptorError::InvalidParameter {
                    key: spec.key.clone(),
                    reason: "a choice parameter needs at least one choice".to_string(),
                });
            }
            ParameterType::Choice {
                choices: spec.choices.clone(),
            }
        }
        ParamKind::List => {
            return Err(DescriptorError::InvalidParameter {
                key: spec.key.clone(),
                reason: "unexpected nested list".to_string(),
            });
        }
    })
}

fn int_bound(spec: &ParamSpec, bound: Option<&toml::Value>) -> Result<Option<i64>, DescriptorError> {
    match bound {
        None => Ok(None),
        Some(toml::Value::Integer(i)) => Ok(Some(*i)),
        Some(other) => Err(DescriptorError::InvalidParameter {
            key: spec.key.clone(),
            reason: format!("integer bound expected, found '{other}'"),
        }),
    }
}

fn float_bound(
    spec: &ParamSpec,
    bound: Option<&toml::Value>,
) -> Result<Option<f64>, DescriptorError> {
    match bound {
        None => Ok(None),
        Some(toml::Value::Float(f)) => Ok(Some(*f)),
        Some(toml::Value::Integer(i)) => Ok(Some(*i as f64)),
        Some(other) => Err(DescriptorError::InvalidParameter {
            key: spec.key.clone(),
            reason: format!("numeric bound expected, found '{other}'"),
        }),
    }
}

/// Flattens a TOML default into the raw strings the parameter parser accepts.
fn raw_strings(value: &toml::Value) -> Vec<String> {
    match value {
        toml::Value::String(s) => vec![s.clone()],
        toml::Value::Array(items) => items.iter().flat_map(raw_strings).collect(),
        other => vec![other.to_string()],
    }
}

fn build_element(tree: &ConfigurationTree, spec: &CliSpec) -> CliElement {
    let mut element = if spec.option.is_empty() {
        CliElement::positional()
    } else {
        CliElement::new(&spec.option)
    };
    if !spec.name.is_empty() {
        element = element.named(&spec.name);
    }
    element = element.list(spec.list).required(spec.required);
    for reference in &spec.mapping {
        element = element.map(qualify(tree, reference));
    }
    element
}

/// Accepts root-relative references by prefixing the root name when that resolves.
fn qualify(tree: &ConfigurationTree, reference: &str) -> String {
    if tree.find(reference).is_some() {
        return reference.to_string();
    }
    let full = format!("{}{}{}", tree.name(), KEY_SEPARATOR, reference);
    if tree.find(&full).is_some() {
        full
    } else {
        reference.to_string()
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command_generator::{CommandGenerator, PluginSettings, ValueStore};
    use crate::core::parameters::Value;
    use tempfile::TempDir;

    const BLAST: &str = r#"
[tool]
name = "blastall"
version = "2.2.26"
generator = "direct"

[[group]]
key = "scoring"
description = "Scoring options"

[[param]]
key = "i"
type = "path"
required = true
extensions = ["fa", "fasta", "txt"]

[[param]]
key = "d"
type = "string"
default = "nr"

[[param]]
key = "scoring.e"
type = "float"
default = 10.0
min = 0
advanced = true

[[param]]
key = "scoring.matrix"
type = "choice"
choices = ["BLOSUM62", "PAM30"]
default = "BLOSUM62"

[[param]]
key = "threads"
type = "int"
min = 1
max = 64
advanced = true

[[cli]]
option = "-i"
required = true
mapping = ["blastall.i"]

[[cli]]
option = "-d"
mapping = ["d"]

[[cli]]
option = "-e"
mapping = ["scoring.e"]

[[cli]]
option = "-a"
mapping = ["threads"]
"#;

    #[test]
    fn test_loads_tree_and_mapping() {
        let descriptor = ToolDescriptor::parse(BLAST, Path::new("blastall.toml")).unwrap();
        assert_eq!(descriptor.tool, ExternalTool::new("blastall", "blastall"));
        assert_eq!(descriptor.generator, GeneratorKind::Direct);

        let tree = &descriptor.config.tree;
        assert_eq!(
            tree.parameter("blastall.d").and_then(Parameter::value),
            Some(&Value::Str("nr".into()))
        );
        assert_eq!(
            tree.parameter("blastall.scoring.e").and_then(Parameter::value),
            Some(&Value::Float(10.0))
        );
        let scoring = tree.find("blastall.scoring").unwrap();
        assert_eq!(
            tree.node(scoring).and_then(|n| n.description()),
            Some("Scoring options")
        );
        // Root-relative references were qualified.
        let references: Vec<&str> = descriptor
            .config
            .cli
            .elements()
            .iter()
            .flat_map(|e| e.mappings().iter().map(|m| m.reference.as_str()))
            .collect();
        assert_eq!(
            references,
            vec!["blastall.i", "blastall.d", "blastall.scoring.e", "blastall.threads"]
        );
    }

    #[test]
    fn test_basic_view_hides_advanced_parameters() {
        let descriptor = ToolDescriptor::parse(BLAST, Path::new("blastall.toml")).unwrap();
        let tree = &descriptor.config.tree;
        let basic: Vec<&str> = tree
            .basic_children(tree.root())
            .iter()
            .filter_map(|id| tree.node(*id).map(|n| n.name()))
            .collect();
        assert_eq!(basic, vec!["scoring", "i", "d"]);
        assert_eq!(tree.count(tree.root(), true), 4);
    }

    #[test]
    fn test_generates_blast_command() {
        let dir = TempDir::new().unwrap();
        let descriptor = ToolDescriptor::parse(BLAST, Path::new("blastall.toml")).unwrap();
        let mut store = ValueStore::new();
        store.set("i", "in.txt");
        store.set("blastall.threads", "4");
        let tokens = CommandGenerator::new(descriptor.generator)
            .generate(
                &descriptor.config,
                &store,
                &PluginSettings::default(),
                dir.path(),
            )
            .unwrap();
        assert_eq!(
            tokens,
            vec!["-i", "in.txt", "-d", "nr", "-e", "10", "-a", "4"]
        );
    }

    #[test]
    fn test_unresolved_reference_is_rejected() {
        let text = r#"
[tool]
name = "t"

[[param]]
key = "a"

[[cli]]
option = "-b"
mapping = ["t.b"]
"#;
        let err = ToolDescriptor::parse(text, Path::new("t.toml")).unwrap_err();
        assert!(matches!(
            err,
            DescriptorError::UnresolvedReference { ref option, ref reference }
                if option == "-b" && reference == "t.b"
        ));
    }

    #[test]
    fn test_invalid_default_is_rejected() {
        let text = r#"
[tool]
name = "t"

[[param]]
key = "n"
type = "int"
max = 5
default = 9
"#;
        assert!(matches!(
            ToolDescriptor::parse(text, Path::new("t.toml")),
            Err(DescriptorError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn test_list_parameter_with_defaults() {
        let text = r#"
[tool]
name = "ff"
executable = "FeatureFinder"
generator = "config-file"

[[param]]
key = "charges"
type = "list"
element = "int"
default = [2, 3]
"#;
        let descriptor = ToolDescriptor::parse(text, Path::new("ff.toml")).unwrap();
        assert_eq!(descriptor.tool.executable, "FeatureFinder");
        assert_eq!(descriptor.generator, GeneratorKind::ConfigFile);
        assert_eq!(
            descriptor
                .config
                .tree
                .parameter("ff.charges")
                .and_then(Parameter::value),
            Some(&Value::List(vec![Value::Int(2), Value::Int(3)]))
        );
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        assert!(matches!(
            ToolDescriptor::parse("[tool", Path::new("bad.toml")),
            Err(DescriptorError::Parse { .. })
        ));
    }
}
