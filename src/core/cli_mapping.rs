// src/core/cli_mapping.rs

//! The CLI mapping table: an ordered list of command-line elements, each pointing at one or
//! more nodes of the configuration tree. Declaration order is command-line order.

use crate::core::command_generator::GenerationError;
use crate::core::config_tree::ConfigurationTree;
use serde::{Deserialize, Serialize};

/// A reference from a CLI element to the configuration node supplying its value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    /// Dotted key of the referenced node.
    pub reference: String,
}

impl Mapping {
    /// Creates a mapping to `reference`.
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}

/// One command-line flag, or a positional slot when the option identifier is empty.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CliElement {
    option: String,
    name: String,
    is_list: bool,
    is_required: bool,
    mappings: Vec<Mapping>,
}

impl CliElement {
    /// A flag element with the given option identifier (e.g. `-i`).
    pub fn new(option: impl Into<String>) -> Self {
        Self {
            option: option.into(),
            ..Default::default()
        }
    }

    /// A positional element.
    pub fn positional() -> Self {
        Self::default()
    }

    /// Sets the documentation name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Marks the element as taking a list of values.
    pub fn list(mut self, is_list: bool) -> Self {
        self.is_list = is_list;
        self
    }

    /// Marks the element as required.
    pub fn required(mut self, is_required: bool) -> Self {
        self.is_required = is_required;
        self
    }

    /// Appends a mapping to the node with key `reference`.
    pub fn map(mut self, reference: impl Into<String>) -> Self {
        self.mappings.push(Mapping::new(reference));
        self
    }

    /// The option identifier; empty for positional elements.
    pub fn option(&self) -> &str {
        &self.option
    }

    /// The documentation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the element takes a list of values.
    pub fn is_list(&self) -> bool {
        self.is_list
    }

    /// Whether the element must receive a value.
    pub fn is_required(&self) -> bool {
        self.is_required
    }

    /// Whether the element is positional.
    pub fn is_positional(&self) -> bool {
        self.option.is_empty()
    }

    /// The mappings, in declaration order.
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// A label for messages: the option identifier, or a description of the positional slot.
    pub fn label(&self) -> String {
        match (self.is_positional(), self.name.is_empty()) {
            (false, _) => self.option.clone(),
            (true, false) => format!("<{}>", self.name),
            (true, true) => self.mappings.first().map_or_else(
                || "<positional>".to_string(),
                |m| format!("<{}>", m.reference),
            ),
        }
    }
}

/// The ordered CLI mapping table of one tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CliMapping {
    elements: Vec<CliElement>,
}

impl CliMapping {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an element; its position is its command-line position.
    pub fn push(&mut self, element: CliElement) {
        self.elements.push(element);
    }

    /// The elements in declaration order.
    pub fn elements(&self) -> &[CliElement] {
        &self.elements
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Checks that every element has at least one mapping and that every mapping resolves
    /// to a parameter node of `tree`.
    pub fn validate(&self, tree: &ConfigurationTree) -> Result<(), GenerationError> {
        for element in &self.elements {
            if element.mappings.is_empty() {
                return Err(GenerationError::InconsistentMapping {
                    option: element.label(),
                    reason: "the element has no mappings".to_string(),
                });
            }
            for mapping in &element.mappings {
                let node = tree
                    .find(&mapping.reference)
                    .and_then(|id| tree.node(id))
                    .ok_or_else(|| GenerationError::UnresolvedReference {
                        option: element.label(),
                        reference: mapping.reference.clone(),
                    })?;
                if node.is_group() {
                    return Err(GenerationError::InconsistentMapping {
                        option: element.label(),
                        reason: format!("'{}' is a group, not a parameter", mapping.reference),
                    });
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<CliElement> for CliMapping {
    fn from_iter<I: IntoIterator<Item = CliElement>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

// MARK: --- UNIT TESTS ---
