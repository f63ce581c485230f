// src/core/config_tree.rs

//! # Configuration Tree
//!
//! An arena-backed tree of named nodes, each optionally carrying a [`Parameter`]. Children
//! keep their insertion order, which is the display order and the default mapping order.
//!
//! Every node maintains two child views:
//! - the full view, with every child in insertion order;
//! - the basic view, a stable subsequence of the full view that never contains an advanced
//!   parameter.
//!
//! A parameter node is basic exactly when its own payload is not advanced. A grouping node
//! (no payload) joins its parent's basic view as soon as any descendant is a basic parameter,
//! so groups whose descendants are all advanced stay hidden.

use crate::core::parameters::Parameter;
use std::collections::HashMap;
use thiserror::Error;

/// Separator between the segments of a node key (`blastall.i`).
pub const KEY_SEPARATOR: char = '.';

/// Errors raised by tree navigation and construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The requested child index does not exist in the selected view.
    #[error("child index {index} is out of range ({len} children in the {view} view)")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The size of the selected view.
        len: usize,
        /// Which view was selected ("full" or "basic").
        view: &'static str,
    },
    /// A node with the same key already exists.
    #[error("a node with key '{key}' already exists")]
    DuplicateKey {
        /// The conflicting key.
        key: String,
    },
    /// A node name is empty or contains the key separator.
    #[error("invalid node name '{name}'")]
    InvalidName {
        /// The rejected name.
        name: String,
    },
    /// A node id does not belong to this tree.
    #[error("node {0} does not exist in this tree")]
    UnknownNode(usize),
    /// A group cannot be created because a parameter already occupies the key.
    #[error("'{key}' is a parameter and cannot hold children")]
    NotAGroup {
        /// The key of the parameter node.
        key: String,
    },
}

/// Handle to a node of a [`ConfigurationTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// One node of the tree.
#[derive(Debug, Clone)]
pub struct ConfigurationNode {
    name: String,
    key: String,
    description: Option<String>,
    parameter: Option<Parameter>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    basic_children: Vec<NodeId>,
}

impl ConfigurationNode {
    /// The node's own name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The dotted key from the root (`root.group.param`).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The description, if any. Parameter nodes fall back to the parameter's description.
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .or_else(|| self.parameter.as_ref().and_then(Parameter::description))
    }

    /// The parameter carried by this node.
    pub fn parameter(&self) -> Option<&Parameter> {
        self.parameter.as_ref()
    }

    /// The parent node; `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether this is a pure grouping node.
    pub fn is_group(&self) -> bool {
        self.parameter.is_none()
    }
}

/// The hierarchical parameter model of one tool.
#[derive(Debug, Clone)]
pub struct ConfigurationTree {
    nodes: Vec<ConfigurationNode>,
    keys: HashMap<String, NodeId>,
}

impl ConfigurationTree {
    /// Creates a tree holding only a root grouping node named `root_name`.
    pub fn new(root_name: &str) -> Self {
        let root = ConfigurationNode {
            name: root_name.to_string(),
            key: root_name.to_string(),
            description: None,
            parameter: None,
            parent: None,
            children: Vec::new(),
            basic_children: Vec::new(),
        };
        let mut keys = HashMap::new();
        keys.insert(root_name.to_string(), NodeId(0));
        Self {
            nodes: vec![root],
            keys,
        }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The root name, which prefixes every key.
    pub fn name(&self) -> &str {
        self.nodes.first().map_or("", |n| n.name.as_str())
    }

    /// Total number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds nothing but its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Looks up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&ConfigurationNode> {
        self.nodes.get(id.0)
    }

    fn node_checked(&self, id: NodeId) -> Result<&ConfigurationNode, TreeError> {
        self.nodes.get(id.0).ok_or(TreeError::UnknownNode(id.0))
    }

    /// Appends a child under `parent`. Basic parameters also join the parent's basic view,
    /// and the parent's enclosing groups are promoted into their own parents' basic views.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: &str,
        parameter: Option<Parameter>,
    ) -> Result<NodeId, TreeError> {
        if name.is_empty() || name.contains(KEY_SEPARATOR) {
            return Err(TreeError::InvalidName {
                name: name.to_string(),
            });
        }
        let parent_node = self.node_checked(parent)?;
        let key = format!("{}{}{}", parent_node.key, KEY_SEPARATOR, name);
        if self.keys.contains_key(&key) {
            return Err(TreeError::DuplicateKey { key });
        }

        let is_basic_parameter = parameter.as_ref().is_some_and(|p| !p.is_advanced());
        let id = NodeId(self.nodes.len());
        self.nodes.push(ConfigurationNode {
            name: name.to_string(),
            key: key.clone(),
            description: None,
            parameter,
            parent: Some(parent),
            children: Vec::new(),
            basic_children: Vec::new(),
        });
        self.keys.insert(key, id);

        let parent_node = self
            .nodes
            .get_mut(parent.0)
            .ok_or(TreeError::UnknownNode(parent.0))?;
        parent_node.children.push(id);
        if is_basic_parameter {
            // The new child is last in the full view, so pushing keeps the subsequence stable.
            parent_node.basic_children.push(id);
            self.promote_group(parent);
        }
        Ok(id)
    }

    /// Appends a grouping node.
    pub fn add_group(&mut self, parent: NodeId, name: &str) -> Result<NodeId, TreeError> {
        self.add_child(parent, name, None)
    }

    /// Appends a parameter node.
    pub fn add_parameter(
        &mut self,
        parent: NodeId,
        name: &str,
        parameter: Parameter,
    ) -> Result<NodeId, TreeError> {
        self.add_child(parent, name, Some(parameter))
    }

    /// Attaches a description to a node.
    pub fn set_description(&mut self, id: NodeId, description: &str) -> Result<(), TreeError> {
        let node = self.nodes.get_mut(id.0).ok_or(TreeError::UnknownNode(id.0))?;
        node.description = Some(description.to_string());
        Ok(())
    }

    /// Returns the group at the dotted path relative to the root, creating missing groups.
    pub fn ensure_group(&mut self, relative_path: &str) -> Result<NodeId, TreeError> {
        let mut current = self.root();
        for segment in relative_path
            .split(KEY_SEPARATOR)
            .filter(|s| !s.is_empty())
        {
            let key = format!("{}{}{}", self.node_checked(current)?.key, KEY_SEPARATOR, segment);
            current = match self.keys.get(&key).copied() {
                Some(existing) => {
                    if !self.node_checked(existing)?.is_group() {
                        return Err(TreeError::NotAGroup { key });
                    }
                    existing
                }
                None => self.add_group(current, segment)?,
            };
        }
        Ok(current)
    }

    /// Walks up from a group that just gained a basic descendant, inserting each group into
    /// its parent's basic view at the position matching the full view.
    fn promote_group(&mut self, group: NodeId) {
        let mut current = group;
        loop {
            let Some(node) = self.nodes.get(current.0) else {
                return;
            };
            let Some(parent) = node.parent else {
                return;
            };
            if !node.is_group() {
                return;
            }
            let Some(parent_node) = self.nodes.get_mut(parent.0) else {
                return;
            };
            if parent_node.basic_children.contains(&current) {
                return;
            }
            let full_position = parent_node
                .children
                .iter()
                .position(|c| *c == current)
                .unwrap_or(parent_node.children.len());
            let insert_at = parent_node
                .basic_children
                .iter()
                .filter(|b| {
                    parent_node
                        .children
                        .iter()
                        .position(|c| c == *b)
                        .is_some_and(|p| p < full_position)
                })
                .count();
            parent_node.basic_children.insert(insert_at, current);
            current = parent;
        }
    }

    /// The selected child view of `parent`.
    pub fn children(&self, parent: NodeId, include_advanced: bool) -> &[NodeId] {
        match self.nodes.get(parent.0) {
            Some(node) if include_advanced => &node.children,
            Some(node) => &node.basic_children,
            None => &[],
        }
    }

    /// Every child of `parent`, in insertion order.
    pub fn all_children(&self, parent: NodeId) -> &[NodeId] {
        self.children(parent, true)
    }

    /// The children of `parent` visible in the basic view.
    pub fn basic_children(&self, parent: NodeId) -> &[NodeId] {
        self.children(parent, false)
    }

    /// The child at `index` in the selected view.
    pub fn child(
        &self,
        parent: NodeId,
        index: usize,
        include_advanced: bool,
    ) -> Result<NodeId, TreeError> {
        self.node_checked(parent)?;
        let view = self.children(parent, include_advanced);
        view.get(index)
            .copied()
            .ok_or(TreeError::IndexOutOfRange {
                index,
                len: view.len(),
                view: if include_advanced { "full" } else { "basic" },
            })
    }

    /// The size of the selected view.
    pub fn count(&self, parent: NodeId, include_advanced: bool) -> usize {
        self.children(parent, include_advanced).len()
    }

    /// Finds a node by its dotted key.
    pub fn find(&self, key: &str) -> Option<NodeId> {
        self.keys.get(key).copied()
    }

    /// The parameter stored under `key`.
    pub fn parameter(&self, key: &str) -> Option<&Parameter> {
        self.find(key)
            .and_then(|id| self.nodes.get(id.0))
            .and_then(|n| n.parameter.as_ref())
    }

    /// Mutable access to the parameter stored under `key`.
    pub fn parameter_mut(&mut self, key: &str) -> Option<&mut Parameter> {
        let id = self.find(key)?;
        self.nodes.get_mut(id.0).and_then(|n| n.parameter.as_mut())
    }

    /// Pre-order walk over the selected view, root excluded. Each entry carries its depth
    /// (direct children of the root have depth 0).
    pub fn walk(&self, include_advanced: bool) -> Vec<(usize, NodeId)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, NodeId)> = self
            .children(self.root(), include_advanced)
            .iter()
            .rev()
            .map(|id| (0, *id))
            .collect();
        while let Some((depth, id)) = stack.pop() {
            out.push((depth, id));
            stack.extend(
                self.children(id, include_advanced)
                    .iter()
                    .rev()
                    .map(|c| (depth + 1, *c)),
            );
        }
        out
    }

    /// Every parameter in pre-order, paired with its key.
    pub fn parameters(&self) -> Vec<(&str, &Parameter)> {
        self.walk(true)
            .into_iter()
            .filter_map(|(_, id)| self.nodes.get(id.0))
            .filter_map(|n| n.parameter.as_ref().map(|p| (n.key.as_str(), p)))
            .collect()
    }
}

// MARK: --- UNIT TESTS ---
