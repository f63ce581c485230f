// src/core/tree_display.rs

use crate::core::config_tree::{ConfigurationTree, NodeId};
use std::fmt::Write;

/// Renders an ASCII tree of the parameters of `tree`, in the basic or the full view.
pub fn render_tree(tree: &ConfigurationTree, include_advanced: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", tree.name());
    let children = tree.children(tree.root(), include_advanced);
    for (i, child) in children.iter().enumerate() {
        let is_last = i + 1 == children.len();
        render_node(tree, *child, include_advanced, "", is_last, &mut out);
    }
    out
}

/// Recursive function to render a node and its descendants.
fn render_node(
    tree: &ConfigurationTree,
    id: NodeId,
    include_advanced: bool,
    prefix: &str,
    is_last: bool,
    out: &mut String,
) {
    let Some(node) = tree.node(id) else {
        return;
    };
    let connector = if is_last { "└─" } else { "├─" };

    let mut line = format!("{prefix}{connector}{}", node.name());
    if let Some(parameter) = node.parameter() {
        let _ = write!(line, " <{}>", parameter.ty().name());
        if let Some(value) = parameter.value().filter(|_| parameter.is_set()) {
            let _ = write!(line, " = {value}");
        }
        if parameter.is_required() {
            line.push_str(" [required]");
        }
        if parameter.is_advanced() {
            line.push_str(" (advanced)");
        }
    }
    if let Some(description) = node.description() {
        let _ = write!(line, "  # {description}");
    }
    let _ = writeln!(out, "{line}");

    let child_prefix = format!("{}{}", prefix, if is_last { "   " } else { "│  " });
    let children = tree.children(id, include_advanced);
    for (i, child) in children.iter().enumerate() {
        let is_last_child = i + 1 == children.len();
        render_node(tree, *child, include_advanced, &child_prefix, is_last_child, out);
    }
}

// MARK: --- UNIT TESTS ---
