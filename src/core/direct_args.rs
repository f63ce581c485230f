// src/core/direct_args.rs

//! Direct-argument generation: the CLI mapping table is walked in declaration order and
//! every element contributes its option identifier and value tokens. Output order is a
//! pure function of table order and list-entry order.

use crate::core::cli_mapping::{CliElement, CliMapping};
use crate::core::command_generator::{GenerationError, ListEmission};
use crate::core::config_tree::ConfigurationTree;
use crate::core::parameters::{Parameter, ParameterType, Value};

/// Emits the arguments for every element of `cli`, reading values from `tree`.
///
/// Elements whose mapped values are all unset are skipped, or abort the whole generation
/// when they are required. No empty tokens are ever produced.
pub fn generate_arguments(
    tree: &ConfigurationTree,
    cli: &CliMapping,
    list_emission: ListEmission,
) -> Result<Vec<String>, GenerationError> {
    let mut tokens = Vec::new();
    for element in cli.elements() {
        let emitted = emit_element(tree, element, list_emission)?;
        log::trace!("CLI element '{}' -> {:?}", element.label(), emitted);
        tokens.extend(emitted);
    }
    Ok(tokens)
}

/// Fails on the first required element whose mapped values are all unset.
pub fn check_required_elements(
    tree: &ConfigurationTree,
    cli: &CliMapping,
) -> Result<(), GenerationError> {
    for element in cli.elements().iter().filter(|e| e.is_required()) {
        if !resolve_parameters(tree, element)?.iter().any(|p| p.is_set()) {
            return Err(GenerationError::MissingRequiredValue {
                option: element.label(),
            });
        }
    }
    Ok(())
}

/// Resolves every mapping of `element` to its parameter, in mapping order.
fn resolve_parameters<'t>(
    tree: &'t ConfigurationTree,
    element: &CliElement,
) -> Result<Vec<&'t Parameter>, GenerationError> {
    if element.mappings().is_empty() {
        return Err(GenerationError::InconsistentMapping {
            option: element.label(),
            reason: "the element has no mappings".to_string(),
        });
    }
    element
        .mappings()
        .iter()
        .map(|mapping| {
            let node = tree
                .find(&mapping.reference)
                .and_then(|id| tree.node(id))
                .ok_or_else(|| GenerationError::UnresolvedReference {
                    option: element.label(),
                    reference: mapping.reference.clone(),
                })?;
            node.parameter()
                .ok_or_else(|| GenerationError::InconsistentMapping {
                    option: element.label(),
                    reason: format!("'{}' is a group, not a parameter", mapping.reference),
                })
        })
        .collect()
}

fn emit_element(
    tree: &ConfigurationTree,
    element: &CliElement,
    list_emission: ListEmission,
) -> Result<Vec<String>, GenerationError> {
    let parameters = resolve_parameters(tree, element)?;
    let values: Vec<&Value> = parameters
        .iter()
        .filter(|p| p.is_set())
        .filter_map(|p| p.value())
        .collect();

    if values.is_empty() {
        if element.is_required() {
            return Err(GenerationError::MissingRequiredValue {
                option: element.label(),
            });
        }
        return Ok(Vec::new());
    }

    // A lone boolean mapping behaves as a switch: present when true, absent when false.
    if let ([parameter], [value]) = (parameters.as_slice(), values.as_slice())
        && !element.is_list()
        && matches!(parameter.ty(), ParameterType::Bool)
    {
        return Ok(match (value, element.is_positional()) {
            (Value::Bool(true), false) => vec![element.option().to_string()],
            (Value::Bool(true), true) => vec!["true".to_string()],
            _ => Vec::new(),
        });
    }

    if element.is_list() {
        let entries: Vec<String> = values.iter().flat_map(|v| v.to_tokens()).collect();
        return Ok(emit_list(element, entries, list_emission));
    }

    let mut tokens = Vec::with_capacity(values.len() + 1);
    if !element.is_positional() {
        tokens.push(element.option().to_string());
    }
    for value in values {
        let value_tokens = value.to_tokens();
        if value_tokens.len() > 1 {
            return Err(GenerationError::InconsistentMapping {
                option: element.label(),
                reason: format!(
                    "a list with {} entries is mapped to a single-valued element",
                    value_tokens.len()
                ),
            });
        }
        tokens.extend(value_tokens);
    }
    Ok(tokens)
}

fn emit_list(element: &CliElement, entries: Vec<String>, list_emission: ListEmission) -> Vec<String> {
    if element.is_positional() {
        return entries;
    }
    match list_emission {
        ListEmission::RepeatOption => entries
            .into_iter()
            .flat_map(|entry| [element.option().to_string(), entry])
            .collect(),
        ListEmission::SingleOption => std::iter::once(element.option().to_string())
            .chain(entries)
            .collect(),
    }
}

// MARK: --- UNIT TESTS ---
