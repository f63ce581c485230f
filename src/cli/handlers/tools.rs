// src/cli/handlers/tools.rs

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use crate::{
    CancellationToken,
    cli::handlers::commons::AppContext,
    core::tool_registry::{ExternalTool, ToolPathType, ToolRegistry},
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Lists and configures the executable path of each tool."
)]
struct ToolsArgs {
    #[command(subcommand)]
    action: Option<ToolsAction>,
}

#[derive(Subcommand, Debug)]
enum ToolsAction {
    /// Lists every known tool (default).
    List,
    /// Uses a manually installed executable for a tool.
    Set {
        name: String,
        path: PathBuf,
    },
    /// Drops the manual path of a tool, falling back to the shipped one if any.
    Reset { name: String },
}

pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let tools_args = ToolsArgs::try_parse_from(&args)?;
    let mut context = AppContext::load()?;

    match tools_args.action.unwrap_or(ToolsAction::List) {
        ToolsAction::List => print_tools(context.registry.registry()),
        ToolsAction::Set { name, path } => {
            set_user_path(context.registry.registry_mut(), &name, path)?;
            println!("{} '{}' now uses its configured path.", "Updated".green(), name.cyan());
        }
        ToolsAction::Reset { name } => {
            let mode = reset_user_path(context.registry.registry_mut(), &name)?;
            println!("{} '{}' ({}).", "Reset".green(), name.cyan(), mode);
        }
    }
    context.persist()
}

fn print_tools(registry: &ToolRegistry) {
    let mut any = false;
    for (name, entry) in registry.entries() {
        any = true;
        let resolved = registry
            .resolve(name)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        let mode = match entry.mode {
            ToolPathType::Unknown => entry.mode.to_string().yellow(),
            _ => entry.mode.to_string().green(),
        };
        println!("{:<24} {:<16} {}", name.cyan(), mode, resolved);
    }
    if !any {
        println!("No tools registered yet. Run `toolwrap payload` or `toolwrap tools set`.");
    }
}

/// Stores `path` as the user-configured executable of `name` and selects it.
fn set_user_path(registry: &mut ToolRegistry, name: &str, path: PathBuf) -> Result<()> {
    let path = if path.exists() {
        dunce::canonicalize(&path)?
    } else {
        log::warn!("'{}' does not exist yet.", path.display());
        path
    };
    if registry.entry(name).is_none() {
        registry.register(&ExternalTool::new(name, name));
    }
    registry.set_tool_path(name, path, ToolPathType::UserConfigured)?;
    registry.update_tool_path_type(name, ToolPathType::UserConfigured)?;
    Ok(())
}

/// Clears the user path of `name`; selects the shipped path when one is recorded.
fn reset_user_path(registry: &mut ToolRegistry, name: &str) -> Result<ToolPathType> {
    if registry.entry(name).is_none() {
        return Err(anyhow!("Tool '{}' is not registered.", name));
    }
    registry.clear_tool_path(name, ToolPathType::UserConfigured);
    if registry.configured_type(name) == ToolPathType::Unknown
        && registry.tool_path(name, ToolPathType::Shipped).is_some()
    {
        registry.update_tool_path_type(name, ToolPathType::Shipped)?;
    }
    Ok(registry.configured_type(name))
}

// MARK: --- UNIT TESTS ---
