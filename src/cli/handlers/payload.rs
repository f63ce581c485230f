// src/cli/handlers/payload.rs

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use crate::{
    CancellationToken,
    cli::handlers::commons::{self, AppContext},
    core::{
        binaries_manager::{BinariesManager, PayloadState},
        progress::LogProgress,
        tool_registry::ExternalTool,
    },
    state::RegistryStore,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Validates, extracts and registers the shipped binaries of a plugin bundle."
)]
struct PayloadArgs {
    /// Directory of the plugin bundle containing `binaries.zip`.
    bundle: PathBuf,

    /// Plugin name used for the payload directory. Defaults to the bundle directory name.
    #[arg(long, short = 'p')]
    plugin: Option<String>,

    /// A tool the payload provides, as `name` or `name=executable`.
    #[arg(long = "tool", short = 't')]
    tools: Vec<String>,

    /// Take the tools from these descriptors.
    #[arg(long = "descriptor", short = 'd')]
    descriptors: Vec<PathBuf>,

    /// Re-extract even if the current payload is valid.
    #[arg(long, short = 'f')]
    force: bool,

    /// Only delete the extracted payload.
    #[arg(long, conflicts_with = "force")]
    clean: bool,
}

fn parse_tool(raw: &str) -> ExternalTool {
    match raw.split_once('=') {
        Some((name, executable)) => ExternalTool::new(name, executable),
        None => ExternalTool::new(raw, raw),
    }
}

/// Deletes the payload and saves the registry without the shipped paths it pointed to.
fn clean_payload(
    manager: &mut BinariesManager,
    store: &mut RegistryStore,
    plugin: &str,
) -> Result<()> {
    manager
        .clean_payload(store.registry_mut())
        .with_context(|| format!("Could not clean the payload of '{plugin}'"))?;
    store
        .save_if_needed()
        .context("Failed to save the tool registry")?;
    Ok(())
}

pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let payload_args = PayloadArgs::try_parse_from(&args)?;
    let mut context = AppContext::load()?;
    let plugin = commons::plugin_name(
        payload_args.plugin.as_deref(),
        Some(&payload_args.bundle),
        "plugin",
    );

    // 1. Collect the tools this payload should provide.
    let mut tools: Vec<ExternalTool> = payload_args.tools.iter().map(|t| parse_tool(t)).collect();
    for path in &payload_args.descriptors {
        tools.push(commons::load_descriptor(path)?.tool);
    }
    if tools.is_empty() {
        tools = context
            .registry
            .registry()
            .entries()
            .map(|(name, entry)| ExternalTool::new(name, entry.executable.clone()))
            .collect();
    }
    if tools.is_empty() && !payload_args.clean {
        return Err(anyhow!(
            "No tools to register. Pass --tool or --descriptor, or register tools first."
        ));
    }

    let mut manager = context.binaries_manager(&plugin, &payload_args.bundle, tools)?;

    if payload_args.clean {
        clean_payload(&mut manager, &mut context.registry, &plugin)?;
        println!("{} payload of '{}'.", "Removed".green(), plugin.cyan());
        return Ok(());
    }

    // 2. Run the payload state machine.
    let mut monitor = LogProgress::new(cancellation_token.clone());
    let registry = context.registry.registry_mut();
    let state = if payload_args.force {
        manager.reextract(registry, &mut monitor)
    } else {
        manager.ensure(registry, &mut monitor)
    };
    commons::check_for_cancellation(cancellation_token)?;

    // 3. Report.
    println!(
        "\n{} {} ({})",
        "Payload".bold(),
        plugin.cyan(),
        manager.payload().path().display()
    );
    let state_label = match state {
        PayloadState::Registered => "registered".green(),
        PayloadState::NoPayload => "no binaries for this platform".yellow(),
        other => format!("{other:?}").to_lowercase().red(),
    };
    println!("  state: {state_label}");
    let registry = context.registry.registry();
    for tool in manager.tools() {
        match registry.resolve(&tool.name) {
            Some(path) => println!(
                "  {} -> {} ({})",
                tool.name.green(),
                path.display(),
                registry.configured_type(&tool.name)
            ),
            None => println!(
                "  {} -> {}",
                tool.name.yellow(),
                "Did not find any binaries for your platform.".yellow()
            ),
        }
    }
    let env = manager.environment();
    if !env.vars().is_empty() {
        println!("  {} packaged environment variable(s)", env.vars().len());
    }

    context.persist()?;
    if state == PayloadState::Invalid {
        return Err(anyhow!("The payload of '{}' is not valid.", plugin));
    }
    Ok(())
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool() {
        assert_eq!(parse_tool("blastall"), ExternalTool::new("blastall", "blastall"));
        assert_eq!(
            parse_tool("featurefinder=FeatureFinderCentroided"),
            ExternalTool::new("featurefinder", "FeatureFinderCentroided")
        );
    }

    #[test]
    fn test_clean_saves_registry_without_shipped_paths() {
        use crate::core::archive::tests::write_zip;
        use crate::core::payload::{PayloadArchive, PayloadDirectory};
        use crate::core::progress::NullProgress;
        use crate::core::tool_registry::{ToolPathType, ToolRegistry};

        let dir = tempfile::TempDir::new().unwrap();
        let bundle = dir.path().join("bundle");
        std::fs::create_dir_all(&bundle).unwrap();
        write_zip(
            &bundle.join("binaries.zip"),
            &[("bin/blastall", "x"), ("binaries.ini", "")],
        );
        let payload_root = dir.path().join("payload");
        let mut manager = BinariesManager::new(
            "blast",
            PayloadDirectory::new(&payload_root, "bin"),
            PayloadArchive::locate(&bundle),
            vec![ExternalTool::new("blastall", "blastall")],
        );
        let registry_path = dir.path().join("tools.toml");
        let mut store = RegistryStore::load(&registry_path).unwrap();
        assert_eq!(
            manager.ensure(store.registry_mut(), &mut NullProgress),
            PayloadState::Registered
        );
        store.save_if_needed().unwrap();

        clean_payload(&mut manager, &mut store, "blast").unwrap();
        assert!(!payload_root.exists());
        let saved = ToolRegistry::load(&registry_path).unwrap();
        assert_eq!(saved.configured_type("blastall"), ToolPathType::Unknown);
        assert!(saved.resolve("blastall").is_none());
    }
}
