// src/cli/handlers/run.rs

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use crate::{
    CancellationToken,
    cli::handlers::commons::{self, AppContext},
    core::{
        binaries_manager::PayloadState,
        command_generator::CommandGenerator,
        environment::PackagedEnvironment,
        progress::LogProgress,
        tool_registry::ToolPathType,
    },
    system::executor::{self, ToolInvocation},
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Generates the command for a tool descriptor and runs the tool."
)]
struct RunArgs {
    /// Path to the tool descriptor (TOML).
    descriptor: PathBuf,

    /// Sets a parameter value (`key=value`). Repeat a key to build a list.
    #[arg(long = "set", short = 's', value_parser = commons::parse_assignment)]
    sets: Vec<(String, String)>,

    /// Working directory of the tool. Defaults to the current directory.
    #[arg(long, short = 'w')]
    workdir: Option<PathBuf>,

    /// Plugin bundle holding the shipped binaries; the payload is prepared before running.
    #[arg(long, short = 'b')]
    bundle: Option<PathBuf>,

    /// Plugin name used for the payload directory. Defaults to the bundle directory name.
    #[arg(long, short = 'p')]
    plugin: Option<String>,

    /// Print the command instead of running it.
    #[arg(long)]
    dry_run: bool,
}

pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let run_args = RunArgs::try_parse_from(&args)?;
    let descriptor = commons::load_descriptor(&run_args.descriptor)?;
    let mut context = AppContext::load()?;
    let working_dir = commons::working_dir(run_args.workdir)?;
    let tool = descriptor.tool.clone();
    let plugin = commons::plugin_name(
        run_args.plugin.as_deref(),
        run_args.bundle.as_deref(),
        &tool.name,
    );

    // 1. Bring the shipped binaries up to date when a bundle is given.
    let mut environment = PackagedEnvironment::default();
    if let Some(bundle) = &run_args.bundle {
        let mut manager = context.binaries_manager(&plugin, bundle, vec![tool.clone()])?;
        let mut monitor = LogProgress::new(cancellation_token.clone());
        let state = manager.ensure(context.registry.registry_mut(), &mut monitor);
        if state != PayloadState::Registered {
            println!(
                "{} payload of '{}' is {:?}; falling back to configured paths.",
                "Warning:".yellow(),
                plugin,
                state
            );
        }
        environment = manager.environment().clone();
        context.persist()?;
    } else if context.registry.registry().configured_type(&tool.name) == ToolPathType::Shipped {
        let payload = context.settings.payload_for(&context.config_dir, &plugin)?;
        let env_file = payload.env_file();
        if env_file.is_file() {
            let root = dunce::canonicalize(payload.path())?;
            environment.load(&env_file, &root)?;
        }
    }
    commons::check_for_cancellation(cancellation_token)?;

    // 2. Resolve the executable.
    let program = context
        .registry
        .registry()
        .resolve(&tool.name)
        .map(|p| p.to_path_buf())
        .ok_or_else(|| {
            anyhow!(
                "No executable configured for '{}'. Did not find any binaries for your platform; \
                 set one with `toolwrap tools set {} <path>`.",
                tool.name.cyan(),
                tool.name
            )
        })?;

    // 3. Generate the arguments.
    let settings = context.settings.plugin_settings(&plugin);
    let store = commons::build_store(&run_args.sets);
    let tokens = CommandGenerator::new(descriptor.generator)
        .generate(&descriptor.config, &store, &settings, &working_dir)
        .with_context(|| format!("Could not generate the command for '{}'", tool.name))?;

    let invocation =
        ToolInvocation::new(program, tokens, &working_dir).with_env(environment.vars());
    if run_args.dry_run {
        println!("{}", invocation.display_line());
        return Ok(());
    }

    // 4. Launch.
    println!("{} {}", "Running".green().bold(), invocation.display_line());
    executor::execute(&invocation, cancellation_token)?;
    Ok(())
}
