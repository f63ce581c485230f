// src/cli/handlers/command.rs

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use crate::{
    CancellationToken,
    cli::handlers::commons::{self, AppContext},
    core::command_generator::{CommandGenerator, GeneratorKind},
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Prints the command line generated for a tool descriptor."
)]
struct CommandArgs {
    /// Path to the tool descriptor (TOML).
    descriptor: PathBuf,

    /// Sets a parameter value (`key=value`). Repeat a key to build a list.
    #[arg(long = "set", short = 's', value_parser = commons::parse_assignment)]
    sets: Vec<(String, String)>,

    /// Directory in which a parameter file is written. Defaults to the current directory.
    #[arg(long, short = 'w')]
    workdir: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize, Debug)]
struct GeneratedCommand<'a> {
    tool: &'a str,
    generator: GeneratorKind,
    args: &'a [String],
}

pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let command_args = CommandArgs::try_parse_from(&args)?;
    let descriptor = commons::load_descriptor(&command_args.descriptor)?;
    let context = AppContext::load()?;
    let working_dir = commons::working_dir(command_args.workdir)?;

    let store = commons::build_store(&command_args.sets);
    let settings = context.settings.plugin_settings(&descriptor.tool.name);
    let tokens = CommandGenerator::new(descriptor.generator)
        .generate(&descriptor.config, &store, &settings, &working_dir)
        .with_context(|| format!("Could not generate the command for '{}'", descriptor.tool.name))?;

    if command_args.json {
        let output = GeneratedCommand {
            tool: &descriptor.tool.name,
            generator: descriptor.generator,
            args: &tokens,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let line = shlex::try_join(tokens.iter().map(String::as_str))
            .context("A generated argument cannot be shell-quoted")?;
        println!("{line}");
    }
    Ok(())
}
