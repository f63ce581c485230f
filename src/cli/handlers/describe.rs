// src/cli/handlers/describe.rs

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use crate::{CancellationToken, cli::handlers::commons, core::tree_display};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Displays the parameter tree of a tool descriptor."
)]
struct DescribeArgs {
    /// Path to the tool descriptor (TOML).
    descriptor: PathBuf,

    /// Include advanced parameters.
    #[arg(long, short)]
    advanced: bool,
}

pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let describe_args = DescribeArgs::try_parse_from(&args)?;
    let descriptor = commons::load_descriptor(&describe_args.descriptor)?;

    let config = &descriptor.config;
    let version = config.version.as_deref().unwrap_or("unversioned");
    println!(
        "\n{} {} ({}, {:?} generator)",
        "Tool".bold(),
        config.name.cyan(),
        version,
        descriptor.generator
    );
    if !describe_args.advanced {
        println!("{}", "Basic view; pass --advanced to show every parameter.".dimmed());
    }
    print!(
        "{}",
        tree_display::render_tree(&config.tree, describe_args.advanced)
    );

    println!("\n{}", "Command line:".bold());
    for element in config.cli.elements() {
        let references: Vec<&str> = element
            .mappings()
            .iter()
            .map(|m| m.reference.as_str())
            .collect();
        let mut flags = Vec::new();
        if element.is_required() {
            flags.push("required");
        }
        if element.is_list() {
            flags.push("list");
        }
        println!(
            "  {} <- {} {}",
            element.label().green(),
            references.join(", "),
            if flags.is_empty() {
                String::new()
            } else {
                format!("[{}]", flags.join(", "))
            }
        );
    }
    Ok(())
}
