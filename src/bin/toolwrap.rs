// src/bin/toolwrap.rs

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser};
use colored::*;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use toolwrap::{
    CancellationToken,
    cli::{Cli, handlers},
    core::payload::PayloadError,
    system::executor,
};

// --- Command Definition and Registry ---

/// Defines a command, its aliases, and its synchronous handler function.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &CancellationToken) -> Result<()>,
}

/// The single source of truth for all commands.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "command",
        aliases: &["cmd"],
        handler: handlers::command::handle,
    },
    CommandDefinition {
        name: "describe",
        aliases: &["tree"],
        handler: handlers::describe::handle,
    },
    CommandDefinition {
        name: "payload",
        aliases: &[],
        handler: handlers::payload::handle,
    },
    CommandDefinition {
        name: "run",
        aliases: &[],
        handler: handlers::run::handle,
    },
    CommandDefinition {
        name: "tools",
        aliases: &[],
        handler: handlers::tools::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Whether `e` comes from a user interruption.
fn is_interruption(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<executor::ExecutionError>(),
            Some(executor::ExecutionError::Cancelled)
        ) || matches!(
            cause.downcast_ref::<PayloadError>(),
            Some(PayloadError::Cancelled)
        )
    })
}

/// The main entry point of the `toolwrap` application.
/// It sets up logging, parses arguments, dispatches to the correct handler,
/// and performs centralized error handling.
fn main() {
    let cancellation_token = Arc::new(AtomicBool::new(false));
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse(), &cancellation_token) {
        if is_interruption(&e) {
            std::process::exit(130);
        }
        // Handler argument errors (and `--help`) are rendered by clap itself.
        if let Some(clap_error) = e.downcast_ref::<clap::Error>() {
            clap_error.exit();
        }
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Routes the first argument to its handler with the remaining arguments.
fn run_cli(cli: Cli, cancellation_token: &CancellationToken) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let mut args = cli.args.into_iter();
    let Some(action_name) = args.next() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match find_command(&action_name) {
        Some(command) => (command.handler)(args.collect(), cancellation_token),
        None => Err(anyhow!(
            "Unknown command '{}'. Run `toolwrap --help` for the list of commands.",
            action_name
        )),
    }
}
