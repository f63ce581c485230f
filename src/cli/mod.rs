// src/cli/mod.rs

use clap::Parser;

pub mod handlers;

const COMMANDS_HELP: &str = "\
Commands:
  describe <descriptor> [--advanced]           Show the parameter tree
  command  <descriptor> [--set k=v]... [--json] Print the generated command line
  run      <descriptor> [--set k=v]... [--bundle DIR]
                                               Generate and launch the tool
  payload  <bundle> [--tool name[=exe]]... [--force | --clean]
                                               Extract and register shipped binaries
  tools    [list | set <name> <path> | reset <name>]
                                               Inspect and configure tool paths

Run `toolwrap <command> --help` for the options of a command.
Set RUST_LOG=debug for diagnostic output.";

/// toolwrap: turns tool descriptors into command lines and manages shipped binaries.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    after_help = COMMANDS_HELP,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// The command followed by its own arguments.
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}
