// src/core/mod.rs

pub mod archive;
pub mod binaries_manager;
pub mod cli_mapping;
pub mod command_generator;
pub mod config_tree;
pub mod descriptor;
pub mod direct_args;
pub mod environment;
pub mod param_file;
pub mod parameters;
pub mod paths;
pub mod payload;
pub mod progress;
pub mod settings;
pub mod tool_registry;
pub mod tree_display;
