//! # toolwrap
//!
//! Turns declarative tool descriptors into validated parameter trees and concrete
//! command invocations, and manages the platform payload of shipped tool binaries.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Shared flag used to cooperatively cancel long-running work (extraction, child processes).
pub type CancellationToken = Arc<AtomicBool>;

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod state;
pub mod system;
