//! # System Interaction Layer
//!
//! The boundary between the core logic and the operating system.
//!
//! ## Modules
//!
//! - **`executor`**: spawns a generated tool invocation, injects the packaged environment
//!   and handles graceful cancellation (`Ctrl+C`).

pub mod executor;
