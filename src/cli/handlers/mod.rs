// src/cli/handlers/mod.rs

// This module contains the logic for each CLI action.

pub mod command;
pub mod commons;
pub mod describe;
pub mod payload;
pub mod run;
pub mod tools;
