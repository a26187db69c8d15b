//! CLI module for the remove-background binary
//!
//! This module is only available when the "cli" feature is enabled.

mod config;
#[path = "main.rs"]
mod main_impl;

pub use main_impl::{main, BatchArgs, Cli, CliBackend, Command, LogFormat, ModelArgs, SingleArgs};
