//! Command-line front end for the agent-tracker conversation history.
//!
//! The binary lives in main.rs; configuration, logging and the subcommand
//! handlers are kept here so they can be tested without spawning a process.

pub mod commands;
pub mod config;
pub mod logging;
