//! Out of My Way CLI library.
//!
//! This crate provides the `omw` command line and its HTTP listener.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
