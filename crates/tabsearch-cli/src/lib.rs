//! tabsearch CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (insert, update, delete, search, compact)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, WriteArgs};
pub use commands::{execute, init_logging, load_settings, run};
