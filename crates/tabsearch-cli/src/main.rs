//! tabsearch
//!
//! Store and search typed records in per-partition full-text indices.
//!
//! # Usage
//!
//! ```bash
//! tabsearch insert --schema contacts.json --records rows.json
//! tabsearch search --schema contacts.json --template acme.json --filter f.json --page 1 --page-size 20
//! tabsearch compact --schema contacts.json --template acme.json
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/tabsearch/config.toml)
//! 3. Environment variables (TABSEARCH_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use tabsearch_cli::{run, Cli};

fn main() -> Result<()> {
    run(Cli::parse())
}
