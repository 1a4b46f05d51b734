//! CLI argument parsing for tabsearch.
//!
//! Global flags override the config file and environment.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Schema-driven record storage and search over per-partition indices
#[derive(Parser, Debug)]
#[command(name = "tabsearch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/tabsearch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the index root directory
    #[arg(long, global = true)]
    pub index_root: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Schema and record files for a write.
#[derive(Args, Debug, Clone)]
pub struct WriteArgs {
    /// Record schema JSON file
    #[arg(short, long)]
    pub schema: PathBuf,

    /// JSON file with one record object or an array of them
    #[arg(short, long)]
    pub records: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add records as new documents
    Insert(WriteArgs),

    /// Replace documents matching each record's query keys
    Update(WriteArgs),

    /// Remove documents matching each record's query keys
    Delete(WriteArgs),

    /// Search one partition
    Search {
        /// Record schema JSON file
        #[arg(short, long)]
        schema: PathBuf,

        /// Template record JSON file; must carry the storage key
        #[arg(short, long)]
        template: PathBuf,

        /// Filter expression JSON file
        #[arg(short, long)]
        filter: Option<PathBuf>,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 0)]
        page: usize,

        /// Hits per page (0 = all)
        #[arg(long, default_value_t = 0)]
        page_size: usize,

        /// Sort order (accepted, not applied)
        #[arg(long)]
        sort: Option<String>,
    },

    /// Merge a partition's index segments now
    Compact {
        /// Record schema JSON file
        #[arg(short, long)]
        schema: PathBuf,

        /// Template record JSON file; must carry the storage key
        #[arg(short, long)]
        template: PathBuf,
    },
}
