use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    version,
    about = "Offline-first caching fetch proxy",
    long_about = "Fetches URLs through an offline caching worker.\n\
                  \n\
                  Static assets are served cache-first and API paths network-first, so\n\
                  precached content keeps resolving when the origin is unreachable.\n\
                  Cache partitions are versioned; activating a new version purges the\n\
                  partitions left behind by its predecessors."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Cache directory
    #[arg(
        long,
        global = true,
        help = "Directory holding the cache partitions (default: system temp dir)"
    )]
    pub cache_dir: Option<PathBuf>,

    /// Worker version tag
    #[arg(
        long,
        global = true,
        default_value = "v1",
        help = "Version tag suffixed onto partition names; bump it to invalidate old partitions"
    )]
    pub worker_version: String,

    /// Origin that relative manifest URLs resolve against
    #[arg(
        long,
        global = true,
        help = "Base URL joined onto relative precache entries, e.g. https://example.com"
    )]
    pub origin: Option<String>,

    /// Path marker for network-first routing
    #[arg(
        long,
        global = true,
        default_value = "/api/",
        help = "Requests whose path contains this marker are served network-first"
    )]
    pub api_marker: String,

    /// Overall HTTP timeout in seconds
    #[arg(
        long,
        global = true,
        default_value = "30",
        help = "Overall timeout for one HTTP request in seconds"
    )]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        global = true,
        default_value = "10",
        help = "Timeout for establishing the initial connection in seconds"
    )]
    pub connect_timeout: u64,

    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable detailed debug logging")]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Precache a manifest of URLs into the static partition
    Precache {
        /// URLs to precache (absolute, or relative to --origin)
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Fetch URLs through the worker
    Fetch {
        /// URLs to fetch
        #[arg(required = true)]
        urls: Vec<String>,

        /// Write the fetched bodies into this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Purge cache partitions that do not belong to this version
    Activate,
}
