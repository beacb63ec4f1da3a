//! Command-line interface parsing for showcache
//!
//! Every flag is optional and overrides the matching environment variable.

use clap::Parser;
use std::path::PathBuf;

/// showcache - caching proxy for TMDB TV search and detail lookups
#[derive(Parser, Debug, Default)]
#[command(name = "showcache")]
#[command(about = "Caching proxy for TMDB TV search and detail lookups")]
#[command(version)]
pub struct Cli {
    /// Host to bind to (overrides SHOWCACHE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides SHOWCACHE_PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory holding search_cache.json and details_cache.json
    /// (overrides SHOWCACHE_CACHE_DIR)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Refuse to start if an existing cache file cannot be loaded
    #[arg(long)]
    pub strict_cache: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}
