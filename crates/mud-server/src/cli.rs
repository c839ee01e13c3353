//! The `mud-server` command line, layered underneath [`crate::config`]:
//! flags here are CLI-only overrides, not a second source of truth for
//! every setting — most configuration lives in `ServerConfig` so it can
//! also come from the environment or a file.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "mud-server", about = "Real-time MUD simulation server")]
pub struct Cli {
    /// Optional TOML/JSON/YAML config file layered under environment
    /// variables and defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Overrides `ServerConfig::log_level` without touching the file or
    /// environment — handy for a one-off verbose run.
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
