use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// portal-autologin - log in to captive portals with stored credentials
#[derive(Parser)]
#[command(name = "portal-autologin")]
#[command(about = "Detects a captive portal and submits its login form with stored credentials")]
#[command(version)]
pub struct Cli {
    /// Run a single probe-login cycle and exit (this is also the default)
    #[arg(long, global = true)]
    pub once: bool,

    /// Mirror log lines to the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a JSON configuration file (built-in defaults when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe, and log in if a portal intercepts traffic (default)
    Run,
    /// Only probe connectivity and report the result
    Probe,
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        file: PathBuf,
    },
    /// Write the default configuration to a file
    ConfigInit {
        /// Destination path
        file: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
