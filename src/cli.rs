//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::WallmountConfig;
use crate::error::Result;

/// Sketch publisher for wall-mounted displays
#[derive(Parser, Debug)]
#[command(name = "wallmountd")]
#[command(about = "Serves versioned sketches to wall-mounted displays with atomic pushes")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "WALLMOUNT_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Root directory holding inbox/ and static/ (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),

    /// Delete every staged version except the live one
    Sweep,

    /// Print the live version and staged versions
    Status,
}

/// Arguments for the serve command
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Release push reservations held longer than this many seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub reservation_timeout: Option<u64>,
}

impl Cli {
    /// Load the config file and apply flag overrides
    pub fn resolve_config(&self) -> Result<WallmountConfig> {
        let mut config = match &self.config {
            Some(path) => WallmountConfig::load_from(path)?,
            None => WallmountConfig::default(),
        };

        if let Some(root) = &self.root {
            config.storage.root_dir = root.clone();
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
        if let Commands::Serve(args) = &self.command {
            args.apply(&mut config);
        }
        Ok(config)
    }
}

impl ServeArgs {
    fn apply(&self, config: &mut WallmountConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(secs) = self.reservation_timeout {
            config.push.reservation_timeout_secs = Some(secs);
        }
    }
}
