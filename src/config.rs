use std::path::{Path, PathBuf};

use clap::Parser;

/// Environment variable consulted when no root is passed on the command line.
pub const ROOT_ENV: &str = "PLAYLISTER_ROOT";

#[derive(Parser)]
#[command(
    name = "playlister",
    about = "MCP server for browsing a music library and editing M3U playlists"
)]
pub struct Cli {
    /// Music library root. Every tool is confined to this directory.
    #[arg(env = ROOT_ENV)]
    pub root: PathBuf,
}

/// Process-wide settings, fixed at startup and handed to each component.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
}

impl Config {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_cli(cli: Cli) -> Self {
        Self::new(cli.root)
    }

    /// The root exactly as configured.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `true` when the configured root currently names a directory.
    pub fn root_is_dir(&self) -> bool {
        self.root.is_dir()
    }
}
