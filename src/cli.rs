use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "avfs")]
#[command(author, version, about = "Serve decoded clips as virtual OpenDML AVI files")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the layout of the virtual AVI file
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Synthesize a byte range of the virtual file
    Read {
        /// Start offset in bytes
        #[arg(long)]
        offset: u64,

        /// Number of bytes to read
        #[arg(long)]
        length: u64,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the whole virtual file to disk
    Export {
        /// Output file, or a directory to place `<clip>.avi` in
        #[arg(required = true)]
        output: PathBuf,

        /// Bytes per ranged read (overrides read.chunk_size)
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Print the RIFF chunk tree of the virtual file
    Inspect {
        /// Maximum list nesting to descend into
        #[arg(long, default_value = "3")]
        depth: usize,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
