use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Snapshot root: a local path or an SCP-style user@host:path URL
    #[arg(value_name = "ROOT", required_unless_present = "endpoint")]
    pub root: Option<String>,

    /// Exclusion patterns (shell glob style, leading '!' negates)
    #[arg(short = 'x', long = "ignore", value_name = "PATTERN")]
    pub ignores: Vec<String>,

    /// Symlink handling: ignore, portable, or posix-raw
    #[arg(long, default_value = "portable")]
    pub symlink_mode: String,

    /// Skip regular files of at least this many bytes (0 disables)
    #[arg(long, default_value_t = 0)]
    pub max_file_size: u64,

    /// Digest cache file reused across runs
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Run as a remote endpoint over stdio
    #[arg(long, default_value_t = false, hide = true)]
    pub endpoint: bool,

    /// Suppress non-error messages
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Increase verbosity
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
