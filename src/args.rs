use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "closeness",
    about = "Estimate how close two social-media accounts are from their public snapshots",
    version,
    long_about = None
)]
pub struct Args {
    /// Directory holding <username>.json snapshot files
    #[arg(short, long, global = true, default_value = "snapshots")]
    pub data_dir: PathBuf,

    /// SQLite file used to cache snapshots between runs
    #[arg(short, long, global = true)]
    pub cache: Option<PathBuf>,

    /// Hours before a cached snapshot is considered stale
    #[arg(long, global = true, default_value_t = crate::cache::DEFAULT_TTL_HOURS)]
    pub ttl_hours: i64,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze the relationship between two users
    Analyze { user1: String, user2: String },

    /// Score two snapshot files directly
    Compare { file1: PathBuf, file2: PathBuf },

    /// Show a user's profile and a sample of their connections
    User { username: String },

    /// Rank candidates by closeness to a target user
    Rank {
        target: String,

        /// Candidate usernames; every snapshot in the data directory when omitted
        candidates: Vec<String>,

        /// Number of top candidates to display
        #[arg(short, long)]
        top: Option<usize>,

        /// Number of worker threads
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Remove every cached snapshot
    ClearCache,
}
