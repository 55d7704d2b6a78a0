//! Command-line argument definitions.

use clap::{Parser, Subcommand};

use trolley_core::VERSION;

/// Trolley - a shared weekly shopping list client
#[derive(Parser)]
#[command(name = "trolley")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Pretend today is this date (ISO-8601), for demos and screenshots
    #[arg(long, global = true, env = "TROLLEY_TODAY")]
    pub today: Option<String>,

    /// Preload a few past weeks of sample data
    #[arg(long, global = true)]
    pub seed: bool,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive session against an in-memory backend (default)
    Shell,

    /// Non-interactive walkthrough of a week, for smoke testing
    Demo,
}
