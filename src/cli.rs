use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lembur")]
#[command(about = "Overtime reminders for the attendance system", long_about = None)]
pub struct Cli {
    /// Configuration file (replaces ~/.lembur/config.yaml and ./.lembur.yaml)
    #[arg(short, long, global = true, env = "LEMBUR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll the attendance server and remind after the overtime threshold
    Watch {
        /// Do not read control commands from stdin
        #[arg(long)]
        no_control: bool,
    },

    /// Check the overtime status once
    Check {
        /// Do not cover the terminal while the request runs
        #[arg(long)]
        no_loading: bool,
    },

    /// Request notification permission and print the decision
    Permission,

    /// Show whether a time of day is past the overtime threshold
    Threshold {
        /// Time to test (HH:MM). Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },
}
