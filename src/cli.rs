//! Command-line arguments for portkill.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::DiscoveryTool;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "portkill",
    about = "Find the process listening on a TCP port and terminate it",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ~/.portkill.json)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (overrides RUST_LOG)
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Timeout in seconds for each external tool
    #[arg(short = 't', long, global = true)]
    pub timeout: Option<u64>,

    /// Force the port lookup tool instead of probing
    #[arg(long, value_enum, global = true)]
    pub tool: Option<DiscoveryTool>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the processes listening on PORT
    Find {
        port: String,
    },
    /// Terminate PID and its child processes
    Kill {
        pid: String,
        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Terminate every process listening on PORT, then list what is left
    Free {
        port: String,
        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
}
