pub mod app;
pub use app::run;

pub mod cli;
pub mod config;
pub mod model;
pub mod utils;

// Platform abstraction layer
pub mod platform;

// Core operations: port -> processes, pid -> termination
pub mod process;

pub mod ui {
    pub mod table;
}

pub use model::{KillOutcome, KillReport, ProcessRecord};
pub use platform::{Capabilities, Platform};
pub use process::{PortResolver, ProcessTerminator};
