//! POSIX strategy: lsof or ss, ps, pgrep and kill.

pub mod kill;
pub mod ports;
