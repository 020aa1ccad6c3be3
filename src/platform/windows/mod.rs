//! Windows strategy: netstat, tasklist and taskkill.

pub mod kill;
pub mod ports;
