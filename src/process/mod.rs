//! Core operations: resolve a port to its listeners, terminate a pid.

pub mod kill;
pub mod ports;

pub use kill::ProcessTerminator;
pub use ports::PortResolver;
