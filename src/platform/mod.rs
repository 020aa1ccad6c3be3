//! Platform abstraction layer
//!
//! The host is probed once and the result selects which external tools
//! are used for:
//! - Port scanning
//! - Process name lookup
//! - Process termination

pub mod posix;
pub mod windows;

use crate::config::DiscoveryTool;
use crate::utils::find_command;

/// Strategy used to find and terminate listeners.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Platform {
    Windows,
    PosixLsof,
    PosixSs,
    /// Neither lsof nor ss is installed; lookups return nothing.
    PosixFallback,
}

impl Platform {
    pub fn is_windows(self) -> bool {
        matches!(self, Platform::Windows)
    }

    /// Tool used to discover listeners, if any.
    pub fn discovery_tool(self) -> Option<&'static str> {
        match self {
            Platform::Windows => Some(windows::ports::NETSTAT),
            Platform::PosixLsof => Some(posix::ports::LSOF),
            Platform::PosixSs => Some(posix::ports::SS),
            Platform::PosixFallback => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Capabilities {
    pub platform: Platform,
    /// Whether direct children can be enumerated before a POSIX kill.
    pub child_lookup: bool,
}

impl Capabilities {
    pub fn new(platform: Platform, child_lookup: bool) -> Self {
        Self {
            platform,
            child_lookup: child_lookup && !platform.is_windows(),
        }
    }

    pub fn probe() -> Self {
        Self::probe_with(DiscoveryTool::Auto)
    }

    /// Probe the host, honoring a configured discovery tool where it
    /// applies to the current OS.
    pub fn probe_with(tool: DiscoveryTool) -> Self {
        if cfg!(target_os = "windows") {
            if !matches!(tool, DiscoveryTool::Auto | DiscoveryTool::Netstat) {
                log::warn!("{:?} is not available on Windows, using netstat", tool);
            }
            return Self::new(Platform::Windows, false);
        }

        let platform = match tool {
            DiscoveryTool::Lsof => Platform::PosixLsof,
            DiscoveryTool::Ss => Platform::PosixSs,
            DiscoveryTool::Netstat => {
                log::warn!("netstat discovery is only supported on Windows, probing instead");
                detect_posix()
            }
            DiscoveryTool::Auto => detect_posix(),
        };
        if let Some(name) = platform.discovery_tool()
            && find_command(name).is_none()
        {
            log::warn!("{} not found on PATH; port lookups will come back empty", name);
        }

        let child_lookup = find_command(posix::kill::PGREP).is_some();
        if !child_lookup {
            log::debug!("pgrep not found; child processes will not be terminated");
        }
        let caps = Self::new(platform, child_lookup);
        log::debug!("probed capabilities: {:?}", caps);
        caps
    }
}

fn detect_posix() -> Platform {
    if find_command(posix::ports::LSOF).is_some() {
        Platform::PosixLsof
    } else if find_command(posix::ports::SS).is_some() {
        Platform::PosixSs
    } else {
        Platform::PosixFallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_never_enumerates_children() {
        let caps = Capabilities::new(Platform::Windows, true);
        assert!(!caps.child_lookup);
    }

    #[test]
    fn fallback_has_no_discovery_tool() {
        assert_eq!(Platform::PosixFallback.discovery_tool(), None);
        assert_eq!(Platform::PosixSs.discovery_tool(), Some("ss"));
    }

    #[cfg(unix)]
    #[test]
    fn forced_tool_is_respected() {
        let caps = Capabilities::probe_with(DiscoveryTool::Ss);
        assert_eq!(caps.platform, Platform::PosixSs);
    }
}
