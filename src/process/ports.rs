//! Resolve a TCP port to the processes listening on it.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;

use crate::model::{Listener, ProcessRecord, UNKNOWN_NAME, parse_port};
use crate::platform::{Capabilities, Platform, posix, windows};
use crate::utils::CommandRunner;

/// Maps a port to its owning processes using the probed platform tools.
///
/// There is a gap between discovering a pid and looking up its name. If
/// the process exits in between the name comes back as `"unknown"`, and
/// if the OS reuses the pid the name may belong to the new process. No
/// attempt is made to detect reuse.
#[derive(Clone)]
pub struct PortResolver {
    caps: Capabilities,
    runner: Arc<dyn CommandRunner>,
}

impl PortResolver {
    pub fn new(caps: Capabilities, runner: Arc<dyn CommandRunner>) -> Self {
        Self { caps, runner }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Validate raw operator input, then resolve. Nothing is executed when
    /// validation fails.
    pub fn resolve_str(&self, raw_port: &str) -> Result<Vec<ProcessRecord>> {
        let port = parse_port(raw_port)?;
        Ok(self.resolve(port))
    }

    /// Listeners on `port`, unique by pid in discovery order.
    pub fn resolve(&self, port: u16) -> Vec<ProcessRecord> {
        if port == 0 {
            return Vec::new();
        }

        let runner = self.runner.as_ref();
        let found = match self.caps.platform {
            Platform::Windows => windows::ports::scan_port(runner, port),
            Platform::PosixLsof => posix::ports::scan_port_lsof(runner, port),
            Platform::PosixSs => posix::ports::scan_port_ss(runner, port),
            Platform::PosixFallback => {
                log::debug!("no port lookup tool available; nothing to report for {}", port);
                Vec::new()
            }
        };

        let records: Vec<ProcessRecord> = dedup_by_pid(found)
            .into_iter()
            .map(|listener| {
                let name = self
                    .lookup_name(listener.pid)
                    .unwrap_or_else(|| UNKNOWN_NAME.to_string());
                ProcessRecord::new(listener.pid, name, listener.state)
            })
            .collect();
        log::debug!("port {}: {} process(es)", port, records.len());
        records
    }

    fn lookup_name(&self, pid: u32) -> Option<String> {
        let runner = self.runner.as_ref();
        if self.caps.platform.is_windows() {
            windows::ports::lookup_name(runner, pid)
        } else {
            posix::ports::lookup_name(runner, pid)
        }
    }
}

/// Keep the first listener seen for each pid.
fn dedup_by_pid(found: Vec<Listener>) -> Vec<Listener> {
    let mut seen: HashSet<u32> = HashSet::new();
    found
        .into_iter()
        .filter(|listener| seen.insert(listener.pid))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::ScriptedRunner;

    fn resolver(platform: Platform, runner: &Arc<ScriptedRunner>) -> PortResolver {
        PortResolver::new(Capabilities::new(platform, true), runner.clone())
    }

    #[test]
    fn invalid_input_runs_nothing() {
        let runner = Arc::new(ScriptedRunner::new());
        let resolver = resolver(Platform::PosixLsof, &runner);
        assert!(resolver.resolve_str("abc").is_err());
        assert!(resolver.resolve_str("0").is_err());
        assert!(resolver.resolve(0).is_empty());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn no_listener_means_empty() {
        let runner = Arc::new(
            ScriptedRunner::new().fail("lsof -nP -iTCP:54321 -sTCP:LISTEN", 1, ""),
        );
        let resolver = resolver(Platform::PosixLsof, &runner);
        assert!(resolver.resolve_str("54321").unwrap().is_empty());
    }

    #[test]
    fn lsof_results_are_named_and_deduplicated() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .ok(
                    "lsof -nP -iTCP:3000 -sTCP:LISTEN",
                    "COMMAND   PID USER FD TYPE DEVICE SIZE/OFF NODE NAME\n\
                     node    51234 dev  23u IPv4 0x1 0t0 TCP *:3000 (LISTEN)\n\
                     node    51234 dev  24u IPv6 0x2 0t0 TCP *:3000 (LISTEN)\n\
                     bun     51300 dev  12u IPv4 0x3 0t0 TCP 127.0.0.1:3000 (LISTEN)\n",
                )
                .ok("ps -p 51234 -o comm=", "node\n"),
        );
        let records = resolver(Platform::PosixLsof, &runner).resolve(3000);
        assert_eq!(
            records,
            vec![
                ProcessRecord::new(51234, "node", "LISTEN"),
                ProcessRecord::new(51300, UNKNOWN_NAME, "LISTEN"),
            ]
        );
        let ps_calls = runner
            .calls()
            .iter()
            .filter(|c| c.starts_with("ps "))
            .count();
        assert_eq!(ps_calls, 2);
    }

    #[test]
    fn ss_keeps_first_seen_order() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .ok(
                    "ss -ltnp",
                    "LISTEN 0 511 0.0.0.0:80 0.0.0.0:* users:((\"nginx\",pid=7,fd=6),(\"nginx\",pid=3,fd=6))\n\
                     LISTEN 0 511 [::]:80 [::]:* users:((\"nginx\",pid=3,fd=7),(\"nginx\",pid=7,fd=7))\n\
                     LISTEN 0 511 0.0.0.0:8080 0.0.0.0:* users:((\"node\",pid=9,fd=3))\n",
                )
                .ok("ps -p 7 -o comm=", "nginx\n")
                .ok("ps -p 3 -o comm=", "nginx\n"),
        );
        let pids: Vec<u32> = resolver(Platform::PosixSs, &runner)
            .resolve(80)
            .into_iter()
            .map(|r| r.pid)
            .collect();
        assert_eq!(pids, vec![7, 3]);
    }

    #[test]
    fn windows_uses_netstat_state_and_tasklist_names() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .ok(
                    "netstat -ano",
                    "  TCP    0.0.0.0:8080   0.0.0.0:0   LISTENING   5120\r\n\
                     \x20 TCP    0.0.0.0:80     0.0.0.0:0   LISTENING   4\r\n",
                )
                .ok(
                    "tasklist /FI PID eq 5120 /FO CSV /NH",
                    "\"node.exe\",\"5120\",\"Console\",\"1\",\"45,000 K\"\r\n",
                ),
        );
        let records = resolver(Platform::Windows, &runner).resolve(8080);
        assert_eq!(
            records,
            vec![ProcessRecord::new(5120, "node.exe", "LISTENING")]
        );
    }

    #[test]
    fn fallback_platform_returns_empty_without_commands() {
        let runner = Arc::new(ScriptedRunner::new());
        let records = resolver(Platform::PosixFallback, &runner).resolve(8080);
        assert!(records.is_empty());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn discovery_spawn_failure_is_empty() {
        let runner = Arc::new(ScriptedRunner::new());
        assert!(resolver(Platform::PosixSs, &runner).resolve(80).is_empty());
    }
}
