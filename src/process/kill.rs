//! Terminate a process together with its children.

use std::sync::Arc;

use anyhow::Result;

use crate::model::{KillOutcome, KillReport, MAX_PID, parse_pid};
use crate::platform::{Capabilities, posix, windows};
use crate::utils::CommandRunner;

/// Forcefully terminates a pid and its children, making exactly one
/// attempt per call.
///
/// On Windows taskkill handles the whole tree. On POSIX only direct
/// children are found and killed before the target; grandchildren are
/// not visited.
#[derive(Clone)]
pub struct ProcessTerminator {
    caps: Capabilities,
    runner: Arc<dyn CommandRunner>,
}

impl ProcessTerminator {
    pub fn new(caps: Capabilities, runner: Arc<dyn CommandRunner>) -> Self {
        Self { caps, runner }
    }

    /// Validate raw operator input, then terminate.
    pub fn terminate_str(&self, raw_pid: &str) -> Result<KillReport> {
        let pid = parse_pid(raw_pid)?;
        Ok(self.terminate(pid))
    }

    pub fn terminate(&self, pid: u32) -> KillReport {
        if pid == 0 || pid > MAX_PID {
            return KillReport {
                pid,
                children: Vec::new(),
                outcome: KillOutcome::Failed(format!("invalid pid {}", pid)),
            };
        }

        let runner = self.runner.as_ref();
        let report = if self.caps.platform.is_windows() {
            KillReport {
                pid,
                children: Vec::new(),
                outcome: windows::kill::terminate_tree(runner, pid),
            }
        } else {
            let children = if self.caps.child_lookup {
                posix::kill::list_children(runner, pid)
            } else {
                Vec::new()
            };
            let children = posix::kill::kill_children(runner, &children);
            let outcome = posix::kill::kill_pid(runner, pid);
            KillReport {
                pid,
                children,
                outcome,
            }
        };

        match &report.outcome {
            KillOutcome::Success => log::info!(
                "terminated PID {} ({} of {} children)",
                pid,
                report.children_killed(),
                report.children.len()
            ),
            KillOutcome::Failed(reason) => log::warn!("failed to terminate PID {}: {}", pid, reason),
        }
        report
    }
}
