//! POSIX process termination using pgrep and kill -9

use crate::model::{ChildKill, KillOutcome, pid_from_column};
use crate::utils::CommandRunner;

pub const PGREP: &str = "pgrep";
pub const KILL: &str = "kill";

/// Direct children of `pid`, in the order pgrep prints them.
pub fn list_children(runner: &dyn CommandRunner, pid: u32) -> Vec<u32> {
    let pid_arg = pid.to_string();
    match runner.run(PGREP, &["-P", &pid_arg]) {
        // pgrep exits 1 when nothing matched; stdout is empty then
        Ok(out) => parse_pgrep(&out.stdout, pid),
        Err(err) => {
            log::debug!("pgrep failed for PID {}: {:#}", pid, err);
            Vec::new()
        }
    }
}

pub fn parse_pgrep(stdout: &str, parent: u32) -> Vec<u32> {
    stdout
        .lines()
        .filter_map(pid_from_column)
        .filter(|pid| *pid != parent)
        .collect()
}

/// Send SIGKILL to a single pid.
pub fn kill_pid(runner: &dyn CommandRunner, pid: u32) -> KillOutcome {
    let pid_arg = pid.to_string();
    match runner.run(KILL, &["-9", &pid_arg]) {
        Ok(out) if out.success => KillOutcome::Success,
        Ok(out) => KillOutcome::Failed(out.diagnostic()),
        Err(err) => KillOutcome::Failed(format!("{:#}", err)),
    }
}

/// Kill each child, ignoring failures since a child may already be gone.
pub fn kill_children(runner: &dyn CommandRunner, children: &[u32]) -> Vec<ChildKill> {
    children
        .iter()
        .map(|&pid| {
            let outcome = kill_pid(runner, pid);
            match &outcome {
                KillOutcome::Success => log::debug!("killed child PID {}", pid),
                KillOutcome::Failed(reason) => {
                    log::warn!("could not kill child PID {}: {}", pid, reason)
                }
            }
            ChildKill { pid, outcome }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::ScriptedRunner;

    #[test]
    fn pgrep_output_excludes_parent_and_garbage() {
        assert_eq!(parse_pgrep("101\n102\n\n100\nxyz\n", 100), vec![101, 102]);
    }

    #[test]
    fn no_children_when_pgrep_finds_nothing() {
        let runner = ScriptedRunner::new().fail("pgrep -P 100", 1, "");
        assert!(list_children(&runner, 100).is_empty());
    }

    #[test]
    fn kill_failure_carries_stderr() {
        let runner = ScriptedRunner::new().fail(
            "kill -9 99999",
            1,
            "sh: kill: (99999) - No such process\n",
        );
        assert_eq!(
            kill_pid(&runner, 99999),
            KillOutcome::Failed("sh: kill: (99999) - No such process".to_string())
        );
    }

    #[test]
    fn children_are_killed_in_order_despite_failures() {
        let runner = ScriptedRunner::new()
            .fail("kill -9 101", 1, "No such process")
            .ok("kill -9 102", "");
        let kills = kill_children(&runner, &[101, 102]);
        assert_eq!(kills.len(), 2);
        assert!(!kills[0].outcome.is_success());
        assert!(kills[1].outcome.is_success());
        assert_eq!(
            runner.calls(),
            vec!["kill -9 101".to_string(), "kill -9 102".to_string()]
        );
    }
}
