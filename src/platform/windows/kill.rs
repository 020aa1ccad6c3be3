//! Windows process termination using taskkill

use crate::model::KillOutcome;
use crate::utils::CommandRunner;

pub const TASKKILL: &str = "taskkill";

/// Forcefully terminate `pid` together with all of its descendants.
pub fn terminate_tree(runner: &dyn CommandRunner, pid: u32) -> KillOutcome {
    let pid_arg = pid.to_string();
    match runner.run(TASKKILL, &["/PID", &pid_arg, "/T", "/F"]) {
        Ok(out) if out.success => KillOutcome::Success,
        Ok(out) => KillOutcome::Failed(out.diagnostic()),
        Err(err) => {
            log::error!("taskkill failed to run: {:#}", err);
            KillOutcome::Failed(format!("{:#}", err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::ScriptedRunner;

    #[test]
    fn kills_whole_tree_in_one_call() {
        let runner = ScriptedRunner::new().ok(
            "taskkill /PID 5120 /T /F",
            "SUCCESS: The process with PID 5120 has been terminated.",
        );
        assert_eq!(terminate_tree(&runner, 5120), KillOutcome::Success);
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn missing_process_reports_taskkill_error() {
        let runner = ScriptedRunner::new().fail(
            "taskkill /PID 9 /T /F",
            128,
            "ERROR: The process \"9\" not found.\r\n",
        );
        assert_eq!(
            terminate_tree(&runner, 9),
            KillOutcome::Failed("ERROR: The process \"9\" not found.".to_string())
        );
    }
}
