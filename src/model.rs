use anyhow::{Result, bail};

/// Name reported when a pid can no longer be resolved to a process name.
pub const UNKNOWN_NAME: &str = "unknown";

/// State reported for every listener found through lsof or ss.
pub const LISTEN_STATE: &str = "LISTEN";

/// Largest pid handed to a kill tool. Larger values wrap to negative pids,
/// which signal whole process groups.
pub const MAX_PID: u32 = i32::MAX as u32;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    pub state: String,
}

impl ProcessRecord {
    pub fn new(pid: u32, name: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            state: state.into(),
        }
    }

    pub fn has_known_name(&self) -> bool {
        self.name != UNKNOWN_NAME
    }

    /// Whether the record owns the listening socket. Windows rows where
    /// the port is only the foreign address carry states such as
    /// `ESTABLISHED` and belong to clients.
    pub fn is_listening(&self) -> bool {
        self.state.eq_ignore_ascii_case(LISTEN_STATE)
            || self.state.eq_ignore_ascii_case("LISTENING")
    }
}

/// A pid seen by a discovery tool, before its name is looked up.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Listener {
    pub pid: u32,
    pub state: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KillOutcome {
    Success,
    Failed(String),
}

impl KillOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, KillOutcome::Success)
    }
}

/// Result of one best-effort kill of a direct child.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChildKill {
    pub pid: u32,
    pub outcome: KillOutcome,
}

/// What happened during one `terminate` call. `outcome` belongs to the
/// target pid and is the only status that decides success.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KillReport {
    pub pid: u32,
    pub children: Vec<ChildKill>,
    pub outcome: KillOutcome,
}

impl KillReport {
    pub fn success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match &self.outcome {
            KillOutcome::Success => None,
            KillOutcome::Failed(message) => Some(message.as_str()),
        }
    }

    pub fn children_killed(&self) -> usize {
        self.children
            .iter()
            .filter(|child| child.outcome.is_success())
            .count()
    }
}

#[derive(Clone, Debug)]
pub struct KillFeedback {
    pub message: String,
    pub severity: FeedbackSeverity,
}

impl KillFeedback {
    pub fn new(message: String, severity: FeedbackSeverity) -> Self {
        Self { message, severity }
    }

    pub fn info(message: String) -> Self {
        Self::new(message, FeedbackSeverity::Info)
    }

    pub fn warning(message: String) -> Self {
        Self::new(message, FeedbackSeverity::Warning)
    }

    pub fn error(message: String) -> Self {
        Self::new(message, FeedbackSeverity::Error)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FeedbackSeverity {
    Info,
    Warning,
    Error,
}

/// Parse operator input as a TCP port. Only plain ASCII digits in
/// `1..=65535` are accepted. Surrounding whitespace is trimmed first, so
/// text pasted from a terminal (`" 80 \n"`) is accepted; whitespace inside
/// the number is not.
pub fn parse_port(raw: &str) -> Result<u16> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        bail!("port must be a number, got {:?}", raw);
    }
    match raw.parse::<u16>() {
        Ok(0) => bail!("port must be between 1 and 65535, got 0"),
        Ok(port) => Ok(port),
        Err(_) => bail!("port must be between 1 and 65535, got {}", raw),
    }
}

/// Parse operator input as a pid. Only plain ASCII digits of a positive
/// value are accepted.
pub fn parse_pid(raw: &str) -> Result<u32> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        bail!("pid must be a number, got {:?}", raw);
    }
    match raw.parse::<u32>() {
        Ok(0) => bail!("pid must be positive, got 0"),
        Ok(pid) if pid <= MAX_PID => Ok(pid),
        Ok(_) | Err(_) => bail!("pid is out of range: {}", raw),
    }
}

/// Parse a pid column from tool output. Zero and garbage are dropped.
pub(crate) fn pid_from_column(column: &str) -> Option<u32> {
    match column.trim().parse::<u32>() {
        Ok(pid) if pid > 0 && pid <= MAX_PID => Some(pid),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_ports() {
        assert_eq!(parse_port("80").unwrap(), 80);
        assert_eq!(parse_port(" 54321 ").unwrap(), 54321);
        assert_eq!(parse_port("80\n").unwrap(), 80);
        assert_eq!(parse_port("65535").unwrap(), 65535);
    }

    #[test]
    fn rejects_invalid_ports() {
        for raw in ["", "abc", "0", "-1", "+80", "8o", "65536", "1.5", "8 0", " "] {
            assert!(parse_port(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn rejects_invalid_pids() {
        assert!(parse_pid("0").is_err());
        assert!(parse_pid("abc").is_err());
        assert!(parse_pid("99999999999").is_err());
        assert!(parse_pid("4294967295").is_err());
        assert_eq!(parse_pid("4242").unwrap(), 4242);
    }

    #[test]
    fn pid_columns_skip_idle_process() {
        assert_eq!(pid_from_column("0"), None);
        assert_eq!(pid_from_column("PID"), None);
        assert_eq!(pid_from_column("1234\r"), Some(1234));
    }

    #[test]
    fn only_listen_states_are_listening() {
        assert!(ProcessRecord::new(1, "nginx", "LISTEN").is_listening());
        assert!(ProcessRecord::new(2, "node.exe", "LISTENING").is_listening());
        assert!(!ProcessRecord::new(3, "chrome.exe", "ESTABLISHED").is_listening());
        assert!(!ProcessRecord::new(4, "curl.exe", "TIME_WAIT").is_listening());
    }

    #[test]
    fn report_exposes_final_outcome_only() {
        let report = KillReport {
            pid: 10,
            children: vec![ChildKill {
                pid: 11,
                outcome: KillOutcome::Failed("No such process".to_string()),
            }],
            outcome: KillOutcome::Success,
        };
        assert!(report.success());
        assert_eq!(report.diagnostic(), None);
        assert_eq!(report.children_killed(), 0);
    }
}
