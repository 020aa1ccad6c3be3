//! Windows port scanning using netstat, names via tasklist

use crate::model::{Listener, pid_from_column};
use crate::utils::CommandRunner;

pub const NETSTAT: &str = "netstat";
pub const TASKLIST: &str = "tasklist";

/// Run `netstat -ano` and return every row that mentions `port`.
pub fn scan_port(runner: &dyn CommandRunner, port: u16) -> Vec<Listener> {
    let output = match runner.run(NETSTAT, &["-ano"]) {
        Ok(out) => out,
        Err(err) => {
            log::warn!("netstat unavailable: {:#}", err);
            return Vec::new();
        }
    };
    if !output.success {
        log::warn!("netstat failed: {}", output.diagnostic());
    }
    parse_netstat(&output.stdout, port)
}

/// Parse lines like:
/// `TCP    0.0.0.0:3000    0.0.0.0:0    LISTENING    1234`
///
/// Matching is on the literal `:<port> ` so that 80 never matches 8080.
/// UDP rows have no state column and are skipped.
pub fn parse_netstat(stdout: &str, port: u16) -> Vec<Listener> {
    let needle = format!(":{} ", port);
    stdout
        .lines()
        .filter(|line| line.contains(&needle))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 5 {
                return None;
            }
            let pid = pid_from_column(parts[parts.len() - 1])?;
            Some(Listener {
                pid,
                state: parts[3].to_string(),
            })
        })
        .collect()
}

/// Look up the image name of `pid`. `None` when the process is gone.
pub fn lookup_name(runner: &dyn CommandRunner, pid: u32) -> Option<String> {
    let filter = format!("PID eq {}", pid);
    match runner.run(TASKLIST, &["/FI", &filter, "/FO", "CSV", "/NH"]) {
        Ok(out) if out.success => parse_tasklist(&out.stdout),
        Ok(out) => {
            log::debug!("tasklist failed for PID {}: {}", pid, out.diagnostic());
            None
        }
        Err(err) => {
            log::debug!("tasklist unavailable: {:#}", err);
            None
        }
    }
}

/// Parse `"node.exe","1234","Console","1","45,000 K"`. tasklist prints an
/// `INFO:` line instead when no task matches.
pub fn parse_tasklist(stdout: &str) -> Option<String> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    if line.starts_with("INFO:") {
        return None;
    }
    let name = match line.strip_prefix('"') {
        Some(rest) => rest.split('"').next()?,
        None => line.split(',').next()?,
    };
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
