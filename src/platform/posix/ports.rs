//! POSIX port scanning using lsof, with ss as fallback

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{LISTEN_STATE, Listener, pid_from_column};
use crate::utils::CommandRunner;

pub const LSOF: &str = "lsof";
pub const SS: &str = "ss";
pub const PS: &str = "ps";

static SS_PID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"pid=(\d+)").unwrap());

pub fn scan_port_lsof(runner: &dyn CommandRunner, port: u16) -> Vec<Listener> {
    let filter = format!("-iTCP:{}", port);
    match runner.run(LSOF, &["-nP", &filter, "-sTCP:LISTEN"]) {
        // lsof exits 1 with no output when nothing matches
        Ok(out) => parse_lsof(&out.stdout),
        Err(err) => {
            log::warn!("lsof unavailable: {:#}", err);
            Vec::new()
        }
    }
}

/// Parse lsof's default table. The first line is the header; the second
/// column is the pid.
///
/// ```text
/// COMMAND   PID USER   FD   TYPE DEVICE SIZE/OFF NODE NAME
/// node    51234 dev    23u  IPv6 0x1234      0t0  TCP *:3000 (LISTEN)
/// ```
pub fn parse_lsof(stdout: &str) -> Vec<Listener> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let pid = pid_from_column(line.split_whitespace().nth(1)?)?;
            Some(Listener {
                pid,
                state: LISTEN_STATE.to_string(),
            })
        })
        .collect()
}

pub fn scan_port_ss(runner: &dyn CommandRunner, port: u16) -> Vec<Listener> {
    match runner.run(SS, &["-ltnp"]) {
        Ok(out) => {
            if !out.success {
                log::warn!("ss failed: {}", out.diagnostic());
            }
            parse_ss(&out.stdout, port)
        }
        Err(err) => {
            log::warn!("ss unavailable: {:#}", err);
            Vec::new()
        }
    }
}

/// Parse `ss -ltnp`. A socket shared by several processes lists each of
/// them as `pid=<n>` inside `users:(...)`.
pub fn parse_ss(stdout: &str, port: u16) -> Vec<Listener> {
    let needle = format!(":{} ", port);
    stdout
        .lines()
        .filter(|line| line.contains(&needle))
        .flat_map(|line| SS_PID_RE.captures_iter(line))
        .filter_map(|caps| pid_from_column(&caps[1]))
        .map(|pid| Listener {
            pid,
            state: LISTEN_STATE.to_string(),
        })
        .collect()
}

/// Look up the command name of `pid` with ps. `None` when the process is
/// gone or ps cannot run.
pub fn lookup_name(runner: &dyn CommandRunner, pid: u32) -> Option<String> {
    let pid_arg = pid.to_string();
    match runner.run(PS, &["-p", &pid_arg, "-o", "comm="]) {
        Ok(out) if out.success => out
            .stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string),
        Ok(_) => None,
        Err(err) => {
            log::debug!("ps unavailable: {:#}", err);
            None
        }
    }
}
