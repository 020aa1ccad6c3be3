use std::env;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use crossbeam_channel::Sender;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_STEP: Duration = Duration::from_millis(10);
// A grandchild that inherited a pipe can keep it open after the tool exits.
const PIPE_GRACE: Duration = Duration::from_millis(500);

/// Output of one finished tool invocation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Best human-readable reason for a failed invocation: stderr, then
    /// stdout, then the exit status.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs external tools. Resolver and terminator only talk to the host
/// through this trait.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Spawns real processes, each bounded by `timeout`.
///
/// Pipes are drained on detached reader threads. A grandchild that
/// inherits a pipe keeps its reader blocked until the grandchild exits;
/// `run` itself waits at most `PIPE_GRACE` for the readers once the tool
/// has exited (or been killed on timeout) and never joins them.
#[derive(Clone, Debug)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[derive(Clone, Copy, Debug)]
enum Stream {
    Stdout,
    Stderr,
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        log::trace!("running {} {}", program, args.join(" "));

        let mut child = hidden_command(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to execute {}", program))?;

        let (tx, rx) = crossbeam_channel::bounded(2);
        drain(child.stdout.take(), Stream::Stdout, tx.clone());
        drain(child.stderr.take(), Stream::Stderr, tx);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            let polled = child.try_wait();
            match polled {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(err).with_context(|| format!("failed to wait for {}", program));
                }
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                bail!("{} timed out after {:?}", program, self.timeout);
            }
            thread::sleep(POLL_STEP);
        };

        let mut output = CommandOutput {
            success: status.success(),
            code: status.code(),
            ..CommandOutput::default()
        };
        let grace = Instant::now() + PIPE_GRACE;
        let (mut got_stdout, mut got_stderr) = (false, false);
        while !(got_stdout && got_stderr) {
            // A stream that is already queued is still received after the deadline.
            match rx.recv_deadline(grace) {
                Ok((Stream::Stdout, text)) => {
                    output.stdout = text;
                    got_stdout = true;
                }
                Ok((Stream::Stderr, text)) => {
                    output.stderr = text;
                    got_stderr = true;
                }
                Err(_) => break,
            }
        }
        if !got_stderr {
            log::warn!("{} left stderr open after exiting; stderr dropped", program);
        }
        if !got_stdout {
            bail!("{} left stdout open after exiting; output is incomplete", program);
        }
        Ok(output)
    }
}

fn drain<R>(pipe: Option<R>, stream: Stream, tx: Sender<(Stream, String)>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send((stream, String::from_utf8_lossy(&buf).into_owned()));
    });
}

/// Build a command that does not flash a console window on Windows.
pub fn hidden_command(program: &str) -> Command {
    #[allow(unused_mut)]
    let mut command = Command::new(program);
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }
    command
}

/// Find an executable on PATH.
pub fn find_command(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| {
        candidate_names(name)
            .into_iter()
            .map(|candidate| dir.join(candidate))
            .find(|path| path.is_file())
    })
}

#[cfg(target_os = "windows")]
fn candidate_names(name: &str) -> Vec<String> {
    let exts = env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string());
    let mut names = vec![name.to_string()];
    names.extend(
        exts.split(';')
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!("{}{}", name, ext.to_lowercase())),
    );
    names
}

#[cfg(not(target_os = "windows"))]
fn candidate_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}
