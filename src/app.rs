use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::{Args, Commands};
use crate::config::{Config, load_or_create_config, load_or_create_config_at, validate_config};
use crate::model::{
    FeedbackSeverity, KillFeedback, KillOutcome, KillReport, ProcessRecord, parse_pid, parse_port,
};
use crate::platform::Capabilities;
use crate::process::{PortResolver, ProcessTerminator};
use crate::ui::table::{format_feedback, format_target_label, render_records};
use crate::utils::{CommandRunner, SystemRunner};

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;

/// Validated positional input of a subcommand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Request {
    Find { port: u16 },
    Kill { pid: u32, yes: bool },
    Free { port: u16, yes: bool },
}

fn parse_request(command: &Commands) -> Result<Request> {
    Ok(match command {
        Commands::Find { port } => Request::Find {
            port: parse_port(port)?,
        },
        Commands::Kill { pid, yes } => Request::Kill {
            pid: parse_pid(pid)?,
            yes: *yes,
        },
        Commands::Free { port, yes } => Request::Free {
            port: parse_port(port)?,
            yes: *yes,
        },
    })
}

pub fn run(args: Args) -> Result<ExitCode> {
    // Bad input must not touch the config file.
    let request = match parse_request(&args.command) {
        Ok(request) => request,
        Err(err) => return Ok(usage_error(err)),
    };
    let config = load_config(&args).context("failed to load configuration")?;

    let caps = Capabilities::probe_with(args.tool.unwrap_or(config.discovery.tool));
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new(config.command_timeout()));
    let resolver = PortResolver::new(caps, runner.clone());
    let terminator = ProcessTerminator::new(caps, runner);
    let confirm = config.termination.confirm;

    match request {
        Request::Find { port } => {
            println!("{}", render_records(port, &resolver.resolve(port)));
            Ok(ExitCode::SUCCESS)
        }
        Request::Kill { pid, yes } => {
            let label = format_target_label(None, pid);
            if confirm && !yes && !ask(&format!("Terminate {}?", label))? {
                println!("Aborted.");
                return Ok(ExitCode::SUCCESS);
            }
            let feedback = describe_kill(&label, &terminator.terminate(pid));
            print_feedback(&feedback);
            Ok(exit_for(feedback.severity))
        }
        Request::Free { port, yes } => {
            let feedback = free_port(&resolver, &terminator, port, confirm && !yes)?;
            Ok(exit_for(feedback.severity))
        }
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => load_or_create_config_at(path)?,
        None => load_or_create_config()?,
    };
    if let Some(timeout) = args.timeout {
        config.commands.timeout_secs = timeout;
    }
    validate_config(&config)?;
    Ok(config)
}

/// Terminate the listeners on `port`, then list what is still there.
/// Records in any other state are clients of the port and are left alone.
fn free_port(
    resolver: &PortResolver,
    terminator: &ProcessTerminator,
    port: u16,
    confirm: bool,
) -> Result<KillFeedback> {
    let records = resolver.resolve(port);
    println!("{}", render_records(port, &records));

    let (listeners, clients): (Vec<&ProcessRecord>, Vec<&ProcessRecord>) =
        records.iter().partition(|record| record.is_listening());
    if !clients.is_empty() {
        let skipped: Vec<String> = clients
            .iter()
            .map(|record| format!("{} ({})", record_label(record), record.state))
            .collect();
        println!(
            "Skipping {} client process(es) of port {}: {}",
            clients.len(),
            port,
            skipped.join(", ")
        );
    }
    if listeners.is_empty() {
        let feedback = KillFeedback::info(format!("No listener on port {} to terminate.", port));
        print_feedback(&feedback);
        return Ok(feedback);
    }
    if confirm && !ask(&format!("Terminate {} process(es)?", listeners.len()))? {
        let feedback = KillFeedback::info("Aborted.".to_string());
        print_feedback(&feedback);
        return Ok(feedback);
    }

    let results: Vec<(String, KillReport)> = listeners
        .iter()
        .map(|record| (record_label(record), terminator.terminate(record.pid)))
        .collect();
    let feedback = summarize_batch(&results);
    print_feedback(&feedback);

    // Refresh so the operator sees whether the port is actually free.
    println!("{}", render_records(port, &resolver.resolve(port)));
    Ok(feedback)
}

fn record_label(record: &ProcessRecord) -> String {
    let name = record.has_known_name().then_some(record.name.as_str());
    format_target_label(name, record.pid)
}

pub fn describe_kill(label: &str, report: &KillReport) -> KillFeedback {
    match &report.outcome {
        KillOutcome::Success if report.children.is_empty() => {
            KillFeedback::info(format!("Terminated {}.", label))
        }
        KillOutcome::Success => KillFeedback::info(format!(
            "Terminated {} and {} of {} child process(es).",
            label,
            report.children_killed(),
            report.children.len()
        )),
        KillOutcome::Failed(reason) => {
            KillFeedback::error(format!("Failed to terminate {}: {}", label, reason))
        }
    }
}

pub fn summarize_batch(results: &[(String, KillReport)]) -> KillFeedback {
    if results.is_empty() {
        return KillFeedback::info("No listeners to terminate.".to_string());
    }

    let successes = results.iter().filter(|(_, r)| r.success()).count();
    let failures: Vec<&(String, KillReport)> =
        results.iter().filter(|(_, r)| !r.success()).collect();

    let severity = if failures.is_empty() {
        FeedbackSeverity::Info
    } else if successes > 0 {
        FeedbackSeverity::Warning
    } else {
        FeedbackSeverity::Error
    };

    let mut parts = Vec::new();
    if successes > 0 {
        parts.push(format!("terminated {}", successes));
    }
    if !failures.is_empty() {
        parts.push(format!("{} failed", failures.len()));
    }

    let mut message = format!("Free port: {}.", parts.join(", "));
    if let Some((label, report)) = failures.first() {
        message.push_str(&format!(
            " First failure: {}: {}.",
            label,
            report.diagnostic().unwrap_or("unknown error")
        ));
    }
    KillFeedback::new(message, severity)
}

fn print_feedback(feedback: &KillFeedback) {
    match feedback.severity {
        FeedbackSeverity::Info => println!("{}", format_feedback(feedback)),
        _ => eprintln!("{}", format_feedback(feedback)),
    }
}

fn exit_for(severity: FeedbackSeverity) -> ExitCode {
    match severity {
        FeedbackSeverity::Info => ExitCode::SUCCESS,
        _ => ExitCode::from(EXIT_FAILURE),
    }
}

fn usage_error(err: anyhow::Error) -> ExitCode {
    eprintln!("error: {:#}", err);
    ExitCode::from(EXIT_USAGE)
}

/// Ask a yes/no question on stdin. Anything but `y`/`yes` is a no.
fn ask(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush().context("failed to flush stdout")?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read answer")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
