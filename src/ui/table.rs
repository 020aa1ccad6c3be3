use crate::model::{FeedbackSeverity, KillFeedback, ProcessRecord};

const PID_HEADER: &str = "PID";
const NAME_HEADER: &str = "NAME";
const STATE_HEADER: &str = "STATE";

/// Render the records found on `port` as an aligned table.
pub fn render_records(port: u16, records: &[ProcessRecord]) -> String {
    if records.is_empty() {
        return format!("No process is listening on port {}.", port);
    }

    let pid_width = records
        .iter()
        .map(|r| r.pid.to_string().len())
        .chain([PID_HEADER.len()])
        .max()
        .unwrap_or(PID_HEADER.len());
    let name_width = records
        .iter()
        .map(|r| r.name.chars().count())
        .chain([NAME_HEADER.len()])
        .max()
        .unwrap_or(NAME_HEADER.len());

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(format!(
        "{:<pid_width$}  {:<name_width$}  {}",
        PID_HEADER, NAME_HEADER, STATE_HEADER
    ));
    for record in records {
        lines.push(format!(
            "{:<pid_width$}  {:<name_width$}  {}",
            record.pid, record.name, record.state
        ));
    }
    lines.join("\n")
}

pub fn format_target_label(name: Option<&str>, pid: u32) -> String {
    match name {
        Some(name) if !name.is_empty() => format!("{} (PID {})", name, pid),
        _ => format!("PID {}", pid),
    }
}

pub fn format_feedback(feedback: &KillFeedback) -> String {
    let prefix = match feedback.severity {
        FeedbackSeverity::Info => "",
        FeedbackSeverity::Warning => "warning: ",
        FeedbackSeverity::Error => "error: ",
    };
    format!("{}{}", prefix, feedback.message)
}
