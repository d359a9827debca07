//! Session report writer - step summaries and the final session report
//!
//! Step summaries are appended in JSONL format (one JSON object per line)
//! as each step finishes; the final report is written as a single JSON
//! document when the session ends.

use crate::domain::step::{SessionReport, StepSummary};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};

/// Writer for per-step summaries and the end-of-session report
pub struct ReportWriter {
    summaries_path: String,
    report_path: String,
}

impl ReportWriter {
    pub fn new(summaries_path: &str, report_path: &str) -> Self {
        info!(
            summaries = %summaries_path,
            report = %report_path,
            "report_writer_initialized"
        );
        Self {
            summaries_path: summaries_path.to_string(),
            report_path: report_path.to_string(),
        }
    }

    /// Append one step summary to the JSONL file
    /// Returns true if successful, false otherwise
    pub fn write_summary(&self, summary: &StepSummary) -> bool {
        let json = summary.to_json();

        match append_line(&self.summaries_path, &json) {
            Ok(()) => {
                info!(
                    sid = %summary.sid,
                    step = %summary.index,
                    outcome = %summary.outcome.as_str(),
                    det = %summary.detection_count,
                    "summary_written"
                );
                true
            }
            Err(e) => {
                error!(sid = %summary.sid, error = %e, "summary_write_failed");
                false
            }
        }
    }

    /// Write the final session report as one JSON document
    pub fn write_report(&self, report: &SessionReport) -> bool {
        let json = report.to_json();

        match write_whole(&self.report_path, &json) {
            Ok(()) => {
                info!(
                    session = %report.session_id,
                    completed = %report.completed_count(),
                    incomplete = %report.incomplete_count(),
                    "session_report_written"
                );
                true
            }
            Err(e) => {
                error!(session = %report.session_id, error = %e, "session_report_write_failed");
                false
            }
        }
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn append_line(file_path: &str, line: &str) -> std::io::Result<()> {
    let path = Path::new(file_path);
    ensure_parent(path)?;

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)?;
    debug!(file = %file_path, bytes = %line.len(), "summary_appended");
    Ok(())
}

fn write_whole(file_path: &str, content: &str) -> std::io::Result<()> {
    let path = Path::new(file_path);
    ensure_parent(path)?;
    std::fs::write(path, content)?;
    Ok(())
}
