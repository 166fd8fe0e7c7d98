use crate::core::stats::{self, RunStats};
use crate::error::{AppError, AppResult};
use crate::io;
use crate::logging::{log, LogLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Failed,
    NoData,
}

impl RunOutcome {
    pub fn from_stats(stats: &RunStats) -> RunOutcome {
        if stats::any_failure(stats) {
            RunOutcome::Failed
        } else if stats.values().any(|s| s.status.has_data()) {
            RunOutcome::Success
        } else {
            RunOutcome::NoData
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Success | RunOutcome::NoData => 0,
            RunOutcome::Failed => 1,
        }
    }
}

/// One line of the append-only run log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunLogEntry {
    pub timestamp: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub uploaded: usize,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub failed_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunLogEntry {
    pub fn from_stats(stats: &RunStats) -> Self {
        RunLogEntry {
            timestamp: Utc::now(),
            outcome: RunOutcome::from_stats(stats),
            uploaded: stats::total_uploaded(stats),
            sources: stats.keys().cloned().collect(),
            failed_sources: stats::failed_sources(stats),
            error: None,
        }
    }

    /// Entry for a run that stopped before or during the fan-out.
    pub fn fatal(stats: &RunStats, error: &AppError) -> Self {
        RunLogEntry {
            outcome: RunOutcome::Failed,
            error: Some(error.to_string()),
            ..Self::from_stats(stats)
        }
    }
}

/// Appends the entry. Failing to write is logged, never returned.
pub async fn record(path: &Path, entry: &RunLogEntry) {
    match io::append_json_line(path, entry).await {
        Ok(()) => log(
            LogLevel::Info,
            &format!(
                "Run log updated ({:?}) at {}",
                entry.outcome,
                path.display()
            ),
        ),
        Err(e) => log(
            LogLevel::Error,
            &format!("Couldn't write run log {}: {}", path.display(), e),
        ),
    }
}

/// All entries in file order. Unparseable lines are skipped. A missing file is empty.
pub async fn read_entries(path: &Path) -> AppResult<Vec<RunLogEntry>> {
    let lines = io::read_lines_if_exists(path).await?;
    Ok(lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect())
}

pub fn last_run(entries: &[RunLogEntry]) -> Option<DateTime<Utc>> {
    entries.last().map(|e| e.timestamp)
}

/// Timestamp of the latest fully successful run.
pub fn last_success(entries: &[RunLogEntry]) -> Option<DateTime<Utc>> {
    entries
        .iter()
        .rev()
        .find(|e| e.outcome == RunOutcome::Success)
        .map(|e| e.timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stats::{SourceStats, SourceStatus};

    fn stats_of(pairs: &[(&str, SourceStatus, usize)]) -> RunStats {
        pairs
            .iter()
            .map(|(name, status, uploaded)| {
                (
                    name.to_string(),
                    SourceStats {
                        status: *status,
                        uploaded: *uploaded,
                        ..Default::default()
                    },
                )
            })
            .collect()
    }

    #[test]
    fn outcome_from_stats() {
        let ok = stats_of(&[
            ("algorithms", SourceStatus::Uploaded, 2),
            ("shell", SourceStatus::NothingNew, 0),
        ]);
        assert_eq!(RunOutcome::from_stats(&ok), RunOutcome::Success);

        let partial = stats_of(&[
            ("algorithms", SourceStatus::Uploaded, 2),
            ("shell", SourceStatus::Failed, 0),
        ]);
        assert_eq!(RunOutcome::from_stats(&partial), RunOutcome::Failed);

        let empty = stats_of(&[("shell", SourceStatus::NoData, 0)]);
        assert_eq!(RunOutcome::from_stats(&empty), RunOutcome::NoData);
        assert_eq!(RunOutcome::from_stats(&RunStats::new()), RunOutcome::NoData);
    }

    #[test]
    fn entry_serializes_as_snake_case_line() {
        let stats = stats_of(&[
            ("algorithms", SourceStatus::Uploaded, 4),
            ("shell", SourceStatus::Failed, 0),
        ]);
        let entry = RunLogEntry::from_stats(&stats);
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["outcome"], "failed");
        assert_eq!(value["uploaded"], 4);
        assert_eq!(value["failed_sources"], serde_json::json!(["shell"]));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn last_success_skips_failed_runs() {
        let base = Utc::now();
        let mk = |secs: i64, outcome| RunLogEntry {
            timestamp: base + chrono::Duration::seconds(secs),
            outcome,
            uploaded: 0,
            sources: vec![],
            failed_sources: vec![],
            error: None,
        };
        let entries = vec![
            mk(0, RunOutcome::Success),
            mk(10, RunOutcome::Failed),
            mk(20, RunOutcome::NoData),
        ];

        assert_eq!(last_run(&entries), Some(entries[2].timestamp));
        assert_eq!(last_success(&entries), Some(entries[0].timestamp));
        assert_eq!(last_success(&entries[1..]), None);
    }
}
