use crate::logging::{log, LogLevel};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceStatus {
    #[default]
    Pending,
    Uploaded,
    NothingNew,
    NoData,
    Rejected,
    Failed,
}

impl SourceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SourceStatus::Pending => "pending",
            SourceStatus::Uploaded => "uploaded",
            SourceStatus::NothingNew => "nothing new",
            SourceStatus::NoData => "no data",
            SourceStatus::Rejected => "rejected",
            SourceStatus::Failed => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SourceStatus::Rejected | SourceStatus::Failed)
    }

    pub fn has_data(&self) -> bool {
        matches!(
            self,
            SourceStatus::Uploaded | SourceStatus::NothingNew | SourceStatus::Rejected
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceStats {
    pub status: SourceStatus,
    pub fetched: usize,
    pub uploaded: usize,
    pub skipped: usize,
}

/// Keyed by category name or local file path.
pub type RunStats = BTreeMap<String, SourceStats>;

pub fn total_uploaded(stats: &RunStats) -> usize {
    stats.values().map(|s| s.uploaded).sum()
}

pub fn any_failure(stats: &RunStats) -> bool {
    stats.values().any(|s| s.status.is_failure())
}

pub fn failed_sources(stats: &RunStats) -> Vec<String> {
    stats
        .iter()
        .filter(|(_, s)| s.status.is_failure())
        .map(|(name, _)| name.clone())
        .collect()
}

pub fn print_summary(stats: &RunStats, duration: Duration) {
    let sep = "=".repeat(64);
    let title = format!("Sync Summary ({} Source(s))", stats.len());
    println!("\n{}\n{:^64}\n{}", sep, title, sep);
    println!("Total Run Time:    {:.3?}", duration);
    println!("{}", "-".repeat(64));
    println!(
        "{:<22} {:<13} {:<9} {:<9} {:<9}",
        "Source", "Status", "Fetched", "Skipped", "Uploaded"
    );
    println!("{}", "-".repeat(64));

    for (name, s) in stats {
        println!(
            "{:<22} {:<13} {:<9} {:<9} {:<9}",
            name,
            s.status.label(),
            s.fetched,
            s.skipped,
            s.uploaded
        );
    }

    println!("{}", "-".repeat(64));
    println!(
        "{:<22} {:<13} {:<9} {:<9} {:<9}",
        "TOTALS",
        "",
        stats.values().map(|s| s.fetched).sum::<usize>(),
        stats.values().map(|s| s.skipped).sum::<usize>(),
        total_uploaded(stats)
    );
    println!("{}", sep);

    let failed = failed_sources(stats);
    if !failed.is_empty() {
        log(
            LogLevel::Error,
            &format!(
                "Run completed with errors in {} source(s): {}. Check logs.",
                failed.len(),
                failed.join(", ")
            ),
        );
    } else if stats.values().all(|s| !s.status.has_data()) {
        log(
            LogLevel::Warning,
            "Run completed, but no problem data could be gathered.",
        );
    } else {
        log(LogLevel::Success, "Run completed successfully.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_status(status: SourceStatus, uploaded: usize) -> SourceStats {
        SourceStats {
            status,
            uploaded,
            ..Default::default()
        }
    }

    #[test]
    fn failures_and_totals() {
        let mut stats = RunStats::new();
        stats.insert("algorithms".into(), with_status(SourceStatus::Uploaded, 3));
        stats.insert("shell".into(), with_status(SourceStatus::Failed, 0));
        stats.insert("database".into(), with_status(SourceStatus::Rejected, 0));

        assert!(any_failure(&stats));
        assert_eq!(total_uploaded(&stats), 3);
        assert_eq!(failed_sources(&stats), vec!["database", "shell"]);
    }

    #[test]
    fn no_data_is_not_a_failure() {
        let mut stats = RunStats::new();
        stats.insert("shell".into(), with_status(SourceStatus::NoData, 0));
        assert!(!any_failure(&stats));
        assert!(!SourceStatus::NoData.has_data());
    }
}
