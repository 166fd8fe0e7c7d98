use crate::api::auth::{self, AuthOutcome, AuthToken};
use crate::api::client::ApiClient;
use crate::api::fetchers::{self, UploadReport};
use crate::api::model::ExistingIds;
use crate::config::{SourceSelection, SyncSettings};
use crate::core::reconcile;
use crate::core::run_log::{self, RunLogEntry, RunOutcome};
use crate::core::stats::{self, RunStats, SourceStats, SourceStatus};
use crate::error::{AppError, AppResult};
use crate::io;
use crate::logging::{log, LogLevel};
use crate::utils;
use chrono::Utc;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub uploaded: usize,
    pub stats: RunStats,
}

/// Runs the whole sync once and appends the result to the run log, fatal errors included.
pub async fn run(settings: SyncSettings) -> AppResult<RunReport> {
    let overall_start_time = Instant::now();
    log(
        LogLevel::Step,
        &format!(
            "Starting Problem Sync at {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S %Z")
        ),
    );

    let mut run_stats = RunStats::new();

    match pipeline(&settings, &mut run_stats).await {
        Ok(()) => {
            let entry = RunLogEntry::from_stats(&run_stats);
            run_log::record(&settings.run_log_path, &entry).await;
            stats::print_summary(&run_stats, overall_start_time.elapsed());
            Ok(RunReport {
                outcome: entry.outcome,
                uploaded: entry.uploaded,
                stats: run_stats,
            })
        }
        Err(e) => {
            log(LogLevel::Error, &format!("Sync aborted: {}", e));
            run_log::record(&settings.run_log_path, &RunLogEntry::fatal(&run_stats, &e)).await;
            Err(e)
        }
    }
}

async fn pipeline(settings: &SyncSettings, run_stats: &mut RunStats) -> AppResult<()> {
    let client = Arc::new(ApiClient::new()?);

    log(LogLevel::Step, "--- Phase 1: Authentication ---");
    let outcome = auth::authenticate(&client, &settings.server).await?;
    match &outcome {
        AuthOutcome::Registered(_) => log(LogLevel::Info, "Authenticated via registration."),
        AuthOutcome::LoggedIn(_) => log(LogLevel::Info, "Authenticated via login."),
        AuthOutcome::Failed(_) => {}
    }
    let token = Arc::new(outcome.into_token()?);

    log(LogLevel::Step, "--- Phase 2: Inventory ---");
    let existing = Arc::new(
        fetchers::fetch_existing_ids(&client, &settings.server.problems_url(), &token).await?,
    );
    log(
        LogLevel::Info,
        &format!("Backend already stores {} problem(s).", existing.len()),
    );

    log(LogLevel::Step, "--- Phase 3: Fetch, Reconcile, Upload ---");
    match &settings.sources {
        SourceSelection::LocalFile(path) => {
            let label = path.display().to_string();
            let result = sync_local_file(&client, settings, &token, &existing, path).await;
            run_stats.insert(label.clone(), settle(&label, result));
        }
        SourceSelection::Categories(categories) => {
            sync_categories(&client, settings, &token, &existing, categories, run_stats).await;
        }
    }

    Ok(())
}

async fn sync_local_file(
    client: &ApiClient,
    settings: &SyncSettings,
    token: &AuthToken,
    existing: &ExistingIds,
    path: &Path,
) -> AppResult<SourceStats> {
    log(
        LogLevel::Info,
        &format!("Reading listing from local file '{}'", path.display()),
    );
    let records = io::read_listing_file(path).await?;
    let label = path.display().to_string();
    sync_records(
        client,
        &settings.server.bulk_url(),
        token,
        existing,
        &label,
        records,
    )
    .await
}

/// One task per category, at most `max_concurrency` at a time. A failing category
/// never cancels its siblings.
async fn sync_categories(
    client: &Arc<ApiClient>,
    settings: &SyncSettings,
    token: &Arc<AuthToken>,
    existing: &Arc<ExistingIds>,
    categories: &[String],
    run_stats: &mut RunStats,
) {
    log(
        LogLevel::Info,
        &format!(
            "Fetching {} categor(ies): {}",
            categories.len(),
            categories.join(", ")
        ),
    );

    let sem = Arc::new(Semaphore::new(settings.max_concurrency.max(1)));
    let bulk_url = settings.server.bulk_url();
    let mut tasks = JoinSet::new();

    for category in categories {
        run_stats.insert(category.clone(), SourceStats::default());

        let client_c = client.clone();
        let token_c = token.clone();
        let existing_c = existing.clone();
        let sem_c = sem.clone();
        let url = settings.category_url(category);
        let bulk_url_c = bulk_url.clone();
        let category_c = category.clone();

        tasks.spawn(async move {
            let result = async {
                let _permit = utils::acquire_semaphore(&sem_c, "Category Sync").await?;
                let records =
                    fetchers::fetch_category_listing(&client_c, &url, &category_c).await?;
                sync_records(
                    &client_c,
                    &bulk_url_c,
                    &token_c,
                    &existing_c,
                    &category_c,
                    records,
                )
                .await
            }
            .await;
            (category_c, result)
        });
    }

    while let Some(join_result) = tasks.join_next().await {
        match join_result {
            Ok((category, result)) => {
                let settled = settle(&category, result);
                run_stats.insert(category, settled);
            }
            Err(e) => {
                log(
                    LogLevel::Error,
                    &format!("Category sync task panicked: {}", AppError::from(e)),
                );
            }
        }
    }

    // Panicked tasks never report back.
    for (category, s) in run_stats.iter_mut() {
        if s.status == SourceStatus::Pending {
            log(
                LogLevel::Error,
                &format!("[{}] No result reported, marking as failed.", category),
            );
            s.status = SourceStatus::Failed;
        }
    }
}

fn settle(label: &str, result: AppResult<SourceStats>) -> SourceStats {
    match result {
        Ok(s) => s,
        Err(e) => {
            let kind = if e.is_transport() { "transport error" } else { "error" };
            log(
                LogLevel::Error,
                &format!("[{}] Sync failed with {}: {}", label, kind, e),
            );
            SourceStats {
                status: SourceStatus::Failed,
                ..Default::default()
            }
        }
    }
}

/// Reconciles one source's records and uploads the survivors in a single request.
async fn sync_records(
    client: &ApiClient,
    bulk_url: &str,
    token: &AuthToken,
    existing: &ExistingIds,
    label: &str,
    records: Option<Vec<Value>>,
) -> AppResult<SourceStats> {
    let Some(records) = records else {
        log(
            LogLevel::Warning,
            &format!("[{}] No question info could be gathered.", label),
        );
        return Ok(SourceStats {
            status: SourceStatus::NoData,
            ..Default::default()
        });
    };

    let reconciliation = reconcile::reconcile(&records, existing, label);
    let mut source_stats = SourceStats {
        fetched: records.len(),
        skipped: reconciliation.skipped(),
        ..Default::default()
    };
    log(
        LogLevel::Info,
        &format!(
            "[{}] {} fetched, {} already stored, {} new.",
            label,
            records.len(),
            reconciliation.skipped_existing,
            reconciliation.problems.len()
        ),
    );

    if reconciliation.problems.is_empty() {
        source_stats.status = SourceStatus::NothingNew;
        return Ok(source_stats);
    }

    let payload = reconciliation.into_payload();
    match fetchers::upload_problems(client, bulk_url, token, &payload, label).await? {
        UploadReport::Accepted(count) => {
            source_stats.status = SourceStatus::Uploaded;
            source_stats.uploaded = count;
        }
        UploadReport::Rejected(_) => {
            source_stats.status = SourceStatus::Rejected;
        }
    }
    Ok(source_stats)
}
