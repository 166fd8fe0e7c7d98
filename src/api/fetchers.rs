use super::auth::AuthToken;
use super::client::ApiClient;
use super::model::{self, ExistingIds, ListingResponse};
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::model::problem::BulkPayload;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::HashSet;

const INVENTORY_LABEL: &str = "inventory";

/// Outcome of a bulk POST that reached the backend and returned JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadReport {
    Accepted(usize),
    /// The backend reported errors. Partial failure, not an `Err`.
    Rejected(Vec<Value>),
}

/// Ids of every problem the backend already stores.
///
/// Only transport failures are errors. A body that is not a JSON array of problems is
/// treated as "nothing stored yet".
pub async fn fetch_existing_ids(
    client: &ApiClient,
    problems_url: &str,
    token: &AuthToken,
) -> AppResult<ExistingIds> {
    let raw = client
        .send::<()>(Method::GET, problems_url, Some(token), None, INVENTORY_LABEL)
        .await
        .map_err(|e| {
            log(
                LogLevel::Error,
                &format!("Couldn't get all problems from the server ({}): {}", problems_url, e),
            );
            e
        })?;

    if !raw.status.is_success() {
        log(
            LogLevel::Warning,
            &format!(
                "Inventory request returned HTTP {}. Treating as empty. Body: '{}'",
                raw.status,
                raw.snippet(150)
            ),
        );
        return Ok(HashSet::new());
    }

    let value: Value = match serde_json::from_slice(&raw.body) {
        Ok(v) => v,
        Err(e) => {
            log(
                LogLevel::Warning,
                &format!("Inventory response is not JSON ({}). Treating as empty.", e),
            );
            return Ok(HashSet::new());
        }
    };

    if !value.is_array() {
        log(
            LogLevel::Warning,
            "Inventory response is not a list of problems. Treating as empty.",
        );
    }

    Ok(model::existing_ids_from_value(&value))
}

/// Raw records of one category. `Ok(None)` when the listing has no record collection.
pub async fn fetch_category_listing(
    client: &ApiClient,
    url: &str,
    category: &str,
) -> AppResult<Option<Vec<Value>>> {
    let ctx = format!("Listing [{}]", category);

    match client.fetch::<ListingResponse>(url, None, category).await {
        Ok(listing) => {
            if listing.stat_status_pairs.is_none() {
                log(
                    LogLevel::Warning,
                    &format!("{} - Response has no problem collection.", ctx),
                );
            }
            Ok(listing.stat_status_pairs)
        }
        Err(e) => {
            log(LogLevel::Warning, &format!("{} - Fetch FAIL: {:?}", ctx, e));
            Err(e)
        }
    }
}

/// Posts the whole batch in one request.
pub async fn upload_problems(
    client: &ApiClient,
    bulk_url: &str,
    token: &AuthToken,
    payload: &BulkPayload,
    source_label: &str,
) -> AppResult<UploadReport> {
    let ctx = format!("Bulk Upload [{}]", source_label);
    let count = payload.problems.len();

    let raw = client
        .send(Method::POST, bulk_url, Some(token), Some(payload), source_label)
        .await
        .map_err(|e| {
            log(
                LogLevel::Error,
                &format!("{} - Unable to POST problems to {}: {}", ctx, bulk_url, e),
            );
            e
        })?;

    if raw.body.iter().all(u8::is_ascii_whitespace) {
        if raw.status.is_success() {
            return Ok(UploadReport::Accepted(count));
        }
        return Err(AppError::response_invalid(
            format!("Empty body with HTTP {}", raw.status),
            bulk_url,
            source_label,
        ));
    }

    let value: Value = ApiClient::decode(&raw, bulk_url, source_label)?;

    if let Some(errors) = model::bulk_errors_from_value(&value) {
        log(
            LogLevel::Error,
            &format!(
                "{} - Errors when adding problems in bulk: {}",
                ctx,
                Value::Array(errors.clone())
            ),
        );
        return Ok(UploadReport::Rejected(errors));
    }

    if !raw.status.is_success() {
        let synthetic = json!({
            "status": raw.status.as_u16(),
            "msg": raw.snippet(150),
        });
        log(
            LogLevel::Error,
            &format!("{} - Backend answered HTTP {}: {}", ctx, raw.status, synthetic),
        );
        return Ok(UploadReport::Rejected(vec![synthetic]));
    }

    log(
        LogLevel::Success,
        &format!("{} - Backend accepted {} problem(s).", ctx, count),
    );
    Ok(UploadReport::Accepted(count))
}
