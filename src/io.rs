use crate::api::model::ListingResponse;
use crate::config;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

fn map_io_error(error: std::io::Error, path: &Path) -> AppError {
    AppError::Io(format!("I/O error at path '{}': {}", path.display(), error))
}

async fn write_file_async(fpath: &Path, data: &[u8]) -> AppResult<()> {
    let mut file = File::create(fpath)
        .await
        .map_err(|e| map_io_error(e, fpath))?;
    file.write_all(data)
        .await
        .map_err(|e| map_io_error(e, fpath))?;

    Ok(())
}

/// Raw records of a saved listing. `Ok(None)` when the file has no record collection.
pub async fn read_listing_file(path: &Path) -> AppResult<Option<Vec<Value>>> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| map_io_error(e, path))?;

    let listing: ListingResponse = serde_json::from_str(&content).map_err(|e| {
        log(
            LogLevel::Error,
            &format!("Listing file '{}' is not valid JSON: {}", path.display(), e),
        );
        AppError::from(e)
    })?;

    if listing.stat_status_pairs.is_none() {
        log(
            LogLevel::Warning,
            &format!(
                "Listing file '{}' has no '{}' collection.",
                path.display(),
                config::LISTING_COLLECTION_KEY
            ),
        );
    }
    Ok(listing.stat_status_pairs)
}

/// Puts the record collection and every problem on lines of their own. Only whitespace
/// is added, so the parsed value is unchanged.
pub fn reformat_listing(contents: &str) -> String {
    let contents = config::RE_LISTING_COLLECTION.replace_all(contents, "$0\n");
    config::RE_PROBLEM_START
        .replace_all(&contents, "\n$0")
        .into_owned()
}

/// Rewrites a pasted listing in place.
pub async fn reformat_listing_file(path: &Path) -> AppResult<()> {
    let contents = fs::read_to_string(path)
        .await
        .map_err(|e| map_io_error(e, path))?;

    let reformatted = reformat_listing(&contents);
    write_file_async(path, reformatted.as_bytes()).await?;

    log(
        LogLevel::Success,
        &format!(
            "Reformatted '{}' ({} problem line(s)).",
            path.display(),
            config::RE_PROBLEM_START.find_iter(&reformatted).count()
        ),
    );
    Ok(())
}

/// Appends `data` as a single JSON line, creating the file and its parent if needed.
pub async fn append_json_line<T>(path: &Path, data: &T) -> AppResult<()>
where
    T: Serialize + ?Sized,
{
    let mut line = serde_json::to_string(data).map_err(AppError::from)?;
    line.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| map_io_error(e, parent))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| map_io_error(e, path))?;
    file.write_all(line.as_bytes())
        .await
        .map_err(|e| map_io_error(e, path))?;
    file.flush().await.map_err(|e| map_io_error(e, path))?;
    Ok(())
}

pub async fn read_lines_if_exists(path: &Path) -> AppResult<Vec<String>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| map_io_error(e, path))?;
    Ok(content.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASTED: &str = r#"{"user_name":"","num_solved":0,"stat_status_pairs":[{"stat":{"question_id":2,"question__title":"Add Two Numbers","question__title_slug":"add-two-numbers"},"difficulty":{"level":2},"paid_only":false},{"stat":{"question_id":1,"question__title":"Two Sum {\"stat\":","question__title_slug":"two-sum"},"difficulty":{"level":1},"paid_only":false}],"category_slug":"algorithms"}"#;

    #[test]
    fn reformat_breaks_lines_before_each_problem() {
        let out = reformat_listing(PASTED);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with(r#""stat_status_pairs":"#));
        assert_eq!(lines[1], "[");
        assert!(lines[2].starts_with(r#"{"stat":"#));
        assert!(lines[3].starts_with(r#"{"stat":"#));
    }

    #[test]
    fn reformat_preserves_parsed_value() {
        let before: Value = serde_json::from_str(PASTED).unwrap();
        let after: Value = serde_json::from_str(&reformat_listing(PASTED)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn reformat_leaves_unrelated_text_alone() {
        assert_eq!(reformat_listing(r#"{"a":1}"#), r#"{"a":1}"#);
    }
}
