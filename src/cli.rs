use crate::config::{self, SourceSelection};
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Syncs LeetCode problem metadata into the study tracker backend.",
    long_about = None,
    after_help = format!("Supported categories:\n    all, {}", config::SUPPORTED_CATEGORIES.join(", "))
)]
pub struct CliArgs {
    #[arg(
        value_name = "FILE_PATH",
        help = "Local listing JSON to use instead of fetching (single pass, no fan-out)"
    )]
    file: Option<String>,

    #[arg(
        short, long,
        help = "Use TEST_SERVER_PORT instead of SERVER_PORT"
    )]
    test_server: bool,

    #[arg(
        short, long,
        num_args = 1..,
        value_delimiter = ' ',
        default_value = "all",
        conflicts_with = "file",
        help = "Listing categories to fetch (e.g., algorithms shell) or 'all'"
    )]
    categories: Vec<String>,

    #[arg(
        long,
        default_value = config::DEFAULT_RUN_LOG_PATH,
        value_name = "FILE_PATH",
        help = "Append-only run log file"
    )]
    run_log: String,

    #[arg(
        long,
        value_name = "FILE_PATH",
        help = "Reformat a pasted listing file in place (one problem per line) and exit",
        conflicts_with_all = ["file", "test_server", "categories"]
    )]
    reformat: Option<String>,
}

impl CliArgs {
    pub fn use_test_server(&self) -> bool {
        self.test_server
    }

    pub fn get_run_log(&self) -> PathBuf {
        PathBuf::from(&self.run_log)
    }

    pub fn get_reformat_file(&self) -> Option<PathBuf> {
        self.reformat.as_deref().map(PathBuf::from)
    }

    pub fn get_sources(&self) -> AppResult<SourceSelection> {
        if let Some(path) = &self.file {
            return Ok(SourceSelection::LocalFile(PathBuf::from(path)));
        }
        Ok(SourceSelection::Categories(resolve_categories(
            &self.categories,
        )?))
    }
}

/// Lower-cases, de-duplicates and validates category names. `all` expands to every
/// supported category.
pub fn resolve_categories(inputs: &[String]) -> AppResult<Vec<String>> {
    let mut requested: Vec<String> = inputs
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    requested.sort_unstable();
    requested.dedup();

    if requested.is_empty() {
        return Err(AppError::Argument(
            "No categories specified. Use -c or --categories (e.g., 'algorithms', 'all').".into(),
        ));
    }

    if requested.iter().any(|c| c == "all") {
        log(LogLevel::Info, "Syncing all supported categories.");
        return Ok(config::SUPPORTED_CATEGORIES
            .iter()
            .map(|c| c.to_string())
            .collect());
    }

    let (valid, invalid): (Vec<String>, Vec<String>) = requested
        .into_iter()
        .partition(|c| config::SUPPORTED_CATEGORIES.contains(&c.as_str()));

    if !invalid.is_empty() {
        log(
            LogLevel::Warning,
            &format!("Ignoring unsupported categories: {}", invalid.join(", ")),
        );
    }

    if valid.is_empty() {
        return Err(AppError::Argument(
            "No *valid* supported categories specified.".into(),
        ));
    }

    log(
        LogLevel::Info,
        &format!("Syncing specified categories: {}", valid.join(", ")),
    );
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn all_expands_to_supported_categories() {
        let cats = resolve_categories(&strings(&["ALL"])).unwrap();
        assert_eq!(cats.len(), config::SUPPORTED_CATEGORIES.len());
    }

    #[test]
    fn unknown_categories_are_dropped() {
        let cats = resolve_categories(&strings(&["Shell", "graphs", "shell"])).unwrap();
        assert_eq!(cats, strings(&["shell"]));

        assert!(matches!(
            resolve_categories(&strings(&["graphs"])),
            Err(AppError::Argument(_))
        ));
    }

    #[test]
    fn file_argument_selects_local_mode() {
        let args = CliArgs::try_parse_from(["problem_sync", "apiresults.json", "-t"]).unwrap();
        assert!(args.use_test_server());
        assert_eq!(
            args.get_sources().unwrap(),
            SourceSelection::LocalFile(PathBuf::from("apiresults.json"))
        );
    }

    #[test]
    fn reformat_conflicts_with_sync_options() {
        assert!(CliArgs::try_parse_from(["problem_sync", "--reformat", "a.json", "b.json"]).is_err());
        let args = CliArgs::try_parse_from(["problem_sync", "--reformat", "a.json"]).unwrap();
        assert_eq!(args.get_reformat_file(), Some(PathBuf::from("a.json")));
    }
}
