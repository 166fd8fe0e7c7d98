use crate::error::{AppError, AppResult};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_LISTING_BASE_URL: &str = "https://leetcode.com/api/problems";
pub const DEFAULT_RUN_LOG_PATH: &str = "./sync_run_log.jsonl";

/// Upper bound on category tasks running at once.
pub const MAX_SOURCE_CONCUR: usize = 4;

pub const SUPPORTED_CATEGORIES: [&str; 4] = ["algorithms", "database", "shell", "concurrency"];

pub const PLACEHOLDER_PROBLEM_TEXT: &str = "No text yet.";

pub const LISTING_COLLECTION_KEY: &str = "stat_status_pairs";
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

pub const ENV_SERVER_BASE_URL: &str = "SERVER_BASE_URL";
pub const ENV_SERVER_PORT: &str = "SERVER_PORT";
pub const ENV_TEST_SERVER_PORT: &str = "TEST_SERVER_PORT";
pub const ENV_ADMIN_EMAIL: &str = "ADMIN_EMAIL";
pub const ENV_ADMIN_PASS: &str = "ADMIN_PASS";
pub const ENV_ADMIN_NAME: &str = "ADMIN_NAME";
pub const ENV_LISTING_API_URL: &str = "LISTING_API_URL";

pub static BASE_HEADERS: Lazy<HeaderMap> = Lazy::new(|| {
    let mut h = HeaderMap::new();
    h.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("problem_sync/", env!("CARGO_PKG_VERSION"))),
    );
    h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    h.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    h
});

pub static RE_LISTING_COLLECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""stat_status_pairs":"#).unwrap());
pub static RE_PROBLEM_START: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\{"stat":"#).unwrap());

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Admin backend location and login, as read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub base_url: String,
    pub port: String,
    pub credentials: Credentials,
}

impl ServerConfig {
    pub fn from_env(use_test_port: bool) -> AppResult<Self> {
        let port_var = if use_test_port {
            ENV_TEST_SERVER_PORT
        } else {
            ENV_SERVER_PORT
        };

        Ok(ServerConfig {
            base_url: require_env(ENV_SERVER_BASE_URL)?,
            port: require_env(port_var)?,
            credentials: Credentials {
                name: require_env(ENV_ADMIN_NAME)?,
                email: require_env(ENV_ADMIN_EMAIL)?,
                password: require_env(ENV_ADMIN_PASS)?,
            },
        })
    }

    pub fn server_url(&self) -> String {
        format!("{}:{}", self.base_url.trim_end_matches('/'), self.port)
    }

    pub fn login_url(&self) -> String {
        format!("{}/api/auth", self.server_url())
    }

    pub fn register_url(&self) -> String {
        format!("{}/api/users", self.server_url())
    }

    pub fn problems_url(&self) -> String {
        format!("{}/api/problems", self.server_url())
    }

    pub fn bulk_url(&self) -> String {
        format!("{}/api/problems/bulk", self.server_url())
    }
}

fn require_env(key: &str) -> AppResult<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        Ok(_) => Err(AppError::ConfigError(format!(
            "Environment variable {} is empty",
            key
        ))),
        Err(_) => Err(AppError::ConfigError(format!(
            "Environment variable {} is not set",
            key
        ))),
    }
}

pub fn listing_base_from_env() -> String {
    std::env::var(ENV_LISTING_API_URL)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_LISTING_BASE_URL.to_string())
}

/// Where the raw listings for a run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    LocalFile(PathBuf),
    Categories(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub server: ServerConfig,
    pub listing_base_url: String,
    pub sources: SourceSelection,
    pub run_log_path: PathBuf,
    pub max_concurrency: usize,
}

impl SyncSettings {
    pub fn category_url(&self, category: &str) -> String {
        format!(
            "{}/{}/",
            self.listing_base_url.trim_end_matches('/'),
            category
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> ServerConfig {
        ServerConfig {
            base_url: "http://localhost/".to_string(),
            port: "5000".to_string(),
            credentials: Credentials {
                name: "admin".to_string(),
                email: "admin@example.com".to_string(),
                password: "hunter2".to_string(),
            },
        }
    }

    #[test]
    fn derives_backend_endpoints() {
        let s = server();
        assert_eq!(s.login_url(), "http://localhost:5000/api/auth");
        assert_eq!(s.register_url(), "http://localhost:5000/api/users");
        assert_eq!(s.problems_url(), "http://localhost:5000/api/problems");
        assert_eq!(s.bulk_url(), "http://localhost:5000/api/problems/bulk");
    }

    #[test]
    fn category_url_has_one_segment_per_category() {
        let settings = SyncSettings {
            server: server(),
            listing_base_url: "https://leetcode.com/api/problems/".to_string(),
            sources: SourceSelection::Categories(vec!["shell".to_string()]),
            run_log_path: PathBuf::from(DEFAULT_RUN_LOG_PATH),
            max_concurrency: MAX_SOURCE_CONCUR,
        };
        assert_eq!(
            settings.category_url("shell"),
            "https://leetcode.com/api/problems/shell/"
        );
    }
}
