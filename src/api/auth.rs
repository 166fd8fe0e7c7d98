use super::client::ApiClient;
use super::model::AuthResponse;
use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use reqwest::Method;
use std::fmt;

const AUTH_LABEL: &str = "auth";

/// Bearer token for the admin backend. Held in memory for one run only.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new<S: Into<String>>(token: S) -> Self {
        AuthToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Registration created the admin and handed back a token (first run).
    Registered(AuthToken),
    LoggedIn(AuthToken),
    Failed(String),
}

impl AuthOutcome {
    pub fn into_token(self) -> AppResult<AuthToken> {
        match self {
            AuthOutcome::Registered(t) | AuthOutcome::LoggedIn(t) => Ok(t),
            AuthOutcome::Failed(reason) => Err(AppError::AuthFailed(reason)),
        }
    }
}

/// Tries registration first and falls back to login with the same credentials.
///
/// Status codes are not interpreted: the backend rejects a second registration with
/// a 400 and an `errors` list, which is the normal way into the login step. Transport
/// and decode failures at either step are returned as errors.
pub async fn authenticate(client: &ApiClient, server: &ServerConfig) -> AppResult<AuthOutcome> {
    let register_url = server.register_url();
    let register = post_credentials(client, server, &register_url, "Register").await?;

    if let Some(token) = register.token() {
        log(LogLevel::Info, "Registered admin user and received a token.");
        return Ok(AuthOutcome::Registered(AuthToken::new(token)));
    }

    let login_url = server.login_url();
    let login = post_credentials(client, server, &login_url, "Login").await?;

    match login.token() {
        Some(token) => {
            log(LogLevel::Info, "Logged in as admin user.");
            Ok(AuthOutcome::LoggedIn(AuthToken::new(token)))
        }
        None => {
            let messages = login.error_messages();
            let reason = if messages.is_empty() {
                "No token received. Wrong credentials?".to_string()
            } else {
                format!(
                    "No token received. Wrong credentials? Backend said: {}",
                    messages.join("; ")
                )
            };
            log(LogLevel::Error, &reason);
            Ok(AuthOutcome::Failed(reason))
        }
    }
}

async fn post_credentials(
    client: &ApiClient,
    server: &ServerConfig,
    url: &str,
    step: &str,
) -> AppResult<AuthResponse> {
    let raw = client
        .send(
            Method::POST,
            url,
            None,
            Some(&server.credentials),
            AUTH_LABEL,
        )
        .await
        .map_err(|e| {
            log(
                LogLevel::Error,
                &format!("{} request to {} failed: {}", step, url, e),
            );
            e
        })?;

    ApiClient::decode::<AuthResponse>(&raw, url, AUTH_LABEL)
}
