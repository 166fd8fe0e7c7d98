use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("HTTP request failed: {0}")]
    Reqwest(String),
    #[error("Filesystem I/O error: {0}")]
    Io(String),
    #[error("JSON serialization error: {0}")]
    SerdeSerialize(String),
    #[error("JSON parsing error: {0}")]
    SerdeParse(String),
    #[error("API returned an error: status={status}, message='{message}' (Endpoint: {endpoint}, Source: {source_label})")]
    ApiError {
        status: u16,
        message: String,
        endpoint: String,
        source_label: String,
    },
    #[error("API response structure invalid: {message} (Endpoint: {endpoint}, Source: {source_label})")]
    ApiResponseInvalid {
        message: String,
        endpoint: String,
        source_label: String,
    },
    #[error("Authentication failed: {0}")]
    AuthFailed(String),
    #[error("Invalid argument provided: {0}")]
    Argument(String),
    #[error("Tokio task join error: {0}")]
    JoinError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Semaphore acquisition error: {0}")]
    SemaphoreAcquire(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Reqwest(e.to_string())
    }
}
impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}
impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() || e.is_eof() || e.is_syntax() || e.is_data() {
            AppError::SerdeParse(e.to_string())
        } else {
            AppError::SerdeSerialize(e.to_string())
        }
    }
}
impl From<JoinError> for AppError {
    fn from(e: JoinError) -> Self {
        AppError::JoinError(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn response_invalid<S: Into<String>>(message: S, endpoint: &str, source: &str) -> AppError {
        AppError::ApiResponseInvalid {
            message: message.into(),
            endpoint: endpoint.to_string(),
            source_label: source.to_string(),
        }
    }

    pub fn api_error<S: Into<String>>(
        status: u16,
        message: S,
        endpoint: &str,
        source: &str,
    ) -> AppError {
        AppError::ApiError {
            status,
            message: message.into(),
            endpoint: endpoint.to_string(),
            source_label: source.to_string(),
        }
    }

    /// Transport failures, as opposed to schema or backend-reported problems.
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Reqwest(_))
    }
}
