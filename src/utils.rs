use crate::error::{AppError, AppResult};
use tokio::sync::{Semaphore, SemaphorePermit};

pub async fn acquire_semaphore<'a>(
    semaphore: &'a Semaphore,
    context: &str,
) -> AppResult<SemaphorePermit<'a>> {
    semaphore
        .acquire()
        .await
        .map_err(|e| AppError::SemaphoreAcquire(format!("Failed for '{}': {}", context, e)))
}
