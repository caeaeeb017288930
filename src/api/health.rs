//! Health endpoint

use axum::Extension;
use serde::Serialize;

use crate::storage::Storage;

use super::Error;
use super::Success;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok`, failures are errors
    pub status: &'static str,
}

/// Check the storage can be reached
///
/// Request:
/// ```sh
/// curl -v http://localhost:6000/api/health
/// ```
///
/// Response:
/// ```json
/// { "data": { "status": "ok" } }
/// ```
pub async fn check<S: Storage>(
    Extension(storage): Extension<S>,
) -> Result<Success<HealthResponse>, Error> {
    storage.health_check().await.map_err(|err| {
        tracing::warn!("Health check failed: {err}");

        Error::service_unavailable("Storage unavailable")
    })?;

    Ok(Success::ok(HealthResponse { status: "ok" }))
}
