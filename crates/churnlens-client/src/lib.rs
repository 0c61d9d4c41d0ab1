use async_trait::async_trait;
use churnlens_core::{AnalysisRequest, AnalysisRun, AnalysisTicket, DatasetKind, DatasetRow, Id};
use serde_json::Value;
use thiserror::Error;

mod envelope;
mod http;
mod scripted;

pub use envelope::{Dataset, normalize_dataset};
pub use http::{HTTP_SERVICE_NAME, HttpAnalysisService};
pub use scripted::{SCRIPTED_SERVICE_NAME, ScriptStep, ScriptedAnalysisService};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid service base url '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },
    #[error("unexpected {kind} payload: {message}")]
    InvalidEnvelope { kind: &'static str, message: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("service error: {0}")]
    Service(String),
}

/// Boundary to the analysis backend. Everything the client learns about
/// repositories and runs comes through here.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn request_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisTicket, ClientError>;

    async fn fetch_run(&self, run_id: &Id) -> Result<AnalysisRun, ClientError>;

    /// Raw dataset payload as returned by the service, before envelope
    /// normalization.
    async fn fetch_dataset(
        &self,
        repository_id: &Id,
        kind: DatasetKind,
    ) -> Result<Value, ClientError>;

    fn service_name(&self) -> &str;
}

/// Fetches one dataset and decodes its rows as `T`.
pub async fn fetch_rows<T: DatasetRow>(
    service: &dyn AnalysisService,
    repository_id: &Id,
) -> Result<Dataset<T>, ClientError> {
    let payload = service.fetch_dataset(repository_id, T::KIND).await?;
    let raw = normalize_dataset(T::KIND, payload)?;
    let row_count = raw.rows.len();
    let dataset = raw.decode::<T>()?;

    tracing::debug!(
        repository_id = %repository_id,
        kind = T::KIND.as_str(),
        rows = row_count,
        "dataset fetched"
    );
    Ok(dataset)
}
