use std::time::Duration;

use async_trait::async_trait;
use churnlens_config::ServiceConfig;
use churnlens_core::{AnalysisRequest, AnalysisRun, AnalysisTicket, DatasetKind, Id};
use reqwest::{StatusCode, Url};
use serde_json::Value;

use crate::{AnalysisService, ClientError};

pub const HTTP_SERVICE_NAME: &str = "http";

#[derive(Debug, Clone)]
pub struct HttpAnalysisService {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpAnalysisService {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(trimmed).map_err(|err| ClientError::InvalidBaseUrl {
            url: trimmed.to_owned(),
            message: err.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl {
                url: trimmed.to_owned(),
                message: "url cannot carry path segments".to_owned(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, ClientError> {
        Self::new(
            &config.base_url,
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                message: "url cannot carry path segments".to_owned(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, url: Url, what: &str) -> Result<Value, ClientError> {
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(what.to_owned()));
        }
        Ok(response.error_for_status()?.json::<Value>().await?)
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn request_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisTicket, ClientError> {
        let url = self.endpoint(&["analyses"])?;
        let ticket = self
            .client
            .post(url)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<AnalysisTicket>()
            .await?;

        tracing::info!(
            repository_url = %request.repository_url,
            run_id = %ticket.run_id,
            repository_id = %ticket.repository_id,
            "analysis requested"
        );
        Ok(ticket)
    }

    async fn fetch_run(&self, run_id: &Id) -> Result<AnalysisRun, ClientError> {
        let url = self.endpoint(&["runs", run_id.as_str()])?;
        let payload = self.get_json(url, &format!("run {run_id}")).await?;
        Ok(serde_json::from_value(payload)?)
    }

    async fn fetch_dataset(
        &self,
        repository_id: &Id,
        kind: DatasetKind,
    ) -> Result<Value, ClientError> {
        let url = self.endpoint(&["repositories", repository_id.as_str(), kind.as_str()])?;
        self.get_json(url, &format!("{} for repository {repository_id}", kind.as_str()))
            .await
    }

    fn service_name(&self) -> &str {
        HTTP_SERVICE_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_append_encoded_segments_to_base_path() {
        let service = HttpAnalysisService::new(
            "http://127.0.0.1:8000/api/",
            Duration::from_secs(1),
        )
        .expect("service");

        assert_eq!(
            service.endpoint(&["runs", "42"]).expect("url").as_str(),
            "http://127.0.0.1:8000/api/runs/42"
        );
        assert_eq!(
            service
                .endpoint(&["repositories", "a b", "hotspots"])
                .expect("url")
                .as_str(),
            "http://127.0.0.1:8000/api/repositories/a%20b/hotspots"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(matches!(
            HttpAnalysisService::new("not a url", Duration::from_secs(1)),
            Err(ClientError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            HttpAnalysisService::new("mailto:someone@example.com", Duration::from_secs(1)),
            Err(ClientError::InvalidBaseUrl { .. })
        ));
    }
}
