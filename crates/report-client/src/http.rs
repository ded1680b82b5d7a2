//! HTTP implementation of [`ReportBackend`]
//!
//! Every call sends the API token in `X-API-Token` and carries its own
//! timeout: the short bound for launch, status and coverage calls, the
//! default bound for result fetches and the long bound for the synchronous
//! run-and-wait endpoints.
//!
//! ```no_run
//! use report_client::{HttpReportClient, ReportBackend};
//! use report_core::{JobRequest, Preset};
//!
//! # async fn run() -> report_core::Result<()> {
//! let client = HttpReportClient::from_env()?;
//! let accepted = client
//!     .launch_report_job(&JobRequest::preset(Preset::Last7d))
//!     .await?;
//! println!("{} {}", accepted.job_id, accepted.snapshot.progress_line());
//! # Ok(())
//! # }
//! ```

use crate::backend::{JobAccepted, ReportBackend};
use crate::config::ClientConfig;
use crate::error::{status_error, transport_error};
use crate::wire::{AnalysisStatusBody, CoveragePayload, ReportRunPayload, ReportStatusBody};
use async_trait::async_trait;
use report_core::{
    Account, AnalysisResult, CoverageReport, Error, JobRequest, JobStatusSnapshot, ReportResult,
    Result,
};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const TOKEN_HEADER: &str = "X-API-Token";
const ANALYSIS_KEY_HEADER: &str = "X-DeepSeek-Api-Key";

/// Report backend reached over HTTP
pub struct HttpReportClient {
    client: Client,
    config: ClientConfig,
}

impl HttpReportClient {
    /// Create a client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.long_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create a client for the given base URL and token
    pub fn new(api_base: &str, api_token: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig::new(api_base, api_token)?)
    }

    /// Create a client from `REPORT_API_BASE` / `REPORT_API_TOKEN`
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL of an endpoint; segments are percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::Config(format!(
                    "API base '{}' cannot be a base URL",
                    self.config.api_base
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Headers sent with every request
    fn build_headers(&self) -> Result<HeaderMap> {
        if !self.config.has_token() {
            return Err(Error::Auth("API token is not configured".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let token = HeaderValue::from_str(self.config.api_token.trim())
            .map_err(|e| Error::Auth(format!("Invalid API token: {e}")))?;
        headers.insert(TOKEN_HEADER, token);
        Ok(headers)
    }

    /// Send one request and decode the JSON response
    async fn execute<B, T>(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        body: Option<&B>,
        extra_headers: HeaderMap,
        bound: Duration,
    ) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let mut headers = self.build_headers()?;
        headers.extend(extra_headers);

        debug!("{} {} ({})", method, url, operation);

        let mut request = self
            .client
            .request(method, url)
            .headers(headers)
            .timeout(bound);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(operation, bound, &e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(operation, bound, &e))?;

        if !status.is_success() {
            debug!("{} failed with HTTP {}", operation, status);
            return Err(status_error(status, &text));
        }

        Ok(serde_json::from_str(&text)?)
    }

    fn analysis_headers(api_key: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(api_key.trim())
            .map_err(|e| Error::Validation(format!("Invalid analysis API key: {e}")))?;
        headers.insert(ANALYSIS_KEY_HEADER, value);
        Ok(headers)
    }

    fn analysis_url(&self, report_id: &str, action: &str, refresh: bool) -> Result<Url> {
        let mut url = self.endpoint(&["reports", report_id, action])?;
        if refresh {
            url.query_pairs_mut().append_pair("refresh", "1");
        }
        Ok(url)
    }
}

#[async_trait]
impl ReportBackend for HttpReportClient {
    #[instrument(skip(self, request), fields(api_base = %self.config.api_base))]
    async fn launch_report_job(&self, request: &JobRequest) -> Result<JobAccepted> {
        let url = self.endpoint(&["reports", "run-async"])?;
        let body: ReportStatusBody = self
            .execute(
                "launch_report_job",
                Method::POST,
                url,
                Some(&ReportRunPayload::from(request)),
                HeaderMap::new(),
                self.config.short_timeout,
            )
            .await?;

        Ok(JobAccepted {
            job_id: body.report_id.clone(),
            snapshot: body.into_snapshot(),
        })
    }

    #[instrument(skip(self))]
    async fn get_report_job_status(&self, report_id: &str) -> Result<JobStatusSnapshot> {
        let url = self.endpoint(&["reports", report_id, "status"])?;
        let body: ReportStatusBody = self
            .execute::<(), _>(
                "get_report_job_status",
                Method::GET,
                url,
                None,
                HeaderMap::new(),
                self.config.short_timeout,
            )
            .await?;
        Ok(body.into_snapshot())
    }

    #[instrument(skip(self))]
    async fn get_report_result(&self, report_id: &str) -> Result<ReportResult> {
        let url = self.endpoint(&["reports", report_id])?;
        self.execute::<(), _>(
            "get_report_result",
            Method::GET,
            url,
            None,
            HeaderMap::new(),
            self.config.default_timeout,
        )
        .await
    }

    #[instrument(skip(self, request))]
    async fn check_market_coverage(&self, request: &JobRequest) -> Result<CoverageReport> {
        let url = self.endpoint(&["market", "coverage"])?;
        self.execute(
            "check_market_coverage",
            Method::POST,
            url,
            Some(&CoveragePayload::from(request)),
            HeaderMap::new(),
            self.config.short_timeout,
        )
        .await
    }

    #[instrument(skip(self, api_key))]
    async fn launch_analysis_job(
        &self,
        report_id: &str,
        api_key: &str,
        refresh: bool,
    ) -> Result<JobAccepted> {
        let url = self.analysis_url(report_id, "deepseek-async", refresh)?;
        let body: AnalysisStatusBody = self
            .execute::<(), _>(
                "launch_analysis_job",
                Method::POST,
                url,
                None,
                Self::analysis_headers(api_key)?,
                self.config.short_timeout,
            )
            .await?;

        Ok(JobAccepted {
            job_id: body.report_id.clone(),
            snapshot: body.snapshot(),
        })
    }

    #[instrument(skip(self))]
    async fn get_analysis_job_status(&self, report_id: &str) -> Result<JobStatusSnapshot> {
        let url = self.endpoint(&["reports", report_id, "deepseek-status"])?;
        let body: AnalysisStatusBody = self
            .execute::<(), _>(
                "get_analysis_job_status",
                Method::GET,
                url,
                None,
                HeaderMap::new(),
                self.config.short_timeout,
            )
            .await?;
        Ok(body.snapshot())
    }

    #[instrument(skip(self))]
    async fn get_analysis_result(&self, report_id: &str) -> Result<AnalysisResult> {
        let report = self.get_report_result(report_id).await?;
        Ok(AnalysisResult::from_report(&report))
    }

    #[instrument(skip(self, request))]
    async fn run_report_sync(&self, request: &JobRequest) -> Result<ReportResult> {
        let url = self.endpoint(&["reports", "run"])?;
        self.execute(
            "run_report_sync",
            Method::POST,
            url,
            Some(&ReportRunPayload::from(request)),
            HeaderMap::new(),
            self.config.long_timeout,
        )
        .await
    }

    #[instrument(skip(self, api_key))]
    async fn run_analysis_sync(
        &self,
        report_id: &str,
        api_key: &str,
        refresh: bool,
    ) -> Result<AnalysisResult> {
        let url = self.analysis_url(report_id, "deepseek", refresh)?;
        let body: AnalysisStatusBody = self
            .execute::<(), _>(
                "run_analysis_sync",
                Method::POST,
                url,
                None,
                Self::analysis_headers(api_key)?,
                self.config.long_timeout,
            )
            .await?;
        Ok(body.into_result())
    }

    #[instrument(skip(self))]
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let url = self.endpoint(&["accounts"])?;
        self.execute::<(), _>(
            "list_accounts",
            Method::GET,
            url,
            None,
            HeaderMap::new(),
            self.config.short_timeout,
        )
        .await
    }
}
