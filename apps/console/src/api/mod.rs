use std::sync::Arc;

use anyhow::Context;
use reqwest::{header, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;
use crate::filters::DashboardQuery;
use crate::models::{AuthenticatedUser, CompanySummary, DashboardOverview};

pub type ClientResult<T> = Result<T, ClientError>;

/// Thin HTTP client for the console backend. Owns the base URL, bearer
/// token, and per-request timeout; one typed method per endpoint.
#[derive(Clone)]
pub struct ConsoleClient {
    inner: reqwest::Client,
    config: Arc<AppConfig>,
    base_url: String,
}

impl ConsoleClient {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let base_url = normalize_base_url(&config.api_base_url);

        let client = reqwest::Client::builder()
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            inner: client,
            config: Arc::new(config),
            base_url,
        })
    }

    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    pub async fn get_dashboard_overview(
        &self,
        company_id: &str,
        query: &DashboardQuery,
    ) -> ClientResult<DashboardOverview> {
        let builder = self
            .request(Method::GET, "dashboard/overview", Some(company_id))
            .query(&query.to_query_pairs());
        self.send(builder).await
    }

    pub async fn get_current_user(&self) -> ClientResult<AuthenticatedUser> {
        let builder = self.request(Method::GET, "auth/me", None);
        self.send(builder).await
    }

    pub async fn get_companies(&self) -> ClientResult<Vec<CompanySummary>> {
        let builder = self.request(Method::GET, "companies", None);
        self.send(builder).await
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        company_override: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let url = self.join_path(path);
        let mut builder = self
            .inner
            .request(method, url)
            .timeout(self.config.request_timeout);

        if let Some(token) = self.config.bearer_token() {
            builder = builder.header(header::AUTHORIZATION, token);
        }

        if let Some(company) = self.config.company_header(company_override) {
            builder = builder.header("X-Company-Id", company);
        }

        builder
    }

    fn join_path(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<T>(&self, builder: reqwest::RequestBuilder) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let response = builder.send().await.map_err(ClientError::from)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(ClientError::from)?;

        if status.is_success() {
            if bytes.is_empty() {
                return Err(ClientError::EmptyResponse(status));
            }
            return serde_json::from_slice(&bytes).map_err(ClientError::from);
        }

        if let Ok(body) = serde_json::from_slice::<ApiErrorBody>(&bytes) {
            Err(ClientError::Api {
                status,
                code: body.code,
                message: body.message,
            })
        } else {
            Err(ClientError::UnexpectedStatus {
                status,
                body: bytes.to_vec(),
            })
        }
    }
}

fn normalize_base_url(input: &str) -> String {
    input.trim_end_matches('/').to_string()
}

/// Error body shape the backend uses for non-2xx responses.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("api error {status}: {message}")]
    Api {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
    #[error("empty response body: {0}")]
    EmptyResponse(StatusCode),
    #[error("unexpected status {status}")]
    UnexpectedStatus { status: StatusCode, body: Vec<u8> },
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport(err) => err.status(),
            Self::Api { status, .. } => Some(*status),
            Self::EmptyResponse(status) => Some(*status),
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Decode(_) => None,
        }
    }
}
