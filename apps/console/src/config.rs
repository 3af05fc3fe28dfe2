use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_API_BASE_URL: &str = "http://localhost:8600/api/v1";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppProfile {
    Dev,
    Prod,
}

impl AppProfile {
    pub fn from_env(value: Option<String>) -> Self {
        match value.as_deref() {
            Some("prod") | Some("production") => Self::Prod,
            _ => Self::Dev,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_base_url: String,
    pub default_company_id: Option<String>,
    pub auth_token: Option<String>,
    pub profile: AppProfile,
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            default_company_id: None,
            auth_token: None,
            profile: AppProfile::Dev,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        crate::config::load_dotenv();

        let mut config = Self::default();

        if let Some(url) = read_env("ATRIO_API_BASE_URL") {
            config.api_base_url = url;
        }

        if let Some(company) = read_env("ATRIO_DEFAULT_COMPANY") {
            config.default_company_id = Some(company);
        }

        if let Some(token) = read_env("ATRIO_AUTH_TOKEN") {
            config.auth_token = Some(token);
        }

        let profile_raw = read_env("ATRIO_PROFILE");
        config.profile = AppProfile::from_env(profile_raw);

        if let Some(secs) =
            read_env("ATRIO_REQUEST_TIMEOUT_SECS").and_then(|value| value.parse::<u64>().ok())
        {
            config.request_timeout = Duration::from_secs(secs.max(1));
        }

        config
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.auth_token
            .as_ref()
            .map(|token| format!("Bearer {}", token.trim()))
    }

    pub fn company_header<'a>(&'a self, override_company: Option<&'a str>) -> Option<String> {
        override_company
            .or_else(|| self.default_company_id.as_deref())
            .map(|value| value.to_string())
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .or_else(|| option_env_from_build(key).map(|s| s.to_string()))
}

// wasm builds have no process environment; these are baked in at compile
// time by the bundler.
fn option_env_from_build(key: &str) -> Option<&'static str> {
    match key {
        "ATRIO_API_BASE_URL" => option_env!("ATRIO_API_BASE_URL"),
        "ATRIO_DEFAULT_COMPANY" => option_env!("ATRIO_DEFAULT_COMPANY"),
        "ATRIO_AUTH_TOKEN" => option_env!("ATRIO_AUTH_TOKEN"),
        "ATRIO_PROFILE" => option_env!("ATRIO_PROFILE"),
        "ATRIO_REQUEST_TIMEOUT_SECS" => option_env!("ATRIO_REQUEST_TIMEOUT_SECS"),
        _ => None,
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn load_dotenv() {
    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            tracing::warn!("failed to load .env: {err}");
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[inline]
pub fn load_dotenv() {}
