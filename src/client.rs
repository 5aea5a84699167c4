// MIT License - Copyright (c) 2026 Peter Wright
// HTTP client for the panel's web API

use std::future::Future;

use tracing::{debug, warn};

use crate::config::PanelConfig;
use crate::error::{Result, TuxedoError};
use crate::protocol::{parse_status_body, truncate_after_last_brace, Endpoint};
use crate::status::{ArmMode, RawStatus};

/// Browser user-agent; some panel firmware refuses unknown clients.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/107.0.0.0 Safari/537.36";

/// Operations the bridge needs from a panel.
///
/// Implemented by [`PanelClient`] over HTTP, and by in-memory panels in
/// tests.
pub trait PanelApi: Send + Sync + 'static {
    /// Query the current status. Never fails: transport problems come back
    /// as [`RawStatus::transport_error`].
    fn query_status(&self) -> impl Future<Output = RawStatus> + Send;

    /// Arm in the given mode. `Ok` only means the request completed.
    fn arm(&self, mode: ArmMode) -> impl Future<Output = Result<()>> + Send;

    /// Disarm. `Ok` only means the request completed.
    fn disarm(&self) -> impl Future<Output = Result<()>> + Send;

    /// Fetch the panel's home page to refresh its session and status cache.
    fn refresh_session(&self) -> impl Future<Output = Result<()>> + Send;
}

/// HTTP client for one panel.
#[derive(Debug, Clone)]
pub struct PanelClient {
    http: reqwest::Client,
    base_url: String,
    alarm_code: String,
}

impl PanelClient {
    pub fn new(config: &PanelConfig) -> Result<Self> {
        // Panels ship self-signed certificates.
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()?;

        if config.alarm_code.is_empty() {
            warn!("Alarm code is missing from config; arm/disarm will be rejected by the panel");
        }

        Ok(Self {
            http,
            base_url: config.base_url(),
            alarm_code: config.alarm_code.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a GET and return the body, failing on transport errors and
    /// non-2xx responses.
    async fn get(&self, endpoint: &Endpoint<'_>) -> Result<String> {
        let url = endpoint.url(&self.base_url);
        debug!("Calling panel API: {}", endpoint.name());

        let response = self
            .http
            .get(&url)
            .query(&endpoint.query())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| TuxedoError::from_request(&url, e))?;

        let body = response
            .text()
            .await
            .map_err(|e| TuxedoError::from_request(&url, e))?;
        debug!(
            "{} response: {}",
            endpoint.name(),
            truncate_after_last_brace(&body)
        );
        Ok(body)
    }

    async fn fetch_status(&self) -> Result<RawStatus> {
        let body = self.get(&Endpoint::SecurityStatus).await?;
        parse_status_body(&body)
    }
}

impl PanelApi for PanelClient {
    async fn query_status(&self) -> RawStatus {
        match self.fetch_status().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Status query failed: {}", e);
                RawStatus::transport_error()
            }
        }
    }

    async fn arm(&self, mode: ArmMode) -> Result<()> {
        self.get(&Endpoint::ArmWithCode {
            mode,
            code: &self.alarm_code,
        })
        .await?;
        Ok(())
    }

    async fn disarm(&self) -> Result<()> {
        self.get(&Endpoint::Disarm {
            code: &self.alarm_code,
        })
        .await?;
        Ok(())
    }

    async fn refresh_session(&self) -> Result<()> {
        self.get(&Endpoint::Home).await?;
        Ok(())
    }
}
