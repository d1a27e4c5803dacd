use std::{fmt, str::FromStr, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use shared::{
    domain::WaitlistEntry,
    protocol::{HealthStatus, SubmitResponse},
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Delivered,
    Failed,
}

/// How a submission treats the endpoint's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum DeliveryMode {
    /// Status and body decide the outcome; transport errors fall back to
    /// [`DeliveryMode::Opaque`] once.
    #[default]
    Observed,
    /// The reply is never inspected; a dispatch without a transport error
    /// counts as delivered.
    Opaque,
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Observed => f.write_str("observed"),
            Self::Opaque => f.write_str("opaque"),
        }
    }
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "observed" | "cors" => Ok(Self::Observed),
            "opaque" | "no-cors" | "no_cors" => Ok(Self::Opaque),
            other => Err(format!("unknown delivery mode '{other}'")),
        }
    }
}

impl TryFrom<String> for DeliveryMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("waitlist endpoint is not configured")]
    MissingEndpoint,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("endpoint answered with status {0}")]
    Status(StatusCode),
    #[error("endpoint rejected the entry: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait WaitlistGateway: Send + Sync {
    /// Delivers one entry. Never fails loudly: every error is logged and
    /// folded into [`SubmitOutcome::Failed`].
    async fn submit(&self, entry: &WaitlistEntry) -> SubmitOutcome;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub endpoint: Option<Url>,
    pub mode: DeliveryMode,
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            mode: DeliveryMode::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Posts entries as JSON to the sheet script endpoint.
pub struct SheetGateway {
    http: Client,
    endpoint: Option<Url>,
    mode: DeliveryMode,
}

impl SheetGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::with_client(http, config.endpoint, config.mode))
    }

    pub fn with_client(http: Client, endpoint: Option<Url>, mode: DeliveryMode) -> Self {
        Self {
            http,
            endpoint,
            mode,
        }
    }

    /// Attempts delivery and reports why it failed, if it did.
    pub async fn deliver(&self, entry: &WaitlistEntry) -> Result<(), GatewayError> {
        let endpoint = self.endpoint.as_ref().ok_or(GatewayError::MissingEndpoint)?;

        match self.mode {
            DeliveryMode::Opaque => self.dispatch_opaque(endpoint, entry).await,
            DeliveryMode::Observed => match self.dispatch_observed(endpoint, entry).await {
                Err(GatewayError::Transport(error)) => {
                    warn!(
                        %error,
                        "observed waitlist submission failed in transport; retrying once in opaque mode"
                    );
                    self.dispatch_opaque(endpoint, entry).await
                }
                other => other,
            },
        }
    }

    /// GET probe against the endpoint.
    pub async fn health(&self) -> Result<HealthStatus, GatewayError> {
        let endpoint = self.endpoint.as_ref().ok_or(GatewayError::MissingEndpoint)?;
        let status = self
            .http
            .get(endpoint.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(status)
    }

    async fn dispatch_opaque(
        &self,
        endpoint: &Url,
        entry: &WaitlistEntry,
    ) -> Result<(), GatewayError> {
        self.http.post(endpoint.clone()).json(entry).send().await?;
        debug!("opaque waitlist submission dispatched; reply not inspected");
        Ok(())
    }

    async fn dispatch_observed(
        &self,
        endpoint: &Url,
        entry: &WaitlistEntry,
    ) -> Result<(), GatewayError> {
        let response = self.http.post(endpoint.clone()).json(entry).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status));
        }

        // The status already says the entry was accepted; an unreadable body
        // cannot change that.
        let body = match response.text().await {
            Ok(body) => body,
            Err(error) => {
                debug!(%error, "could not read waitlist reply body; status decides");
                return Ok(());
            }
        };

        match serde_json::from_str::<SubmitResponse>(&body) {
            Ok(reply) if reply.is_rejection() => Err(GatewayError::Rejected(
                reply
                    .error
                    .or(reply.message)
                    .unwrap_or_else(|| "success=false".to_string()),
            )),
            Ok(_) => Ok(()),
            Err(_) => {
                debug!("waitlist reply is not JSON; status decides");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl WaitlistGateway for SheetGateway {
    async fn submit(&self, entry: &WaitlistEntry) -> SubmitOutcome {
        match self.deliver(entry).await {
            Ok(()) => {
                info!(
                    mode = %self.mode,
                    intent = %entry.intent,
                    user_type = %entry.user_type,
                    phone = %entry.masked_phone(),
                    timestamp = %entry.timestamp,
                    "waitlist entry delivered"
                );
                SubmitOutcome::Delivered
            }
            Err(GatewayError::MissingEndpoint) => {
                error!("waitlist endpoint is not configured; entry kept in local cache only");
                SubmitOutcome::Failed
            }
            Err(error) => {
                warn!(
                    mode = %self.mode,
                    %error,
                    phone = %entry.masked_phone(),
                    "waitlist submission failed"
                );
                SubmitOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
