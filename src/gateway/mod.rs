use std::{fmt::Display, str::FromStr, time::Duration};

use reqwest::StatusCode;

use crate::gateway::{
    collect::{CollectAccepted, CollectRequest, CollectionResult, CollectionStatus},
    error::{ErrorResponse, GatewayError},
};

mod auth;
/// Collection request and transaction status types
pub mod collect;
pub mod error;
/// Requisite masking
pub mod mask;

pub type Result<T> = std::result::Result<T, GatewayError>;

const USER_AGENT: &str = concat!("campay-collect/", env!("CARGO_PKG_VERSION"));

/// Operation the payment route depends on. Implemented by [`CamPayGateway`] in
/// production and by fakes in tests.
#[async_trait::async_trait]
pub trait CollectionGateway: std::fmt::Debug + Send + Sync {
    /// Request a mobile money payment and wait for the transaction to settle.
    async fn collect(&self, request: &CollectRequest<'_>) -> Result<CollectionResult>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Prod,
    #[default]
    Dev,
}

impl Environment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Prod => "https://campay.net/api",
            Environment::Dev => "https://demo.campay.net/api",
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PROD" => Ok(Self::Prod),
            "DEV" => Ok(Self::Dev),
            other => Err(anyhow::anyhow!(
                "unknown gateway environment {other:?}, expected PROD or DEV"
            )),
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prod => f.write_str("PROD"),
            Self::Dev => f.write_str("DEV"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub username: String,
    pub password: String,
    pub environment: Environment,
    /// Replaces the environment URL when set
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub poll_attempts: usize,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct CamPayGateway {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    poll_attempts: usize,
    poll_interval: Duration,
}

impl CamPayGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        let base_url = settings
            .base_url
            .unwrap_or_else(|| settings.environment.base_url().to_string());
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: settings.username,
            password: settings.password,
            poll_attempts: settings.poll_attempts.max(1),
            poll_interval: settings.poll_interval,
        })
    }

    async fn token(&self) -> Result<String> {
        let url = format!("{}/token/", self.base_url);
        let request = auth::TokenRequest {
            username: &self.username,
            password: &self.password,
        };
        tracing::debug!(%url, data = %mask::secure_serializable(&request), "Gateway API token request");
        let res = self
            .client
            .post(&url)
            .headers(auth::json_headers())
            .json(&request)
            .send()
            .await?;
        let status = res.status();
        let response = res.json::<serde_json::Value>().await?;
        tracing::debug!(%status, data = %mask::secure_value(&response), "Gateway API token response");
        if !status.is_success() {
            return Err(GatewayError::Authentication(serde_json::from_value::<
                ErrorResponse,
            >(response)?));
        }
        let token: auth::TokenResponse = serde_json::from_value(response)?;
        Ok(token.token)
    }

    async fn init_collect(
        &self,
        token: &str,
        request: &CollectRequest<'_>,
    ) -> Result<(StatusCode, serde_json::Value)> {
        let url = format!("{}/collect/", self.base_url);
        tracing::debug!(%url, data = %mask::secure_serializable(request), "Gateway API collect request");
        let res = self
            .client
            .post(&url)
            .headers(auth::authenticated_headers(token)?)
            .json(request)
            .send()
            .await?;
        let status = res.status();
        let response = res.json::<serde_json::Value>().await?;
        tracing::debug!(%status, data = %mask::secure_value(&response), "Gateway API collect response");
        Ok((status, response))
    }

    pub async fn transaction_status(
        &self,
        token: &str,
        reference: &str,
    ) -> Result<CollectionResult> {
        let url = format!("{}/transaction/{}/", self.base_url, reference);
        tracing::debug!(%url, "Gateway API transaction status request");
        let res = self
            .client
            .get(&url)
            .headers(auth::authenticated_headers(token)?)
            .send()
            .await?;
        let status = res.status();
        let response = res.json::<serde_json::Value>().await?;
        tracing::debug!(%status, data = %mask::secure_value(&response), "Gateway API transaction status response");
        if !status.is_success() {
            return Err(GatewayError::UnexpectedStatus { status, response });
        }
        Ok(serde_json::from_value(response)?)
    }

    /// Poll the transaction until it leaves the pending state or attempts run out.
    async fn await_settlement(&self, token: &str, reference: &str) -> Result<CollectionResult> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match self.transaction_status(token, reference).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(%reference, attempt, "Failed to fetch transaction status: {e}");
                    return Err(e);
                }
            };
            if result.status != CollectionStatus::Pending {
                return Ok(result);
            }
            if attempt >= self.poll_attempts {
                tracing::warn!(%reference, attempt, "Transaction is still pending, giving up");
                return Ok(result);
            }
            tracing::trace!(%reference, attempt, "Transaction is pending");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait::async_trait]
impl CollectionGateway for CamPayGateway {
    async fn collect(&self, request: &CollectRequest<'_>) -> Result<CollectionResult> {
        let token = self.token().await?;
        let (status, response) = self.init_collect(&token, request).await?;
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GatewayError::Authentication(serde_json::from_value(
                response,
            )?));
        }
        if status.is_client_error() {
            // Rejections come back as `{message, error_code}` and are relayed as-is
            return Ok(serde_json::from_value(response)?);
        }
        if !status.is_success() {
            return Err(GatewayError::UnexpectedStatus { status, response });
        }
        let accepted: CollectAccepted = serde_json::from_value(response)?;
        tracing::info!(
            reference = %accepted.reference,
            operator = accepted.operator.as_deref().unwrap_or_default(),
            ussd_code = accepted.ussd_code.as_deref().unwrap_or_default(),
            "Collection initiated"
        );
        self.await_settlement(&token, &accepted.reference).await
    }
}
