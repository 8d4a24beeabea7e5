use std::fmt::Display;

use serde::de::Error;

/// Error body CamPay returns alongside non-success statuses
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

#[derive(Debug)]
pub enum GatewayError {
    RequestError(reqwest::Error),
    /// Credentials were rejected by the token endpoint
    Authentication(ErrorResponse),
    GatewayDeserialization(serde_json::Error),
    /// Gateway answered with a status that is not a structured rejection
    UnexpectedStatus {
        status: reqwest::StatusCode,
        response: serde_json::Value,
    },
    /// Issued token cannot be sent as a header value
    MalformedToken,
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            return Self::GatewayDeserialization(serde_json::Error::custom(
                "failed to decode response body",
            ));
        }
        Self::RequestError(value)
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(value: serde_json::Error) -> Self {
        Self::GatewayDeserialization(value)
    }
}

impl std::error::Error for GatewayError {}

impl Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::RequestError(e) => write!(f, "http request error: {e}"),
            GatewayError::Authentication(error_response) => write!(
                f,
                "gateway authentication: {}",
                error_response
                    .message
                    .as_deref()
                    .unwrap_or("token request rejected")
            ),
            GatewayError::GatewayDeserialization(e) => {
                write!(f, "gateway response deserialization: {e}")
            }
            GatewayError::UnexpectedStatus { status, response } => write!(
                f,
                "gateway responded with {status}: {}",
                super::mask::secure_value(response)
            ),
            GatewayError::MalformedToken => f.write_str("gateway token is not a valid header value"),
        }
    }
}
