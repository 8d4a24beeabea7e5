use serde::{Deserialize, Serialize};

use crate::gateway::{
    collect::{Amount, CollectionResult, CollectionStatus},
    error::GatewayError,
};

pub mod api;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub amount: Option<Amount>,
}

impl PaymentRequest {
    /// Phone number of the payer, present only when both required fields are truthy
    pub fn validated_phone(&self) -> Result<&str> {
        let phone = self.phone.as_deref().filter(|p| !p.is_empty());
        let has_amount = self.amount.as_ref().is_some_and(Amount::is_truthy);
        match phone {
            Some(phone) if has_amount => Ok(phone),
            _ => Err(PaymentError::Validation),
        }
    }
}

/// Subset of the gateway result exposed to callers
#[derive(Debug, Serialize)]
pub struct PaymentDetails {
    pub reference: Option<String>,
    pub external_reference: Option<String>,
    pub status: CollectionStatus,
    pub amount: Option<Amount>,
    pub currency: Option<String>,
    pub operator: Option<String>,
    pub code: Option<String>,
    pub operator_reference: Option<String>,
    pub description: Option<String>,
    pub external_user: Option<String>,
    pub reason: Option<String>,
    pub phone_number: Option<String>,
}

impl From<CollectionResult> for PaymentDetails {
    fn from(
        CollectionResult {
            status,
            reference,
            external_reference,
            amount,
            currency,
            operator,
            code,
            operator_reference,
            description,
            external_user,
            reason,
            phone_number,
            ..
        }: CollectionResult,
    ) -> Self {
        Self {
            reference,
            external_reference,
            status,
            amount,
            currency,
            operator,
            code,
            operator_reference,
            description,
            external_user,
            reason,
            phone_number,
        }
    }
}

#[derive(Debug)]
pub enum PaymentError {
    /// Phone or amount is missing
    Validation,
    /// Gateway answered with a non successful status
    Declined(String),
    /// Gateway could not be reached or answered with garbage
    Gateway(GatewayError),
    /// Request body could not be parsed
    Rejected {
        status: reqwest::StatusCode,
        text: String,
    },
}

impl PaymentError {
    pub const VALIDATION_MESSAGE: &str = "Phone and amount are required.";
    pub const UNAVAILABLE_MESSAGE: &str = "Payment gateway is unavailable, please try later";

    pub fn status(&self) -> reqwest::StatusCode {
        match self {
            PaymentError::Validation | PaymentError::Declined(_) => {
                reqwest::StatusCode::BAD_REQUEST
            }
            PaymentError::Gateway(_) => reqwest::StatusCode::BAD_GATEWAY,
            PaymentError::Rejected { status, .. } => *status,
        }
    }

    /// Message exposed to the caller. Gateway faults never leak their details.
    pub fn public_message(&self) -> &str {
        match self {
            PaymentError::Validation => Self::VALIDATION_MESSAGE,
            PaymentError::Declined(reason) => reason,
            PaymentError::Gateway(_) => Self::UNAVAILABLE_MESSAGE,
            PaymentError::Rejected { text, .. } => text,
        }
    }
}

impl From<GatewayError> for PaymentError {
    fn from(value: GatewayError) -> Self {
        Self::Gateway(value)
    }
}

impl std::error::Error for PaymentError {}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentError::Gateway(e) => write!(f, "{e}"),
            other => f.write_str(other.public_message()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl axum::response::IntoResponse for PaymentError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.public_message(),
        };
        tracing::debug!(%status, error = body.error, "Payment error response payload");
        (status, axum::Json(body)).into_response()
    }
}
