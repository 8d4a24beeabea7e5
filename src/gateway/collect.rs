use serde::{Deserialize, Serialize};

/// Amount as it travels over the wire: CamPay and callers use both forms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(serde_json::Number),
    Text(String),
    Flag(bool),
}

impl Amount {
    /// Empty strings, zero and `false` are treated the same as a missing amount
    pub fn is_truthy(&self) -> bool {
        match self {
            Amount::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            Amount::Text(s) => !s.is_empty(),
            Amount::Flag(b) => *b,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectRequest<'a> {
    pub amount: &'a str,
    pub currency: &'a str,
    /// Phone number including the country code
    pub from: String,
    pub description: &'a str,
    pub external_reference: &'a str,
}

/// Immediate answer to a collect call, before the subscriber confirms
#[derive(Debug, Deserialize)]
pub struct CollectAccepted {
    pub reference: String,
    #[serde(default)]
    pub ussd_code: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CollectionStatus {
    Successful,
    Failed,
    Pending,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Transaction state as reported by the gateway. Error bodies deserialize into
/// this too, leaving `status` as [`CollectionStatus::Unknown`] and `message` set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionResult {
    #[serde(default)]
    pub status: CollectionStatus,
    pub reference: Option<String>,
    pub external_reference: Option<String>,
    pub amount: Option<Amount>,
    pub currency: Option<String>,
    pub operator: Option<String>,
    pub code: Option<String>,
    pub operator_reference: Option<String>,
    pub description: Option<String>,
    pub external_user: Option<String>,
    pub reason: Option<String>,
    pub phone_number: Option<String>,
    pub message: Option<String>,
}

impl CollectionResult {
    pub const FALLBACK_REASON: &str = "An error occur with the payment please try later";

    pub fn is_successful(&self) -> bool {
        self.status == CollectionStatus::Successful
    }

    /// Most specific human readable explanation of a non successful collection
    pub fn failure_reason(&self) -> &str {
        fn non_empty(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.is_empty())
        }
        non_empty(&self.reason)
            .or_else(|| non_empty(&self.message))
            .unwrap_or(Self::FALLBACK_REASON)
    }
}
