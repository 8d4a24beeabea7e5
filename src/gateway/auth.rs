use axum::http::{HeaderMap, HeaderValue, header};
use axum_extra::headers::{self, HeaderMapExt};

use crate::gateway::error::GatewayError;

#[derive(Debug, serde::Serialize)]
pub struct TokenRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, serde::Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Headers shared by every gateway call
pub fn json_headers() -> HeaderMap {
    let mut map = HeaderMap::new();
    map.typed_insert(headers::ContentType::json());
    map.typed_insert(headers::UserAgent::from_static(super::USER_AGENT));
    map
}

/// CamPay uses the `Token` scheme rather than `Bearer`
pub fn authenticated_headers(token: &str) -> super::Result<HeaderMap> {
    let value = HeaderValue::from_str(&format!("Token {token}"))
        .map_err(|_| GatewayError::MalformedToken)?;
    let mut map = json_headers();
    map.insert(header::AUTHORIZATION, value);
    Ok(map)
}
