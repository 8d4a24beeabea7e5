use axum::{extract::State, response::IntoResponse, routing::post};
use serde::Serialize;
use tracing::instrument;

use crate::{
    gateway::{collect::CollectRequest, mask},
    payment::{PaymentDetails, PaymentError, PaymentRequest, Result},
    state::AppState,
};

/// Amount requested from the subscriber, independent of the amount the caller sends
const COLLECTION_AMOUNT: &str = "5";
const CURRENCY: &str = "XAF";
const COUNTRY_CODE: &str = "237";
const DESCRIPTION: &str = "Eneo payment";

#[instrument(skip_all)]
pub async fn collect_payment(
    State(AppState { gateway }): State<AppState>,
    Json(request): Json<serde_json::Value>,
) -> Result<PaymentResponse> {
    tracing::debug!(data = %mask::secure_value(&request), "Payment request");
    let request: PaymentRequest =
        serde_json::from_value(request).map_err(|e| PaymentError::Rejected {
            status: reqwest::StatusCode::BAD_REQUEST,
            text: e.to_string(),
        })?;
    let phone = request.validated_phone()?;
    tracing::trace!(requested_amount = ?request.amount, "Caller amount is not forwarded");

    let collect = CollectRequest {
        amount: COLLECTION_AMOUNT,
        currency: CURRENCY,
        from: format!("{COUNTRY_CODE}{phone}"),
        description: DESCRIPTION,
        external_reference: "",
    };
    let result = match gateway.collect(&collect).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Failed to collect payment: {e}");
            return Err(e.into());
        }
    };
    tracing::debug!(data = %mask::secure_serializable(&result), "Gateway collection result");

    if result.is_successful() {
        tracing::info!(reference = ?result.reference, "Payment successful");
        Ok(PaymentResponse::new(result.into()))
    } else {
        let reason = result.failure_reason().to_string();
        tracing::info!(status = ?result.status, %reason, "Payment was not successful");
        Err(PaymentError::Declined(reason))
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    message: &'static str,
    payment: PaymentDetails,
}

impl PaymentResponse {
    pub fn new(payment: PaymentDetails) -> Self {
        Self {
            message: "Payment successful!",
            payment,
        }
    }
}

impl IntoResponse for PaymentResponse {
    fn into_response(self) -> axum::response::Response {
        tracing::debug!(data = %mask::secure_serializable(&self), "Payment response payload");
        axum::Json(self).into_response()
    }
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/payment", post(collect_payment))
}

/// `Json` extractor wrapper that answers parse failures with the `{error}` body
pub struct Json<T>(pub T);

impl<S, T> axum::extract::FromRequest<S> for Json<T>
where
    T: serde::de::DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = PaymentError;

    async fn from_request(
        req: axum::http::Request<axum::body::Body>,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(e) => Err(PaymentError::Rejected {
                status: e.status(),
                text: e.body_text(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        body::Body,
        extract::State,
        http::{Request, StatusCode, header},
        response::{IntoResponse, Response},
    };
    use serde_json::{Value, json};

    use super::{Json, collect_payment};
    use crate::{
        gateway::{
            self, CollectionGateway,
            collect::{CollectRequest, CollectionResult},
            error::{ErrorResponse, GatewayError},
        },
        payment::PaymentError,
        state::AppState,
    };

    #[derive(Debug, Clone, PartialEq)]
    struct SeenCollect {
        amount: String,
        currency: String,
        from: String,
        description: String,
        external_reference: String,
    }

    #[derive(Debug)]
    enum FakeOutcome {
        Result(CollectionResult),
        Unreachable,
    }

    #[derive(Debug)]
    struct FakeGateway {
        outcome: FakeOutcome,
        seen: Mutex<Vec<SeenCollect>>,
    }

    impl FakeGateway {
        fn new(outcome: FakeOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn returning(result: Value) -> Arc<Self> {
            Self::new(FakeOutcome::Result(serde_json::from_value(result).unwrap()))
        }

        fn seen(&self) -> Vec<SeenCollect> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl CollectionGateway for FakeGateway {
        async fn collect(&self, request: &CollectRequest<'_>) -> gateway::Result<CollectionResult> {
            self.seen.lock().unwrap().push(SeenCollect {
                amount: request.amount.into(),
                currency: request.currency.into(),
                from: request.from.clone(),
                description: request.description.into(),
                external_reference: request.external_reference.into(),
            });
            match &self.outcome {
                FakeOutcome::Result(result) => Ok(result.clone()),
                FakeOutcome::Unreachable => Err(GatewayError::Authentication(ErrorResponse {
                    message: Some("Unable to log in with provided credentials.".into()),
                    error_code: Some("ER401".into()),
                })),
            }
        }
    }

    async fn call(gateway: Arc<FakeGateway>, body: Value) -> (StatusCode, Value) {
        let state = AppState::new(gateway);
        let response = collect_payment(State(state), Json(body)).await.into_response();
        read(response).await
    }

    async fn read(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_phone() {
        let gateway = FakeGateway::returning(json!({"status": "SUCCESSFUL"}));
        let (status, body) = call(gateway.clone(), json!({"amount": "100"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Phone and amount are required."}));
        assert!(gateway.seen().is_empty());
    }

    #[tokio::test]
    async fn missing_amount() {
        let gateway = FakeGateway::returning(json!({"status": "SUCCESSFUL"}));
        let (status, body) = call(gateway.clone(), json!({"phone": "670000001"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Phone and amount are required."}));
        assert!(gateway.seen().is_empty());
    }

    #[tokio::test]
    async fn successful_collection() {
        let gateway = FakeGateway::returning(json!({
            "status": "SUCCESSFUL",
            "reference": "R1",
            "amount": "5",
            "currency": "XAF",
            "operator": "MTN",
            "phone_number": "237670000001",
        }));
        let (status, body) = call(
            gateway.clone(),
            json!({"phone": "670000001", "amount": 1500}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "message": "Payment successful!",
                "payment": {
                    "reference": "R1",
                    "external_reference": null,
                    "status": "SUCCESSFUL",
                    "amount": "5",
                    "currency": "XAF",
                    "operator": "MTN",
                    "code": null,
                    "operator_reference": null,
                    "description": null,
                    "external_user": null,
                    "reason": null,
                    "phone_number": "237670000001",
                }
            })
        );
    }

    #[tokio::test]
    async fn gateway_receives_fixed_collection_parameters() {
        let gateway = FakeGateway::returning(json!({"status": "SUCCESSFUL"}));
        call(gateway.clone(), json!({"phone": "670000001", "amount": "1500"})).await;
        assert_eq!(
            gateway.seen(),
            vec![SeenCollect {
                amount: "5".into(),
                currency: "XAF".into(),
                from: "237670000001".into(),
                description: "Eneo payment".into(),
                external_reference: String::new(),
            }]
        );
    }

    #[tokio::test]
    async fn failure_uses_reason() {
        let gateway = FakeGateway::returning(json!({
            "status": "FAILED",
            "reason": "Insufficient funds",
            "message": "ignored",
        }));
        let (status, body) = call(gateway, json!({"phone": "670000001", "amount": "5"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Insufficient funds"}));
    }

    #[tokio::test]
    async fn failure_falls_back_to_message() {
        let gateway = FakeGateway::returning(json!({"status": "FAILED", "message": "timeout"}));
        let (status, body) = call(gateway, json!({"phone": "670000001", "amount": "5"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "timeout"}));
    }

    #[tokio::test]
    async fn failure_without_details() {
        let gateway = FakeGateway::returning(json!({"status": "FAILED"}));
        let (status, body) = call(gateway, json!({"phone": "670000001", "amount": "5"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"error": "An error occur with the payment please try later"})
        );
    }

    #[tokio::test]
    async fn pending_is_not_a_success() {
        let gateway = FakeGateway::returning(json!({"status": "PENDING", "reference": "R9"}));
        let (status, body) = call(gateway, json!({"phone": "670000001", "amount": "5"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"error": "An error occur with the payment please try later"})
        );
    }

    #[tokio::test]
    async fn gateway_fault_is_bad_gateway() {
        let gateway = FakeGateway::new(FakeOutcome::Unreachable);
        let (status, body) = call(gateway, json!({"phone": "670000001", "amount": "5"})).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, json!({"error": PaymentError::UNAVAILABLE_MESSAGE}));
    }

    #[tokio::test]
    async fn wrong_field_type_is_rejected() {
        let gateway = FakeGateway::returning(json!({"status": "SUCCESSFUL"}));
        let (status, body) = call(gateway.clone(), json!({"phone": ["670000001"], "amount": "5"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(gateway.seen().is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_by_extractor() {
        use axum::extract::FromRequest;

        let request = Request::builder()
            .method("POST")
            .uri("/payment")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"phone\": "))
            .unwrap();
        let rejection = match Json::<Value>::from_request(request, &()).await {
            Ok(_) => panic!("truncated body must not parse"),
            Err(rejection) => rejection,
        };
        let (status, body) = read(rejection.into_response()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    async fn dispatch(gateway: Arc<FakeGateway>, request: Request<Body>) -> (StatusCode, Value) {
        use tower::ServiceExt;

        let app = super::router().with_state(AppState::new(gateway));
        read(app.oneshot(request).await.unwrap()).await
    }

    #[tokio::test]
    async fn router_serves_successful_payment() {
        let gateway = FakeGateway::returning(json!({"status": "SUCCESSFUL", "reference": "R1"}));
        let request = Request::builder()
            .method("POST")
            .uri("/payment")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"phone":"670000001","amount":"100"}"#))
            .unwrap();
        let (status, body) = dispatch(gateway.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Payment successful!");
        assert_eq!(body["payment"]["reference"], "R1");
        assert_eq!(gateway.seen().len(), 1);
    }

    #[tokio::test]
    async fn router_rejects_non_json_content_type() {
        let gateway = FakeGateway::returning(json!({"status": "SUCCESSFUL"}));
        let request = Request::builder()
            .method("POST")
            .uri("/payment")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("phone=670000001&amount=100"))
            .unwrap();
        let (status, body) = dispatch(gateway.clone(), request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body["error"].is_string());
        assert!(gateway.seen().is_empty());
    }

    #[tokio::test]
    async fn router_validates_through_the_route() {
        let gateway = FakeGateway::returning(json!({"status": "SUCCESSFUL"}));
        let request = Request::builder()
            .method("POST")
            .uri("/payment")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"phone":"670000001","amount":false}"#))
            .unwrap();
        let (status, body) = dispatch(gateway.clone(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Phone and amount are required."}));
        assert!(gateway.seen().is_empty());
    }

    #[tokio::test]
    async fn router_only_accepts_post() {
        use tower::ServiceExt;

        let app = super::router().with_state(AppState::new(FakeGateway::returning(
            json!({"status": "SUCCESSFUL"}),
        )));
        let request = Request::builder()
            .method("GET")
            .uri("/payment")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
