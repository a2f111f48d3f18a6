use std::collections::BTreeSet;

use axum::extract::{FromRequest, Request};
use axum::{async_trait, Json};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::error::ApiError;

/// Like `Json<T>`, but also runs `T::validate`. Malformed bodies and failed
/// validation both come back as a 400 with a JSON `error`.
pub struct ValidatedForm<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedForm<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
        value
            .validate()
            .map_err(|errors| ApiError::Validation(describe(&errors)))?;
        Ok(ValidatedForm(value))
    }
}

/// Distinct field messages, in a stable order.
fn describe(errors: &ValidationErrors) -> String {
    let messages: BTreeSet<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(m) => m.to_string(),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    if messages.is_empty() {
        "Validation failed".to_string()
    } else {
        messages.into_iter().collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;
    use tower::ServiceExt;

    use super::*;

    #[derive(Debug, Deserialize, Validate)]
    struct Guest {
        #[serde(default)]
        #[validate(length(min = 1, message = "All fields are required."))]
        name: String,
        #[serde(default)]
        #[validate(email(message = "Invalid email format."))]
        email: String,
    }

    async fn handler(ValidatedForm(guest): ValidatedForm<Guest>) -> String {
        guest.name
    }

    async fn send(body: &str) -> (StatusCode, String) {
        let app = Router::new().route("/", post(handler));
        let response = app
            .oneshot(
                Request::post("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn valid_body_passes_through() {
        let (status, body) = send(r#"{"name":"Ada","email":"ada@example.com"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Ada");
    }

    #[tokio::test]
    async fn malformed_json_is_a_json_400() {
        let (status, body) = send("{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.starts_with(r#"{"error":"#));
    }

    #[tokio::test]
    async fn validation_messages_are_reported() {
        let (status, body) = send(r#"{"email":"ada@"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            body["error"],
            "All fields are required. Invalid email format."
        );
    }
}
