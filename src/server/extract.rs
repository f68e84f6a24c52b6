//! Request extractors whose rejections use the structured error body.
//!
//! axum's own `Json`, `Query` and `Path` reject with plain text (often 422).
//! These wrappers turn every rejection into `400 VALIDATION_FAILED`.

use super::ApiError;
use crate::error::TrackerError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

/// JSON request body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

/// Query string.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

/// Path parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiPath<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(TrackerError::validation("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(TrackerError::validation("query", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(TrackerError::validation("path", rejection.body_text()))
    }
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::http::header::CONTENT_TYPE;
    use axum::response::IntoResponse;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct NameBody {
        name: String,
    }

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn json_accepts_valid_body() {
        let req = json_request(r#"{"name":"x"}"#);
        let ApiJson(body) = ApiJson::<NameBody>::from_request(req, &()).await.unwrap();
        assert_eq!(body.name, "x");
    }

    #[tokio::test]
    async fn json_rejection_is_bad_request() {
        let req = json_request(r#"{"other":1}"#);
        let Err(err) = ApiJson::<NameBody>::from_request(req, &()).await else {
            panic!("missing field must be rejected");
        };
        assert!(matches!(
            err.0,
            TrackerError::Validation { ref field, .. } if field == "body"
        ));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn query_rejection_is_bad_request() {
        let req = Request::builder()
            .uri("/?name=a&name=b&extra")
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let result = ApiQuery::<Vec<(String, i64)>>::from_request_parts(&mut parts, &()).await;
        let Err(err) = result else {
            panic!("non-numeric values must be rejected");
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
