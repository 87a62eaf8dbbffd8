//! REST API module.
//!
//! Contains all API routes and handlers. Handlers stay thin: they extract,
//! call one service operation and wrap the result in the response envelope.

mod assignments;
mod brigades;
mod members;

pub use assignments::*;
pub use brigades::*;
pub use members::*;

use axum::{
    extract::FromRequest,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    status: StatusCode,
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            data,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Create a 201 response for a newly created resource.
pub fn created<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data).with_status(StatusCode::CREATED))
}

/// Create an empty 204 response.
pub fn no_content() -> Result<StatusCode, AppError> {
    Ok(StatusCode::NO_CONTENT)
}

/// JSON body extractor whose rejections use the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let response = success(vec![1, 2]).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert!(json.get("status").is_none());
    }

    #[tokio::test]
    async fn test_created_and_no_content() {
        let response = created("x").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = no_content().into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
