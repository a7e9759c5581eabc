use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

/// `{ "success": true, "data": ... }` envelope for console JSON endpoints.
/// Bodies are per-session, so they are never cached.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize>(pub T);

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self(data)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = match serde_json::to_value(&self.0) {
            Ok(data) => json!({ "success": true, "data": data }),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return crate::error::ApiError::internal_server_error("Failed to serialize response data")
                    .into_response();
            }
        };

        let mut response = (StatusCode::OK, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
