use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{Error, ErrorClass, ErrorCode};

/// Envelope of every API response: `{ "code", "info", "data" }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: ErrorCode,
    pub info: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn success(data: T) -> Self {
        Self {
            code: ErrorCode::Success,
            info: "success".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            code: ErrorCode::Success,
            info: "success".to_string(),
            data: None,
        }
    }
}

/// Paginated list payload.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<i64>,
    pub has_more: bool,
}

/// Splits a result fetched with `limit + 1` rows into one page.
pub fn paginate<T, F>(items: Vec<T>, limit: usize, get_cursor: F) -> Page<T>
where
    T: Serialize,
    F: Fn(&T) -> i64,
{
    let has_more = items.len() > limit;
    let items: Vec<T> = items.into_iter().take(limit).collect();
    let next_cursor = if has_more {
        items.last().map(&get_cursor)
    } else {
        None
    };
    Page {
        items,
        next_cursor,
        has_more,
    }
}

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

/// Clamps a requested page size to `1..=MAX_PAGE_SIZE`.
#[must_use]
pub fn page_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// API error that converts to the response envelope with a matching status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: ErrorCode::InvalidBody,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: ErrorCode::Internal,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err.class() {
            ErrorClass::Validation => StatusCode::BAD_REQUEST,
            ErrorClass::Authentication => StatusCode::UNAUTHORIZED,
            ErrorClass::Authorization => StatusCode::FORBIDDEN,
            ErrorClass::NotFound => StatusCode::NOT_FOUND,
            ErrorClass::Integrity => StatusCode::CONFLICT,
            ErrorClass::Internal => {
                tracing::error!(error = %err, "request failed");
                return ApiError::internal("internal server error");
            }
        };
        if let Error::HierarchyCorrupted { kind, id } = &err {
            tracing::error!(%kind, id, "integrity violation surfaced to caller");
        }

        Self {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self {
            code: ErrorCode::InvalidParam,
            ..ApiError::bad_request(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self {
            code: ErrorCode::InvalidParam,
            ..ApiError::bad_request(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            code: self.code,
            info: self.message,
            data: None,
        };
        (self.status, Json(body)).into_response()
    }
}
