use axum::{
    Json,
    extract::rejection::{BytesRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::{
    convert::{ConvertError, FailureKind},
    error::ErrorReport,
};

/// JSON error body. Request problems use `error`, renderer outcomes use
/// `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApiErrorBody {
    Error(String),
    Message(String),
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    body: ApiErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, body: ApiErrorBody) -> Self {
        Self { status, kind, body }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn body(&self) -> &ApiErrorBody {
        &self.body
    }

    /// The request body could not be read, usually because it exceeded the
    /// configured size limit.
    pub fn from_body_rejection(rejection: BytesRejection) -> Self {
        Self::new(
            rejection.status(),
            "body_rejected",
            ApiErrorBody::Error(rejection.body_text()),
        )
    }

    pub fn from_query_rejection(rejection: QueryRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "query_rejected",
            ApiErrorBody::Error(rejection.body_text()),
        )
    }
}

impl From<ConvertError> for ApiError {
    fn from(error: ConvertError) -> Self {
        let kind = error.kind();
        match error {
            ConvertError::Validation(err) => Self::new(
                StatusCode::BAD_REQUEST,
                kind,
                ApiErrorBody::Error(err.to_string()),
            ),
            err @ ConvertError::NotAcceptable { .. } => Self::new(
                StatusCode::NOT_ACCEPTABLE,
                kind,
                ApiErrorBody::Error(err.to_string()),
            ),
            ConvertError::Render(failure) => {
                let status = match failure.kind {
                    FailureKind::Conversion => StatusCode::BAD_REQUEST,
                    FailureKind::ResourceExhausted => StatusCode::PAYLOAD_TOO_LARGE,
                    FailureKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
                };
                Self::new(status, kind, ApiErrorBody::Message(failure.message))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = match &self.body {
            ApiErrorBody::Error(text) | ApiErrorBody::Message(text) => text.clone(),
        };
        let mut response = (self.status, Json(self.body)).into_response();
        ErrorReport::new(self.kind, detail).attach(&mut response);
        response
    }
}
