//! Machine-readable description of the conversion endpoints.

use axum::{Json, response::IntoResponse};
use utoipa::{IntoParams, OpenApi, ToSchema};

use super::{convert, error::ApiErrorBody};
use crate::domain::OutputFormat;

/// `POST /convert` body.
#[derive(ToSchema)]
pub struct ConvertBody {
    /// The draw.io document.
    pub source: String,
    /// Output format; `png` when omitted.
    pub format: Option<OutputFormat>,
    /// JPEG quality; jpeg only.
    #[schema(minimum = 1, maximum = 100)]
    pub quality: Option<i64>,
    /// Transparent background; png only.
    pub transparent: Option<bool>,
    /// Embed a copy of the diagram in the image; png only.
    pub embed: Option<bool>,
    #[schema(minimum = 0, maximum = 10000)]
    pub border: Option<i64>,
    #[schema(exclusive_minimum = 0, maximum = 5)]
    pub scale: Option<f64>,
    #[schema(minimum = 10, maximum = 131072)]
    pub width: Option<i64>,
    #[schema(minimum = 10, maximum = 131072)]
    pub height: Option<i64>,
    /// Crop to the diagram bounds; pdf only.
    pub crop: Option<bool>,
}

/// `POST /convert_file` modifiers. Booleans also accept `yes`/`no`,
/// `on`/`off` and `1`/`0`.
#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConvertQuery {
    /// JPEG quality; jpeg only.
    #[param(minimum = 1, maximum = 100)]
    pub quality: Option<i64>,
    /// Transparent background; png only.
    pub transparent: Option<bool>,
    /// Embed a copy of the diagram in the image; png only.
    pub embed: Option<bool>,
    #[param(minimum = 0, maximum = 10000)]
    pub border: Option<i64>,
    #[param(exclusive_minimum = 0, maximum = 5)]
    pub scale: Option<f64>,
    #[param(minimum = 10, maximum = 131072)]
    pub width: Option<i64>,
    #[param(minimum = 10, maximum = 131072)]
    pub height: Option<i64>,
    /// Crop to the diagram bounds; pdf only.
    pub crop: Option<bool>,
}

/// Raw file bytes: an uploaded diagram or a rendered image.
#[derive(ToSchema)]
#[schema(value_type = String, format = Binary)]
pub struct BinaryFile(pub Vec<u8>);

#[derive(OpenApi)]
#[openapi(
    paths(convert::convert_json, convert::convert_upload),
    components(schemas(ConvertBody, OutputFormat, BinaryFile, ApiErrorBody))
)]
pub struct ApiDoc;

pub async fn openapi() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
