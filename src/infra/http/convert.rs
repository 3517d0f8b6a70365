use axum::{
    body::Bytes,
    extract::{
        Query, State,
        rejection::{BytesRejection, QueryRejection},
    },
    http::{
        HeaderMap, HeaderValue,
        header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};

use super::{
    HttpState,
    docs::{BinaryFile, ConvertBody, ConvertQuery},
    error::{ApiError, ApiErrorBody},
    negotiate::{accepted_types, negotiate},
};
use crate::{
    application::convert::{ConvertError, RenderedFile},
    domain::ConversionRequest,
};

/// `POST /convert`: a JSON document carrying the source and typed options.
#[utoipa::path(
    post,
    path = "/convert",
    request_body = ConvertBody,
    responses(
        (status = 200, description = "The rendered file.", content(
            (BinaryFile = "image/png"),
            (BinaryFile = "image/jpeg"),
            (BinaryFile = "image/svg+xml; charset=utf-8"),
            (BinaryFile = "application/pdf"),
        )),
        (status = 400, description = "Invalid request, or the renderer rejected the document.", body = ApiErrorBody),
        (status = 413, description = "The body is too large, or the renderer ran out of memory.", body = ApiErrorBody),
        (status = 500, description = "The renderer could not be run.", body = ApiErrorBody),
    )
)]
pub async fn convert_json(
    State(state): State<HttpState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(ApiError::from_body_rejection)?;
    let request = ConversionRequest::from_json_body(&body).map_err(ConvertError::from)?;
    render(&state, request).await
}

/// `POST /convert_file`: the body is the diagram, the format comes from
/// `Accept` and options from the query string.
#[utoipa::path(
    post,
    path = "/convert_file",
    description = "The output format is negotiated from the Accept header; png when it is absent.",
    params(ConvertQuery),
    request_body(content = BinaryFile, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "The rendered file.", content(
            (BinaryFile = "image/png"),
            (BinaryFile = "image/jpeg"),
            (BinaryFile = "image/svg+xml; charset=utf-8"),
            (BinaryFile = "application/pdf"),
        )),
        (status = 400, description = "Invalid modifiers, or the renderer rejected the document.", body = ApiErrorBody),
        (status = 406, description = "None of the accepted media types can be produced.", body = ApiErrorBody),
        (status = 413, description = "The body is too large, or the renderer ran out of memory.", body = ApiErrorBody),
        (status = 500, description = "The renderer could not be run.", body = ApiErrorBody),
    )
)]
pub async fn convert_upload(
    State(state): State<HttpState>,
    headers: HeaderMap,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(ApiError::from_query_rejection)?;
    let body = body.map_err(ApiError::from_body_rejection)?;
    // An opaque (non-visible-ASCII) header names nothing we can produce.
    let accept = headers
        .get(ACCEPT)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| ConvertError::not_acceptable(accepted_types()))
        })
        .transpose()?;

    let format = negotiate(accept)?;
    let request =
        ConversionRequest::from_raw_upload(body, format, &query).map_err(ConvertError::from)?;
    render(&state, request).await
}

async fn render(state: &HttpState, request: ConversionRequest) -> Result<Response, ApiError> {
    let file = state
        .invoker
        .render(&request)
        .await
        .map_err(ConvertError::from)?;
    Ok(file_response(file))
}

fn file_response(file: RenderedFile) -> Response {
    let content_type = file.content_type();
    let disposition = format!("inline; filename=\"{}\"", file.file_name);
    let mut response = file.bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(CONTENT_DISPOSITION, value);
    }
    response
}
