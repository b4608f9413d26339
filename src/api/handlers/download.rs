use crate::AppState;
use crate::api::error::AppError;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tokio_util::io::ReaderStream;

#[utoipa::path(
    get,
    path = "/download/{filename}",
    params(
        ("filename" = String, Path, description = "Name of a processed file")
    ),
    responses(
        (status = 200, description = "File download stream"),
        (status = 404, description = "File not found")
    ),
    tag = "pdf"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound("File not found.".to_string());

    let path = state
        .storage
        .resolve_download(&filename)
        .await
        .ok_or_else(not_found)?;

    let file = tokio::fs::File::open(&path).await.map_err(|_| not_found())?;
    let size = file.metadata().await?.len();

    let (content_type, content_disposition) = attachment_headers(&filename);
    tracing::info!("📎 Serving {} ({} bytes)", filename, size);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .header(header::CONTENT_LENGTH, size)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Content type and an attachment disposition carrying both an ASCII
/// fallback name and the RFC 5987 encoded original
pub(crate) fn attachment_headers(filename: &str) -> (String, String) {
    let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    let content_type = match extension.as_str() {
        "pdf" => mime::APPLICATION_PDF.to_string(),
        _ => mime::APPLICATION_OCTET_STREAM.to_string(),
    };

    let ascii_filename = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .take(64)
        .collect::<String>();
    let fallback_filename = if ascii_filename.is_empty() {
        "file"
    } else {
        &ascii_filename
    };

    let encoded_filename = utf8_percent_encode(filename, NON_ALPHANUMERIC).to_string();

    (
        content_type,
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback_filename, encoded_filename
        ),
    )
}
