use crate::AppState;
use crate::api::error::AppError;
use crate::models::Operation;
use crate::services::pdf_info;
use crate::services::storage::{StagedFile, StorageError};
use crate::utils::validation::{HEADER_PEEK_SIZE, sanitize_filename, verify_pdf_header};
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{Field, MultipartError},
    },
    http::StatusCode,
};
use futures::TryStreamExt;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Serialize;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::StreamReader;
use tracing::{debug, error, info};
use utoipa::ToSchema;

/// Characters escaped when a file name becomes a URL path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/');

#[derive(Serialize, ToSchema)]
pub struct ProcessResponse {
    pub download_url: String,
    pub original_size: u64,
    pub processed_size: u64,
}

/// Multipart form accepted by `POST /process`
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ProcessForm {
    #[schema(value_type = String, format = Binary)]
    pub pdf: Vec<u8>,
    pub operation: Operation,
}

enum FileField {
    /// The form carried a file input with no file chosen
    Empty,
    /// The file failed name or PDF checks
    Rejected(AppError),
    Staged { filename: String, staged: StagedFile },
}

#[utoipa::path(
    post,
    path = "/process",
    request_body(content = ProcessForm, content_type = "multipart/form-data", description = "PDF upload and operation"),
    responses(
        (status = 200, description = "Operation succeeded", body = ProcessResponse),
        (status = 400, description = "Missing file or operation, non-PDF upload, or invalid operation"),
        (status = 413, description = "Upload too large"),
        (status = 500, description = "Operation failed")
    ),
    tag = "pdf"
)]
pub async fn process_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, AppError> {
    let mut file_field = None;
    let mut operation = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "pdf" => {
                let original_filename = field.file_name().unwrap_or_default().to_string();
                if original_filename.is_empty() {
                    file_field = Some(FileField::Empty);
                    continue;
                }

                let filename = match sanitize_filename(&original_filename) {
                    Ok(filename) => filename,
                    Err(e) => {
                        file_field =
                            Some(FileField::Rejected(AppError::BadRequest(e.to_string())));
                        continue;
                    }
                };

                file_field = Some(match stage_upload(&state, field).await {
                    Ok(staged) => FileField::Staged { filename, staged },
                    Err(e @ AppError::BadRequest(_)) => FileField::Rejected(e),
                    Err(e) => return Err(e),
                });
            }
            "operation" => {
                operation = Some(field.text().await.map_err(multipart_error)?);
            }
            other => debug!("Ignoring unexpected form field '{}'", other),
        }
    }

    let (Some(file_field), Some(operation)) = (file_field, operation) else {
        return Err(AppError::BadRequest("Missing file or operation".to_string()));
    };

    // A file that failed the PDF check is only reported once the form itself is valid.
    // An unknown operation drops the staged upload without touching the directory
    let (operation, filename, staged) = match (file_field, operation.parse::<Operation>()) {
        (FileField::Empty, _) => {
            return Err(AppError::BadRequest("No file selected".to_string()));
        }
        (_, Err(_)) => return Err(AppError::BadRequest("Invalid operation".to_string())),
        (FileField::Rejected(e), Ok(_)) => return Err(e),
        (FileField::Staged { filename, staged }, Ok(operation)) => (operation, filename, staged),
    };

    let original_size = staged.size();
    let input_path = state.storage.promote(staged, &filename).await?;

    let output_name = operation.output_filename(&filename);
    let output_path = state.storage.path_for(&output_name);

    // A leftover output from an earlier run must not pass for this run's result
    match tokio::fs::remove_file(&output_path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
        _ => {}
    }

    info!(
        "⚙️  Running '{}' on {} ({} bytes)",
        operation, filename, original_size
    );
    let started = Instant::now();

    let processed_size = match state
        .processor
        .process(operation, &input_path, &output_path)
        .await
    {
        Ok(()) => state.storage.file_size(&output_path).await.ok(),
        Err(e) => {
            error!("❌ Operation '{}' failed for {}: {}", operation, filename, e);
            None
        }
    };

    let Some(processed_size) = processed_size else {
        return Err(AppError::OperationFailed(format!(
            "Operation '{}' failed",
            operation
        )));
    };

    info!(
        "✅ '{}' finished for {} in {:?}: {} -> {} bytes",
        operation,
        filename,
        started.elapsed(),
        original_size,
        processed_size
    );
    if operation == Operation::Ocr {
        pdf_info::spawn_parity_check(input_path, output_path);
    }

    Ok(Json(ProcessResponse {
        download_url: format!(
            "/download/{}",
            utf8_percent_encode(&output_name, PATH_SEGMENT)
        ),
        original_size,
        processed_size,
    }))
}

/// Stream the file field to a staging file after checking it starts like a PDF
async fn stage_upload(state: &AppState, field: Field<'_>) -> Result<StagedFile, AppError> {
    let body = field.map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err));
    let mut reader = StreamReader::new(Box::pin(body));

    let mut header = vec![0u8; HEADER_PEEK_SIZE];
    let n = read_header(&mut reader, &mut header)
        .await
        .map_err(upload_read_error)?;
    header.truncate(n);

    verify_pdf_header(&header).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let chained = std::io::Cursor::new(header).chain(reader);
    state.storage.stage(chained).await.map_err(|e| match e {
        StorageError::TooLarge(e) => AppError::PayloadTooLarge(e.to_string()),
        StorageError::Io(e) => upload_read_error(e),
    })
}

async fn read_header<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn rejected_upload(status: StatusCode, message: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(message)
    } else {
        AppError::BadRequest(message)
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    rejected_upload(e.status(), e.body_text())
}

/// Read errors caused by the multipart stream are client errors; anything else is ours
fn upload_read_error(e: std::io::Error) -> AppError {
    match e
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<MultipartError>())
    {
        Some(inner) => rejected_upload(inner.status(), inner.body_text()),
        None => AppError::Io(e),
    }
}
