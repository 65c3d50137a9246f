//! Upload, render request, status and download handlers.

use axum::body::{Body, Bytes};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use greenroom_models::{CompositionSettings, Job, JobId, RenderMode};
use serde::Serialize;
use tokio_util::io::ReaderStream;

use crate::error::{ApiError, ApiResult};
use crate::services::{CreatedJob, JobUpload, UploadedFile};
use crate::state::AppState;

const MISSING_SETTINGS: &str = "Missing settings in request body";

/// Body of a 202 response.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub message: String,
}

/// `POST /api/process`: multipart upload of the source and background.
pub async fn process(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<CreatedJob>> {
    let mut upload = JobUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "sourceVideo" | "background" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                // Browsers send an empty part for an unselected file input.
                if bytes.is_empty() && file_name.as_deref().unwrap_or_default().is_empty() {
                    continue;
                }
                let file = Some(UploadedFile { file_name, bytes });
                if name == "sourceVideo" {
                    upload.source = file;
                } else {
                    upload.background = file;
                }
            }
            "isTransparent" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                upload.is_transparent = text == "true";
            }
            "settings" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                if !text.trim().is_empty() {
                    let settings: CompositionSettings = serde_json::from_str(&text)
                        .map_err(|e| ApiError::validation(e.to_string()))?;
                    upload.settings = Some(settings);
                }
            }
            _ => {}
        }
    }

    let created = state.jobs.create_job(upload).await?;
    Ok(Json(created))
}

/// `POST /api/export/:job_id`: queue a full-quality render.
pub async fn export(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    request_render(&state, job_id, &body, RenderMode::Export).await?;
    Ok(accepted("Export process started."))
}

/// `POST /api/preview/:job_id`: queue a fast low-quality render.
pub async fn preview(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    request_render(&state, job_id, &body, RenderMode::Preview).await?;
    Ok(accepted("Preview render started."))
}

/// `GET /api/status/:job_id`
pub async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    let job = state.jobs.get_status(&JobId::from(job_id)).await?;
    Ok(Json(job))
}

/// `GET /api/download/:job_id`: the finished export or preview render.
pub async fn download(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let path = state.jobs.fetch_result(&JobId::from(job_id)).await?;
    let file = tokio::fs::File::open(&path).await?;
    let length = file.metadata().await?.len();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("output")
        .to_string();

    Ok((
        [
            (header::CONTENT_TYPE, content_type(&file_name).to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

async fn request_render(
    state: &AppState,
    job_id: String,
    body: &[u8],
    mode: RenderMode,
) -> ApiResult<()> {
    let job_id = JobId::from(job_id);
    state.jobs.uploaded_job(&job_id).await?;

    let settings = parse_settings(body)?;
    state.jobs.request_render(&job_id, settings, mode).await
}

/// Settings from a JSON request body. An empty body or `null` is rejected.
fn parse_settings(body: &[u8]) -> ApiResult<CompositionSettings> {
    let value: serde_json::Value = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(body).map_err(|e| ApiError::bad_request(e.to_string()))?
    };

    match value {
        serde_json::Value::Null => Err(ApiError::bad_request(MISSING_SETTINGS)),
        serde_json::Value::Object(map) if map.is_empty() => {
            Err(ApiError::bad_request(MISSING_SETTINGS))
        }
        value => serde_json::from_value(value).map_err(|e| ApiError::validation(e.to_string())),
    }
}

fn accepted(message: &str) -> (StatusCode, Json<AcceptedResponse>) {
    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            message: message.to_string(),
        }),
    )
}

fn content_type(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next().unwrap_or_default() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "gif" => "image/gif",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenroom_models::OutputFormat;

    #[test]
    fn test_parse_settings() {
        let settings = parse_settings(br#"{"format":"gif"}"#).unwrap();
        assert_eq!(settings.format, OutputFormat::Gif);

        assert_eq!(parse_settings(b"").unwrap_err().to_string(), MISSING_SETTINGS);
        assert_eq!(parse_settings(b"null").unwrap_err().to_string(), MISSING_SETTINGS);
        assert_eq!(parse_settings(b"{}").unwrap_err().to_string(), MISSING_SETTINGS);
        assert!(matches!(
            parse_settings(br#"{"similarity":"high"}"#).unwrap_err(),
            ApiError::Validation(_)
        ));
        assert!(matches!(parse_settings(b"{nope").unwrap_err(), ApiError::BadRequest(_)));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("output.mov"), "video/quicktime");
        assert_eq!(content_type("preview.mp4"), "video/mp4");
        assert_eq!(content_type("output"), "application/octet-stream");
    }
}
