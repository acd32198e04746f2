//! File upload scaffold: validates and echoes metadata, persists nothing.

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    http::{header, HeaderMap},
    routing::post,
    Json, Router,
};
use base64::prelude::{Engine, BASE64_STANDARD};
use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
// Request cap: documented file cap plus headroom for multipart framing and
// the description field.
const MAX_REQUEST_BYTES: usize = MAX_UPLOAD_BYTES + 1024 * 1024;
pub const ALLOWED_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/pdf",
    "text/plain",
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload).get(usage))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
}

#[derive(Debug, Serialize)]
struct UploadedFile {
    name: String,
    size: usize,
    #[serde(rename = "type")]
    content_type: String,
    description: String,
    #[serde(rename = "uploadedAt", with = "time::serde::rfc3339")]
    uploaded_at: OffsetDateTime,
    url: String,
    preview: String,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    message: &'static str,
    file: UploadedFile,
}

pub fn validate(size: usize, content_type: &str) -> Result<(), ApiError> {
    if size > MAX_UPLOAD_BYTES {
        return Err(ApiError::Validation("File size exceeds 5MB limit".into()));
    }
    if !ALLOWED_TYPES.contains(&content_type) {
        return Err(ApiError::Validation(format!(
            "File type {} not allowed. Allowed types: {}",
            content_type,
            ALLOWED_TYPES.join(", ")
        )));
    }
    Ok(())
}

fn preview(data: &[u8]) -> String {
    let mut encoded = BASE64_STANDARD.encode(data);
    encoded.truncate(100);
    encoded.push_str("...");
    encoded
}

#[instrument(skip(headers, multipart))]
async fn upload(
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    // A declared length past the request cap can never contain an acceptable
    // file; answer with the size error rather than letting the body-limit
    // layer produce a 413.
    let declared_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_length.is_some_and(|len| len > MAX_REQUEST_BYTES) {
        return Err(ApiError::Validation("File size exceeds 5MB limit".into()));
    }

    let mut file: Option<(String, String, bytes::Bytes)> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or("unnamed").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Failed to read file: {e}")))?;
                file = Some((name, content_type, data));
            }
            Some("description") => {
                description = field.text().await.ok();
            }
            _ => {}
        }
    }

    let (name, content_type, data) =
        file.ok_or_else(|| ApiError::Validation("No file provided".into()))?;
    validate(data.len(), &content_type)?;

    info!(%name, size = data.len(), %content_type, "upload accepted");
    Ok(Json(UploadResponse {
        message: "File uploaded successfully",
        file: UploadedFile {
            url: format!("/uploads/{name}"),
            name,
            size: data.len(),
            content_type,
            description: description.unwrap_or_else(|| "No description provided".into()),
            uploaded_at: OffsetDateTime::now_utc(),
            preview: preview(&data),
        },
    }))
}

async fn usage() -> Json<serde_json::Value> {
    Json(json!({
        "endpoint": "/api/upload",
        "method": "POST",
        "limits": {
            "maxFileSize": "5MB",
            "allowedTypes": ALLOWED_TYPES,
            "maxFiles": 1
        },
        "usage": {
            "description": "Upload a file with optional description",
            "parameters": {
                "file": "File (required)",
                "description": "String (optional)"
            }
        }
    }))
}
