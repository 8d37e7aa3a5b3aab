use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/", post(upload_avatar))
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    avatar_url: String,
}

/// POST /api/v1/uploads - Store a custom avatar image
///
/// Returns the relative URL the join form later hands back as an
/// uploaded-file URL or a `custom_avatar_<token>` selection.
async fn upload_avatar(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("avatar") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::BadRequest(
                "Only image allowed. Please try again.".to_string(),
            ));
        }

        let original_name = sanitize_filename(field.file_name().unwrap_or("avatar"));
        let bytes = field.bytes().await?;

        // A declared image content type is not enough; a corrupt payload
        // must come back as a client error, not a stored junk file.
        if !looks_like_image(&bytes) {
            return Err(AppError::BadRequest(
                "Image file is corrupt or unsupported. Please try again.".to_string(),
            ));
        }

        let stored_name = format!("{}-{}", Utc::now().timestamp_millis(), original_name);
        let path = state.config.uploads_dir.join(&stored_name);

        tokio::fs::create_dir_all(&state.config.uploads_dir).await?;
        tokio::fs::write(&path, &bytes).await?;

        tracing::info!(file = %stored_name, size = bytes.len(), "Avatar uploaded");

        return Ok(Json(UploadResponse {
            avatar_url: format!("/uploads/{}", stored_name),
        }));
    }

    Err(AppError::BadRequest("Upload at least one image".to_string()))
}

/// Keep only characters that are safe in a stored file name.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    if cleaned.is_empty() {
        "avatar".to_string()
    } else {
        cleaned
    }
}

/// Magic-byte check for the image formats browsers upload.
fn looks_like_image(bytes: &[u8]) -> bool {
    bytes.starts_with(b"\x89PNG\r\n\x1a\n")
        || bytes.starts_with(b"\xff\xd8\xff")
        || bytes.starts_with(b"GIF87a")
        || bytes.starts_with(b"GIF89a")
        || (bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP")
}
