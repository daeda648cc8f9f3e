use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::orchestrator::AnalysisOutcome;
use crate::screening::facts::is_valid_address;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScreeningQuery {
    /// Send the message here instead of the address found in the résumé.
    pub recipient: Option<String>,
}

/// POST /api/v1/screenings
/// Multipart upload with a `file` field. Screens the document and dispatches the message.
pub async fn handle_screen(
    State(state): State<AppState>,
    Query(params): Query<ScreeningQuery>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisOutcome>, AppError> {
    let recipient = match params.recipient.as_deref().map(str::trim) {
        Some(addr) if !is_valid_address(addr) => {
            return Err(AppError::Validation(format!("Invalid recipient address: '{addr}'")));
        }
        other => other,
    };

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let document_id = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        upload = Some((document_id, bytes.to_vec()));
        break;
    }

    let (document_id, bytes) =
        upload.ok_or_else(|| AppError::Validation("Missing multipart field 'file'".to_string()))?;
    info!("Screening upload {} ({} bytes)", document_id, bytes.len());

    let outcome = state
        .screener
        .process_bytes(&document_id, &bytes, recipient)
        .await?;
    Ok(Json(outcome))
}
