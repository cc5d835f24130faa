//! # Audio Analysis Handler
//!
//! The one endpoint this service exists for: `POST /analyze`.
//!
//! ## Request Flow:
//! 1. Read the multipart upload (one audio file in a `file` field)
//! 2. Stage it to a request-owned temp file
//! 3. Transcribe the staged audio with the Whisper engine
//! 4. Run the filler analysis over the transcript
//! 5. Answer with the analysis, or with the failure message
//!
//! ## Response Contract:
//! - Success: `{"success": true, "analysis": {...}}`
//! - Failure: `{"success": false, "error": "..."}` at the server's default
//!   status — transcription failures are part of normal operation here, not
//!   HTTP errors.
//!
//! The staged temp file is dropped when the request scope ends, on success
//! and on every failure path alike.

use crate::analysis::{self, AnalysisResult};
use crate::error::AppError;
use crate::state::AppState;
use crate::upload::StagedAudio;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use serde_json::json;
use tracing::{info, warn};

/// Multipart field the upload must arrive in.
const UPLOAD_FIELD: &str = "file";

pub async fn analyze_audio(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> HttpResponse {
    let max_bytes = state.get_config().max_upload_bytes();

    let audio_bytes = match read_upload(&mut payload, max_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Rejected /analyze upload: {}", e);
            return failure_response(&e.to_string());
        }
    };

    match run_pipeline(&state, &audio_bytes).await {
        Ok(result) => {
            state.record_analysis_completed();
            info!(
                total_words = result.total_words,
                filler_count = result.filler_count,
                "Analysis completed"
            );
            HttpResponse::Ok().json(json!({
                "success": true,
                "analysis": result
            }))
        }
        Err(e) => {
            state.record_transcription_failure();
            warn!("Analysis pipeline failed: {}", e);
            failure_response(&e.to_string())
        }
    }
}

/// Stage the upload, transcribe it, analyze the transcript.
///
/// `StagedAudio` is scoped to this function: whichever way it returns, the
/// temp file is released when `staged` drops, and that cleanup cannot mask
/// the error being propagated.
async fn run_pipeline(state: &AppState, audio_bytes: &[u8]) -> Result<AnalysisResult, AppError> {
    let staged = StagedAudio::stage(audio_bytes)
        .map_err(|e| AppError::Transcription(e.to_string()))?;

    let transcript = state
        .engine
        .transcribe_file(staged.path())
        .await
        .map_err(|e| AppError::Transcription(e.to_string()))?;

    Ok(analysis::analyze(&transcript))
}

/// Collect the uploaded audio bytes from the multipart stream.
async fn read_upload(payload: &mut Multipart, max_bytes: usize) -> Result<Vec<u8>, AppError> {
    let mut audio_data: Option<Vec<u8>> = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;

        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .map(|s| s.to_string());

        if field_name.as_deref() != Some(UPLOAD_FIELD) {
            continue;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::BadRequest(format!("Upload read error: {}", e)))?;
            bytes.extend_from_slice(&chunk);

            if bytes.len() > max_bytes {
                return Err(AppError::ValidationError(format!(
                    "File too large (max: {} bytes)",
                    max_bytes
                )));
            }
        }

        audio_data = Some(bytes);
    }

    audio_data.ok_or_else(|| AppError::ValidationError("No audio file provided".to_string()))
}

fn failure_response(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": false,
        "error": message
    }))
}
