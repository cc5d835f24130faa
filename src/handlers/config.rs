use crate::{error::AppResult, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

/// `GET /api/v1/config` - read-only snapshot of the effective configuration.
///
/// There is no PUT counterpart: the model and the filler matcher list are
/// fixed at startup, so nothing here is runtime-mutable.
pub async fn get_config(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": {
            "server": {
                "host": config.server.host,
                "port": config.server.port
            },
            "model": {
                "whisper_model": config.model.whisper_model,
                "language": config.model.language,
                "device": config.model.device
            },
            "upload": {
                "max_file_size_mb": config.upload.max_file_size_mb
            }
        }
    })))
}
