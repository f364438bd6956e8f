// src/handlers/sanitize.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use validator::Validate;

use crate::{error::AppError, utils::html::Sanitizer, utils::policy::PurifierOverrides};

/// DTO for sanitizing a bare HTML fragment.
#[derive(Debug, Deserialize, Validate)]
pub struct SanitizeRequest {
    #[validate(length(max = 100000))]
    pub html: String,

    #[serde(default)]
    pub overrides: PurifierOverrides,
}

/// Sanitizes `html` under the default policy merged with `overrides`.
pub async fn sanitize_html(
    State(sanitizer): State<Arc<Sanitizer>>,
    Json(payload): Json<SanitizeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let html = if payload.html.is_empty() {
        String::new()
    } else {
        sanitizer.sanitize(&payload.html, &payload.overrides)?
    };

    Ok(Json(serde_json::json!({ "html": html })))
}
