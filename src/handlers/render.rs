// src/handlers/render.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::collections::HashMap;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        declaration::FieldDeclaration,
        record::Record,
        visibility::{RequestContext, View},
    },
    utils::html::Sanitizer,
};

/// DTO for rendering one declared field against one record.
#[derive(Debug, Deserialize, Validate)]
pub struct RenderRequest {
    #[validate(nested)]
    pub field: FieldDeclaration,

    #[serde(default)]
    pub record: Record,

    #[serde(default)]
    pub view: View,

    /// Overrides the declared attribute for this resolution only.
    #[validate(length(min = 1, max = 255))]
    pub attribute: Option<String>,

    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Resolves and sanitizes a declared field.
///
/// Returns the field descriptor, or 204 when the field is hidden on the
/// requested view.
pub async fn render_field(
    State(sanitizer): State<Arc<Sanitizer>>,
    Json(payload): Json<RenderRequest>,
) -> Result<Response, AppError> {
    payload.validate()?;

    let request = RequestContext {
        view: payload.view,
        params: payload.params,
    };
    let mut field = payload.field.into_field(sanitizer);

    if !field.is_visible_for(&request) {
        tracing::debug!("Field '{}' hidden on {:?} view", field.name(), request.view);
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    field.resolve_for_display(&payload.record, payload.attribute.as_deref())?;

    Ok(Json(field.json_serialize()).into_response())
}
