//! API request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;

use rule_forge_core::SaveRuleRequest;

use crate::{ApiError, AppState, AuthUser};

/// Save (create or overwrite) a rule. 201 on first create, 200 on
/// overwrite, derived from the stored row's timestamps.
pub async fn save_rule(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<SaveRuleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rule = state.service.save_rule(user_id, &req.name, &req.code).await?;

    let (status, message) = if rule.is_freshly_created() {
        (StatusCode::CREATED, "Rule created")
    } else {
        (StatusCode::OK, "Rule updated")
    };
    Ok((status, Json(json!({ "message": message }))))
}

pub async fn list_rules(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let rules = state.service.list_rules(user_id).await?;
    Ok(Json(rules))
}

pub async fn get_rule(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.service.get_rule(user_id, &name).await? {
        Some(rule) => Ok(Json(rule)),
        None => Err(ApiError::NotFound(format!("rule '{name}' not found"))),
    }
}

/// Execute a rule with an arbitrary JSON document as input.
pub async fn execute_rule(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(name): Path<String>,
    Json(input): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.service.execute_rule(user_id, &name, &input).await?;
    Ok(Json(json!({ "result": result })))
}

pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.delete_rule(user_id, &name).await?;
    Ok(Json(json!({ "message": "Rule deleted" })))
}

pub async fn health_check() -> impl IntoResponse {
    "OK"
}
