//! HTTP route handlers.

use super::error::ApiResponse;
use super::state::AppState;
use crate::chat::{ChatReply, ChatRequest};
use crate::error::ApiError;
use crate::patient::{Appointment, Billing, Medication, PatientSummary, TestResult};
use crate::store::InteractionTurn;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Build the router. Path params use `:param` syntax (axum 0.7).
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat/message", post(send_message))
        .route("/api/chat/history/:userid", get(get_history))
        .route("/api/chat/questions/:userid", get(get_questions))
        .route(
            "/api/chat/contexts/:userid",
            get(get_contexts).delete(clear_contexts),
        )
        .route("/api/patient/:patient_id", get(patient_summary))
        .route("/api/patient/:patient_id/appointments", get(appointments))
        .route("/api/patient/:patient_id/medications", get(medications))
        .route("/api/patient/:patient_id/test-results", get(test_results))
        .route("/api/patient/:patient_id/billing", get(billing))
        .fallback(not_found)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    environment: String,
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        environment: state.environment.clone(),
    })
}

/// POST /api/chat/message
async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ChatReply>>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let reply = state.chat.send_message(request).await?;
    Ok(ApiResponse::ok(reply))
}

/// GET /api/chat/history/:userid
async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    match state.chat.history(&user_id)? {
        Some(record) if !record.turns.is_empty() => {
            Ok(ApiResponse::<Vec<InteractionTurn>>::ok(record.turns).into_response())
        }
        _ => Ok(ApiResponse::<()>::unsuccessful("No history found for this user").into_response()),
    }
}

/// GET /api/chat/questions/:userid
async fn get_questions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    Ok(ApiResponse::ok(state.chat.recent_questions(&user_id)?))
}

/// GET /api/chat/contexts/:userid
async fn get_contexts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    Ok(ApiResponse::ok(state.chat.contexts(&user_id)?))
}

#[derive(Serialize)]
struct Cleared {
    cleared: bool,
}

/// DELETE /api/chat/contexts/:userid
async fn clear_contexts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Cleared>>, ApiError> {
    let cleared = state.chat.clear_contexts(&user_id)?;
    Ok(ApiResponse::ok(Cleared { cleared }))
}

/// GET /api/patient/:patient_id
async fn patient_summary(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<ApiResponse<PatientSummary>>, ApiError> {
    Ok(ApiResponse::ok(state.patients.summary(&patient_id, Utc::now())?))
}

async fn appointments(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Appointment>>>, ApiError> {
    Ok(ApiResponse::ok(state.patients.appointments(&patient_id)?))
}

async fn medications(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Medication>>>, ApiError> {
    Ok(ApiResponse::ok(state.patients.medications(&patient_id)?))
}

async fn test_results(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<TestResult>>>, ApiError> {
    Ok(ApiResponse::ok(state.patients.test_results(&patient_id)?))
}

/// Billing is `data: null` when the patient has none.
async fn billing(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let billing: Option<Billing> = state.patients.billing(&patient_id)?;
    Ok(Json(serde_json::json!({ "success": true, "data": billing })))
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Route not found" })),
    )
}
