use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    scoring,
    web::{
        AppState,
        models::CandidateRecord,
        responses::{ApiMessage, json_error},
    },
};

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub resume_text: String,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub use_ai: bool,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub data: CandidateRecord,
}

/// Programmatic access to the analysis pipeline. The submission is persisted
/// like any other so the returned record carries its application id.
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, (StatusCode, Json<ApiMessage>)> {
    let resume_text = request.resume_text.trim().to_string();
    if resume_text.is_empty() {
        return Err(json_error(StatusCode::BAD_REQUEST, "No resume text"));
    }

    let job_description = request.job_description.unwrap_or_default();
    let result = scoring::analyze_resume(
        state.llm_client(),
        state.lexicon(),
        &resume_text,
        &job_description,
        request.use_ai,
    )
    .await;

    let candidate_id = state
        .store()
        .save_candidate(result, None, None, resume_text, None, None)
        .await
        .map_err(|err| {
            error!(?err, "failed to persist API analysis");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not save the analysis result",
            )
        })?;

    // Read back the stored record so the response matches persistence.
    match state.store().candidate(candidate_id).await {
        Some(record) => Ok(Json(AnalyzeResponse {
            success: true,
            data: record,
        })),
        None => Err(json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not load the saved analysis result",
        )),
    }
}
