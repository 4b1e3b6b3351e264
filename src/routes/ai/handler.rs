use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState, ai,
    utils::{error_codes, error_to_api_response, success_to_api_response},
};

use super::model::{GenerateQuestionsRequest, PredictSurveyRequest};

const DEFAULT_QUESTION_COUNT: usize = 5;

#[axum::debug_handler]
pub async fn generate_questions(
    State(state): State<AppState>,
    Json(req): Json<GenerateQuestionsRequest>,
) -> impl IntoResponse {
    if req.topic.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "Topic is required".to_string(),
            ),
        );
    }

    let description = req.description.as_deref().unwrap_or("");
    let num_questions = req.num_questions.unwrap_or(DEFAULT_QUESTION_COUNT);
    let questions =
        ai::generate_survey_questions(&state.ai, req.topic.trim(), description, num_questions)
            .await;

    (StatusCode::OK, success_to_api_response(questions))
}

#[axum::debug_handler]
pub async fn predict_survey(
    State(state): State<AppState>,
    Json(req): Json<PredictSurveyRequest>,
) -> impl IntoResponse {
    if req.title.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "Title is required".to_string(),
            ),
        );
    }

    let description = req.description.as_deref().unwrap_or("");
    let question_count = req.questions.len();
    let required_count = req.questions.iter().filter(|q| q.required).count();

    let prediction = ai::generate_survey_predictions(
        &state.ai,
        req.title.trim(),
        description,
        question_count,
        required_count,
        req.previous_stats.as_ref(),
    )
    .await;

    (StatusCode::OK, success_to_api_response(prediction))
}
