use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    middleware::OptionalClaims,
    routes::survey::model::Survey,
    utils::{error_codes, error_to_api_response, success_to_api_response},
};

use super::model::{SubmitResponseRequest, SurveyResponse, validate_answers};

/// 匿名和登录用户都可以提交；登录用户的响应会记下 user_id
#[axum::debug_handler]
pub async fn submit_response(
    State(state): State<AppState>,
    Extension(OptionalClaims(claims)): Extension<OptionalClaims>,
    Path(id): Path<i64>,
    Json(req): Json<SubmitResponseRequest>,
) -> impl IntoResponse {
    let survey = match Survey::with_questions(&state.pool, id).await {
        Ok(Some(survey)) => survey,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                error_to_api_response(error_codes::NOT_FOUND, "Survey not found".to_string()),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
            );
        }
    };

    if let Err(msg) = validate_answers(&survey.questions, &req.answers) {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::VALIDATION_ERROR, msg),
        );
    }

    let user_id = claims.map(|c| c.sub);
    match SurveyResponse::submit(&state.pool, id, user_id, req.answers).await {
        Ok(response) => (StatusCode::CREATED, success_to_api_response(response)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}
