use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState, ai,
    middleware::OptionalClaims,
    utils::{Claims, error_codes, error_to_api_response, success_to_api_response},
};

use super::model::{Analysis, CreateSurveyRequest, Survey, UpdateStatusRequest};

#[axum::debug_handler]
pub async fn create_survey(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateSurveyRequest>,
) -> impl IntoResponse {
    if let Err(msg) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::VALIDATION_ERROR, msg),
        );
    }

    match Survey::create(&state.pool, claims.sub, req).await {
        Ok(survey) => (StatusCode::CREATED, success_to_api_response(survey)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn my_surveys(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match Survey::list_by_user(&state.pool, claims.sub).await {
        Ok(surveys) => (StatusCode::OK, success_to_api_response(surveys)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn public_surveys(State(state): State<AppState>) -> impl IntoResponse {
    match Survey::list_public(&state.pool).await {
        Ok(surveys) => (StatusCode::OK, success_to_api_response(surveys)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn answerable_surveys(
    State(state): State<AppState>,
    Extension(OptionalClaims(claims)): Extension<OptionalClaims>,
) -> impl IntoResponse {
    let user_id = claims.map(|c| c.sub);
    match Survey::list_answerable(&state.pool, user_id).await {
        Ok(surveys) => (StatusCode::OK, success_to_api_response(surveys)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn answered_surveys(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match Survey::list_answered(&state.pool, claims.sub).await {
        Ok(surveys) => (StatusCode::OK, success_to_api_response(surveys)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn inactive_surveys(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match Survey::list_inactive(&state.pool, claims.sub).await {
        Ok(surveys) => (StatusCode::OK, success_to_api_response(surveys)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

/// 作答视图，无需登录
#[axum::debug_handler]
pub async fn get_survey(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match Survey::with_questions(&state.pool, id).await {
        Ok(Some(survey)) => (StatusCode::OK, success_to_api_response(survey)),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "Survey not found".to_string()),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> impl IntoResponse {
    let survey = match Survey::find_by_id(&state.pool, id).await {
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

    if survey.user_id != claims.sub {
        return (
            StatusCode::FORBIDDEN,
            error_to_api_response(
                error_codes::PERMISSION_DENIED,
                "You don't have permission to update this survey".to_string(),
            ),
        );
    }

    match Survey::update_status(&state.pool, id, req.is_active, req.is_public).await {
        Ok(updated) => (StatusCode::OK, success_to_api_response(updated)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn delete_survey(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let survey = match Survey::find_by_id(&state.pool, id).await {
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

    if survey.user_id != claims.sub {
        return (
            StatusCode::FORBIDDEN,
            error_to_api_response(
                error_codes::PERMISSION_DENIED,
                "You don't have permission to delete this survey".to_string(),
            ),
        );
    }

    match Survey::delete_cascade(&state.pool, id).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({
                "success": true
            })),
        ),
        Err(e) => {
            tracing::error!("Cascading delete of survey {} failed: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(
                    error_codes::INTERNAL_ERROR,
                    "Failed to delete survey".to_string(),
                ),
            )
        }
    }
}

/// 聚合结果，仅问卷创建者可见
#[axum::debug_handler]
pub async fn get_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match Survey::results(&state.pool, id).await {
        Ok(Some(results)) => {
            if results.survey.user_id != claims.sub {
                return (
                    StatusCode::FORBIDDEN,
                    error_to_api_response(
                        error_codes::PERMISSION_DENIED,
                        "Not authorized to view these results".to_string(),
                    ),
                );
            }
            (StatusCode::OK, success_to_api_response(results))
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "Survey not found".to_string()),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

/// 生成结构化 AI 分析并落库；AI 失败时仍会落一份基础统计分析
#[axum::debug_handler]
pub async fn analyze_survey(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let results = match Survey::results(&state.pool, id).await {
        Ok(Some(results)) => results,
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

    if results.survey.user_id != claims.sub {
        return (
            StatusCode::FORBIDDEN,
            error_to_api_response(
                error_codes::PERMISSION_DENIED,
                "Not authorized to analyze this survey".to_string(),
            ),
        );
    }

    if results.responses.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "No responses to analyze".to_string(),
            ),
        );
    }

    let insights = ai::generate_survey_analysis(&state.ai, &results).await;
    let insights = match serde_json::to_value(&insights) {
        Ok(value) => value,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
            );
        }
    };

    match Analysis::create(&state.pool, id, insights).await {
        Ok(analysis) => (StatusCode::OK, success_to_api_response(analysis)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

/// 叙述式自由文本总结，不落库
#[axum::debug_handler]
pub async fn analyze_detailed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let results = match Survey::results(&state.pool, id).await {
        Ok(Some(results)) => results,
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

    if results.survey.user_id != claims.sub {
        return (
            StatusCode::FORBIDDEN,
            error_to_api_response(
                error_codes::PERMISSION_DENIED,
                "Not authorized to analyze this survey".to_string(),
            ),
        );
    }

    let description = results
        .survey
        .description
        .clone()
        .unwrap_or_else(|| "No description provided".to_string());
    let analysis = ai::generate_detailed_analysis(
        &state.ai,
        &results.survey.title,
        &description,
        &results.responses,
    )
    .await;

    (
        StatusCode::OK,
        success_to_api_response(serde_json::json!({
            "analysis": analysis
        })),
    )
}
