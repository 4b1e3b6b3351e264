use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    config::Config,
    utils::{Claims, error_codes, error_to_api_response, verify_token},
};

/// 可选身份：公开路由上也携带已解析的用户（匿名则为 None）
#[derive(Debug, Clone)]
pub struct OptionalClaims(pub Option<Claims>);

fn bearer_claims(req: &Request<Body>, config: &Config) -> Option<Claims> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let token = header.strip_prefix("Bearer ")?;
    verify_token(token, config).ok()
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match bearer_claims(&req, &state.config) {
        Some(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            error_to_api_response::<()>(
                error_codes::AUTH_FAILED,
                "Authentication required".to_string(),
            ),
        )
            .into_response(),
    }
}

pub async fn optional_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let claims = bearer_claims(&req, &state.config);
    req.extensions_mut().insert(OptionalClaims(claims));
    next.run(req).await
}
