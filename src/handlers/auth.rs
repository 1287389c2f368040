use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::error::Result;
use crate::models::{CurrentUser, LoginRequest, MessageResponse, SignupRequest, UserInfoResponse};
use crate::services::AuthService;
use crate::AppState;

/// Register a new user
/// POST /signup
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse> {
    AuthService::signup(&state.db, &state.captcha, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully".to_string(),
        }),
    ))
}

/// Login user
/// POST /login
///
/// The token is returned in the body and mirrored into an http-only cookie
/// carrying the same claims.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let response = AuthService::login(&state.db, &state.config, &state.captcha, req).await?;

    let cookie = Cookie::build(("token", response.token.clone()))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.config.jwt.cookie_secure)
        .path("/")
        .build();
    let jar = CookieJar::new().add(cookie);

    Ok((jar, Json(response)))
}

/// Identity info for the frontend
/// GET /userinfo
pub async fn userinfo(
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<UserInfoResponse>> {
    Ok(Json(UserInfoResponse {
        user_id: current_user.id.clone(),
        is_admin: current_user.is_admin(),
    }))
}
