use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::config::Settings;
use crate::core::security;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::auth::LoginRequest;
use crate::schemas::user::UserResponse;

const BAD_CREDENTIALS: &str = "Incorrect username or password";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<UserResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let user = repositories::users::find_by_school_username(
        state.db(),
        &payload.school_id,
        &payload.username,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load user"))?
    .ok_or(ApiError::Unauthorized(BAD_CREDENTIALS))?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized(BAD_CREDENTIALS))?;
    if !verified || !user.is_active {
        tracing::info!(school_id = %payload.school_id, username = %payload.username, "Login rejected");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
    }

    let token =
        security::create_session_token(&user.id, user.role, &user.school_id, state.settings(), None)
            .map_err(|e| ApiError::internal(e, "Failed to create session token"))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(state.settings(), &token)?);

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User logged in");
    Ok((headers, Json(UserResponse::from_db(user))))
}

async fn logout(State(state): State<AppState>) -> Result<(StatusCode, HeaderMap), ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, expired_cookie(state.settings())?);
    Ok((StatusCode::NO_CONTENT, headers))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

fn cookie_attributes(settings: &Settings) -> &'static str {
    if settings.session().cookie_secure {
        "HttpOnly; SameSite=Lax; Path=/; Secure"
    } else {
        "HttpOnly; SameSite=Lax; Path=/"
    }
}

fn session_cookie(settings: &Settings, token: &str) -> Result<HeaderValue, ApiError> {
    let max_age = settings.security().access_token_expire_minutes * 60;
    let cookie = format!(
        "{}={token}; Max-Age={max_age}; {}",
        settings.session().cookie_name,
        cookie_attributes(settings)
    );
    HeaderValue::from_str(&cookie).map_err(|e| ApiError::internal(e, "Invalid session cookie"))
}

fn expired_cookie(settings: &Settings) -> Result<HeaderValue, ApiError> {
    let cookie =
        format!("{}=; Max-Age=0; {}", settings.session().cookie_name, cookie_attributes(settings));
    HeaderValue::from_str(&cookie).map_err(|e| ApiError::internal(e, "Invalid session cookie"))
}
