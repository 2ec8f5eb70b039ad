use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::security::{self, SessionClaims};
use crate::core::state::AppState;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;

const INVALID_SESSION: &str = "Invalid or missing session";

/// Verified session claims. No database access.
pub(crate) struct Session(pub(crate) SessionClaims);

pub(crate) struct CurrentUser(pub(crate) User);
pub(crate) struct CurrentPrincipal(pub(crate) User);
pub(crate) struct CurrentTeacher(pub(crate) User);

/// Value of cookie `name` from a `Cookie` header such as `a=1; session=xyz`.
pub(crate) fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

async fn app_state(parts: &mut Parts, state: &AppState) -> Result<AppState, ApiError> {
    let State(app_state) = State::<AppState>::from_request_parts(parts, state)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;
    Ok(app_state)
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;
        let cookie_name = &app_state.settings().session().cookie_name;

        let token = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|cookies| cookie_value(cookies, cookie_name))
            .ok_or(ApiError::Unauthorized(INVALID_SESSION))?;

        let claims = security::verify_session_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized(INVALID_SESSION))?;

        Ok(Session(claims))
    }
}

/// Loads the session's user and checks it still matches its claims.
async fn load_user(state: &AppState, claims: &SessionClaims) -> Result<User, ApiError> {
    let user = repositories::users::find_by_id(state.db(), &claims.sub)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

    let Some(user) = user else {
        return Err(ApiError::Unauthorized("User not found"));
    };

    if !user.is_active {
        return Err(ApiError::Unauthorized(INVALID_SESSION));
    }

    if user.role != claims.role || user.school_id != claims.school_id {
        return Err(ApiError::Forbidden("Session does not match the account"));
    }

    Ok(user)
}

async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    role: UserRole,
    denied: &'static str,
) -> Result<User, ApiError> {
    let Session(claims) = Session::from_request_parts(parts, state).await?;
    if claims.role != role {
        tracing::warn!(user_id = %claims.sub, role = claims.role.as_str(), "Role check failed");
        return Err(ApiError::Forbidden(denied));
    }

    load_user(state, &claims).await
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Session(claims) = Session::from_request_parts(parts, state).await?;
        Ok(CurrentUser(load_user(state, &claims).await?))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::Principal, "Principal access required")
            .await
            .map(CurrentPrincipal)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::Teacher, "Teacher access required")
            .await
            .map(CurrentTeacher)
    }
}

#[cfg(test)]
mod tests {
    use super::cookie_value;

    #[test]
    fn cookie_value_picks_named_cookie() {
        assert_eq!(cookie_value("theme=dark; session=abc.def", "session"), Some("abc.def"));
        assert_eq!(cookie_value("session=abc", "session"), Some("abc"));
        assert_eq!(cookie_value("sessionx=abc", "session"), None);
        assert_eq!(cookie_value("", "session"), None);
    }
}
