use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::http::{session, AppError};
use crate::AppState;

/// The authenticated identity for a single request.
///
/// `require_login` resolves it once and stores it in the request extensions;
/// outside a guarded route the extractor authenticates the token itself.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<AuthUser>() {
            return Ok(auth.clone());
        }

        let next = parts
            .uri
            .path_and_query()
            .map(|value| value.as_str())
            .unwrap_or("/");
        let login_required = || {
            AppError::login_required(session::login_redirect_location(&state.login_url, next))
        };

        let token = session::token_from_headers(&parts.headers).ok_or_else(login_required)?;
        let auth = authenticate(state, &token).await?.ok_or_else(login_required)?;
        parts.extensions.insert(auth.clone());
        Ok(auth)
    }
}

pub(crate) async fn authenticate(state: &AppState, token: &str) -> Result<Option<AuthUser>, AppError> {
    let session = state
        .auth_service()
        .authenticate(token)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to authenticate session");
            AppError::internal("failed to authenticate")
        })?;

    Ok(session.map(|session| AuthUser {
        user_id: session.user_id,
        session_id: session.session_id,
    }))
}
