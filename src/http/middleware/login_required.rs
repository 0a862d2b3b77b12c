use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::http::auth::authenticate;
use crate::http::{session, AppError};
use crate::AppState;

/// Rejects anonymous requests with a redirect to the login page and hands the
/// resolved identity to the handler through the request extensions.
pub async fn require_login(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth = match session::token_from_headers(request.headers()) {
        Some(token) => authenticate(&state, &token).await?,
        None => None,
    };

    let Some(auth) = auth else {
        let next_path = request
            .uri()
            .path_and_query()
            .map(|value| value.as_str())
            .unwrap_or("/");
        return Err(AppError::login_required(session::login_redirect_location(
            &state.login_url,
            next_path,
        )));
    };

    request.extensions_mut().insert(auth);
    Ok(next.run(request).await)
}
