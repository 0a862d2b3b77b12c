use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::app::tweets::TweetService;
use crate::http::handlers::parse_tweet_id;
use crate::http::{AppError, AuthUser};
use crate::AppState;

/// Ownership gate for mutating a tweet. Must run inside `require_login`.
pub async fn require_tweet_owner(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let tweet_id = parse_tweet_id(&id)?;

    let owner = TweetService::new(state.db.clone())
        .owner_of(tweet_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, tweet_id = %tweet_id, "failed to check tweet owner");
            AppError::internal("failed to check tweet owner")
        })?;

    match owner {
        None => Err(AppError::not_found("tweet not found")),
        Some(owner_id) if owner_id != auth.user_id => {
            tracing::warn!(tweet_id = %tweet_id, user_id = %auth.user_id, "rejected non-owner tweet mutation");
            Err(AppError::forbidden("you do not own this tweet"))
        }
        Some(_) => Ok(next.run(request).await),
    }
}
