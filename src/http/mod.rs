use axum::Router;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod middleware;
mod response;
mod routes;
mod session;

pub use auth::AuthUser;
pub use error::AppError;
pub use routes::HOME_PATH;

pub fn router(state: AppState) -> Router {
    let max_body_bytes = state.max_body_bytes;

    Router::new()
        .merge(routes::health())
        .merge(routes::pages())
        .merge(routes::accounts(state.clone()))
        .merge(routes::tweets(state.clone()))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(RequestBodyLimitLayer::new(max_body_bytes)),
        )
}
