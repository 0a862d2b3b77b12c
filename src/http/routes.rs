use axum::middleware::from_fn_with_state;
use axum::{routing::get, routing::post, Router};

use crate::http::{handlers, middleware};
use crate::AppState;

pub const HOME_PATH: &str = "/accounts/home/";

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn pages() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::welcome))
        .route(HOME_PATH, get(handlers::home))
}

pub fn accounts(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route(
            "/accounts/signup/",
            get(handlers::signup_form).post(handlers::signup),
        )
        .route(
            "/accounts/login/",
            get(handlers::login_form).post(handlers::login),
        )
        .route("/accounts/logout/", post(handlers::logout));

    let members = Router::new()
        .route("/accounts/:username/", get(handlers::profile))
        .route("/accounts/:username/follow/", post(handlers::follow_user))
        .route("/accounts/:username/unfollow/", post(handlers::unfollow_user))
        .route(
            "/accounts/:username/following_list/",
            get(handlers::list_following),
        )
        .route(
            "/accounts/:username/follower_list/",
            get(handlers::list_followers),
        )
        .route_layer(from_fn_with_state(state, middleware::require_login));

    public.merge(members)
}

pub fn tweets(state: AppState) -> Router<AppState> {
    let members = Router::new()
        .route(
            "/tweets/create/",
            get(handlers::tweet_create_form).post(handlers::create_tweet),
        )
        .route("/tweets/:id/", get(handlers::get_tweet))
        .route("/tweets/:id/like/", post(handlers::like_tweet))
        .route("/tweets/:id/unlike/", post(handlers::unlike_tweet))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_login));

    // Layers wrap outside-in: the login guard runs before the ownership gate.
    let owner_only = Router::new()
        .route("/tweets/:id/delete/", post(handlers::delete_tweet))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_tweet_owner))
        .route_layer(from_fn_with_state(state, middleware::require_login));

    members.merge(owner_only)
}
