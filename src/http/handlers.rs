use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::auth::SignupOutcome;
use crate::app::engagement::EngagementService;
use crate::app::feed::FeedService;
use crate::app::forms::{
    self, FormErrors, LoginInput, SignupInput, TweetInput, INVALID_LOGIN,
};
use crate::app::social::{FollowOutcome, SocialService, UnfollowOutcome};
use crate::app::tweets::{DeleteOutcome, TweetService};
use crate::app::users::UserService;
use crate::domain::engagement::LikeSummary;
use crate::domain::social_graph::FollowEdge;
use crate::domain::tweet::{Tweet, TweetDetail};
use crate::domain::user::{Profile, PublicUser, User};
use crate::http::response::{form_page, Empty, Level, Page, Redirect};
use crate::http::routes::HOME_PATH;
use crate::http::{session, AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

/// Tweet ids in paths that do not parse are treated like unknown tweets.
pub(crate) fn parse_tweet_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found("tweet not found"))
}

async fn resolve_user(state: &AppState, username: &str) -> Result<User, AppError> {
    let user = UserService::new(state.db.clone())
        .get_by_username(username)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, username = %username, "failed to fetch user");
            AppError::internal("failed to fetch user")
        })?;

    user.ok_or_else(|| AppError::not_found("This user does not exist."))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

pub async fn welcome() -> Page<Empty> {
    Page::new("welcome", Empty {})
}

#[derive(Serialize)]
pub struct TimelinePage {
    pub tweet_list: Vec<Tweet>,
}

pub async fn home(State(state): State<AppState>) -> Result<Page<TimelinePage>, AppError> {
    let tweet_list = FeedService::new(state.db.clone())
        .home_timeline()
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load home timeline");
            AppError::internal("failed to load home timeline")
        })?;

    Ok(Page::new("home", TimelinePage { tweet_list }))
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub async fn signup_form() -> impl IntoResponse {
    form_page("signup", SignupInput::default(), FormErrors::default())
}

pub async fn signup(
    State(state): State<AppState>,
    Form(input): Form<SignupInput>,
) -> Result<Response, AppError> {
    let valid = match forms::validate_signup(&input) {
        Ok(valid) => valid,
        Err(mut errors) => {
            state
                .auth_service()
                .report_taken(input.username.trim(), input.email.trim(), &mut errors)
                .await
                .map_err(|err| {
                    tracing::error!(error = ?err, "failed to check existing accounts");
                    AppError::internal("failed to create user")
                })?;
            return Ok(form_page("signup", input, errors).into_response());
        }
    };

    let outcome = state.auth_service().signup(valid).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to create user");
        AppError::internal("failed to create user")
    })?;

    match outcome {
        SignupOutcome::Created { user, session } => {
            tracing::info!(user_id = %user.id, username = %user.username, "user signed up");
            let cookie = session_cookie(&state, &session.token)?;
            Ok(Redirect::found(HOME_PATH).with_cookie(cookie).into_response())
        }
        SignupOutcome::Rejected(errors) => Ok(form_page("signup", input, errors).into_response()),
    }
}

#[derive(Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Serialize)]
pub struct LoginFormPage {
    pub next: Option<String>,
}

pub async fn login_form(Query(query): Query<NextQuery>) -> impl IntoResponse {
    form_page(
        "login",
        LoginFormPage {
            next: session::safe_next(query.next.as_deref()),
        },
        FormErrors::default(),
    )
}

pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    Form(input): Form<LoginInput>,
) -> Result<Response, AppError> {
    let (username, password) = match forms::validate_login(&input) {
        Ok(credentials) => credentials,
        Err(errors) => return Ok(form_page("login", input, errors).into_response()),
    };

    let result = state
        .auth_service()
        .login(&username, &password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    match result {
        Some((user, session)) => {
            tracing::info!(user_id = %user.id, "user logged in");
            let location = session::safe_next(query.next.as_deref())
                .unwrap_or_else(|| state.login_redirect_url.clone());
            let cookie = session_cookie(&state, &session.token)?;
            Ok(Redirect::found(location).with_cookie(cookie).into_response())
        }
        None => {
            tracing::warn!(username = %username, "failed login attempt");
            let mut errors = FormErrors::default();
            errors.add_non_field(INVALID_LOGIN);
            Ok(form_page("login", input, errors).into_response())
        }
    }
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Page<Empty>, AppError> {
    if let Some(token) = session::token_from_headers(&headers) {
        let revoked = state.auth_service().logout(&token).await.map_err(|err| {
            tracing::error!(error = ?err, "failed to logout");
            AppError::internal("failed to logout")
        })?;
        if revoked {
            tracing::info!("session revoked");
        }
    }

    Ok(Page::new("logged_out", Empty {}).with_cookie(session::clear_session_cookie(state.cookie_secure)))
}

fn session_cookie(state: &AppState, token: &str) -> Result<axum::http::HeaderValue, AppError> {
    session::session_cookie(token, state.session_ttl_hours * 60 * 60, state.cookie_secure)
        .ok_or_else(|| AppError::internal("failed to build session cookie"))
}

// ---------------------------------------------------------------------------
// Relationships
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ProfilePage {
    pub profile: Profile,
    pub tweet_list: Vec<Tweet>,
}

async fn profile_page(
    state: &AppState,
    viewer_id: Uuid,
    user: User,
) -> Result<Page<ProfilePage>, AppError> {
    let user_id = user.id;
    let profile = SocialService::new(state.db.clone())
        .profile(viewer_id, user)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %user_id, "failed to load profile");
            AppError::internal("failed to load profile")
        })?;
    let tweet_list = TweetService::new(state.db.clone())
        .list_by_user(user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %user_id, "failed to list user tweets");
            AppError::internal("failed to list user tweets")
        })?;

    Ok(Page::new("profile", ProfilePage { profile, tweet_list }))
}

pub async fn profile(
    Path(username): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Page<ProfilePage>, AppError> {
    let user = resolve_user(&state, &username).await?;
    profile_page(&state, auth.user_id, user).await
}

pub async fn follow_user(
    Path(username): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let target = resolve_user(&state, &username).await?;
    let target_id = target.id;

    let outcome = SocialService::new(state.db.clone())
        .follow(auth.user_id, target_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, follower_id = %auth.user_id, following_id = %target_id, "failed to follow user");
            AppError::internal("failed to follow user")
        })?;

    let response = match outcome {
        FollowOutcome::Followed => {
            tracing::info!(follower_id = %auth.user_id, following_id = %target_id, "followed user");
            Redirect::found(HOME_PATH)
                .with_message(Level::Success, "You've just followed.")
                .into_response()
        }
        FollowOutcome::AlreadyFollowing => profile_page(&state, auth.user_id, target)
            .await?
            .with_message(Level::Error, "You have already followed.")
            .into_response(),
        FollowOutcome::SelfFollow => profile_page(&state, auth.user_id, target)
            .await?
            .with_message(Level::Error, "You can't follow yourself.")
            .into_response(),
    };

    Ok(response)
}

pub async fn unfollow_user(
    Path(username): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let target = resolve_user(&state, &username).await?;
    let target_id = target.id;

    let outcome = SocialService::new(state.db.clone())
        .unfollow(auth.user_id, target_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, follower_id = %auth.user_id, following_id = %target_id, "failed to unfollow user");
            AppError::internal("failed to unfollow user")
        })?;

    let response = match outcome {
        UnfollowOutcome::Unfollowed => {
            tracing::info!(follower_id = %auth.user_id, following_id = %target_id, "unfollowed user");
            Redirect::found(HOME_PATH)
                .with_message(Level::Success, "You've just unfollowed.")
                .into_response()
        }
        UnfollowOutcome::NotFollowing => profile_page(&state, auth.user_id, target)
            .await?
            .with_message(Level::Error, "You haven't followed this user.")
            .into_response(),
        UnfollowOutcome::SelfUnfollow => profile_page(&state, auth.user_id, target)
            .await?
            .with_message(Level::Error, "This is your own account.")
            .into_response(),
    };

    Ok(response)
}

#[derive(Serialize)]
pub struct SocialUserItem {
    pub user: PublicUser,
    #[serde(with = "time::serde::rfc3339")]
    pub followed_at: OffsetDateTime,
}

impl From<FollowEdge> for SocialUserItem {
    fn from(edge: FollowEdge) -> Self {
        Self {
            user: edge.user.into(),
            followed_at: edge.followed_at,
        }
    }
}

#[derive(Serialize)]
pub struct FollowingListPage {
    pub user: PublicUser,
    pub following_list: Vec<SocialUserItem>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct FollowerListPage {
    pub user: PublicUser,
    pub follower_list: Vec<SocialUserItem>,
    pub count: usize,
}

pub async fn list_following(
    Path(username): Path<String>,
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Page<FollowingListPage>, AppError> {
    let user = resolve_user(&state, &username).await?;

    let edges = SocialService::new(state.db.clone())
        .list_following(user.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %user.id, "failed to list following");
            AppError::internal("failed to list following")
        })?;

    let following_list: Vec<SocialUserItem> = edges.into_iter().map(Into::into).collect();
    Ok(Page::new(
        "following_list",
        FollowingListPage {
            user: user.into(),
            count: following_list.len(),
            following_list,
        },
    ))
}

pub async fn list_followers(
    Path(username): Path<String>,
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Page<FollowerListPage>, AppError> {
    let user = resolve_user(&state, &username).await?;

    let edges = SocialService::new(state.db.clone())
        .list_followers(user.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %user.id, "failed to list followers");
            AppError::internal("failed to list followers")
        })?;

    let follower_list: Vec<SocialUserItem> = edges.into_iter().map(Into::into).collect();
    Ok(Page::new(
        "follower_list",
        FollowerListPage {
            user: user.into(),
            count: follower_list.len(),
            follower_list,
        },
    ))
}

// ---------------------------------------------------------------------------
// Tweets
// ---------------------------------------------------------------------------

pub async fn tweet_create_form(_auth: AuthUser) -> impl IntoResponse {
    form_page("tweet_create", TweetInput::default(), FormErrors::default())
}

pub async fn create_tweet(
    auth: AuthUser,
    State(state): State<AppState>,
    Form(input): Form<TweetInput>,
) -> Result<Response, AppError> {
    let content = match forms::validate_tweet(&input) {
        Ok(content) => content,
        Err(errors) => return Ok(form_page("tweet_create", input, errors).into_response()),
    };

    let tweet = TweetService::new(state.db.clone())
        .create_tweet(auth.user_id, content)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to create tweet");
            AppError::internal("failed to create tweet")
        })?;

    tracing::info!(tweet_id = %tweet.id, user_id = %auth.user_id, "tweet created");
    Ok(Redirect::found(HOME_PATH).into_response())
}

#[derive(Serialize)]
pub struct TweetDetailPage {
    pub tweet: TweetDetail,
}

pub async fn get_tweet(
    Path(id): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Page<TweetDetailPage>, AppError> {
    let tweet_id = parse_tweet_id(&id)?;
    let detail = TweetService::new(state.db.clone())
        .get_detail(tweet_id, auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, tweet_id = %tweet_id, "failed to fetch tweet");
            AppError::internal("failed to fetch tweet")
        })?;

    match detail {
        Some(tweet) => Ok(Page::new("tweet_detail", TweetDetailPage { tweet })),
        None => Err(AppError::not_found("tweet not found")),
    }
}

pub async fn delete_tweet(
    Path(id): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    let tweet_id = parse_tweet_id(&id)?;
    let outcome = TweetService::new(state.db.clone())
        .delete_tweet(tweet_id, auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, tweet_id = %tweet_id, "failed to delete tweet");
            AppError::internal("failed to delete tweet")
        })?;

    match outcome {
        DeleteOutcome::Deleted => {
            tracing::info!(tweet_id = %tweet_id, user_id = %auth.user_id, "tweet deleted");
            Ok(Redirect::found(HOME_PATH))
        }
        DeleteOutcome::NotFound => Err(AppError::not_found("tweet not found")),
        DeleteOutcome::NotOwner => Err(AppError::forbidden("you do not own this tweet")),
    }
}

pub async fn like_tweet(
    Path(id): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LikeSummary>, AppError> {
    let tweet_id = parse_tweet_id(&id)?;
    let summary = EngagementService::new(state.db.clone())
        .like_tweet(auth.user_id, tweet_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, tweet_id = %tweet_id, "failed to like tweet");
            AppError::internal("failed to like tweet")
        })?;

    summary
        .map(Json)
        .ok_or_else(|| AppError::not_found("tweet not found"))
}

pub async fn unlike_tweet(
    Path(id): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LikeSummary>, AppError> {
    let tweet_id = parse_tweet_id(&id)?;
    let summary = EngagementService::new(state.db.clone())
        .unlike_tweet(auth.user_id, tweet_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, tweet_id = %tweet_id, "failed to unlike tweet");
            AppError::internal("failed to unlike tweet")
        })?;

    summary
        .map(Json)
        .ok_or_else(|| AppError::not_found("tweet not found"))
}
