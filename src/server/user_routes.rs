//! Login and logout, plus the per-user resources: favorites and settings.

use crate::user::{FavoriteQuery, FavoriteToggle, Permission, UserSettingsUpdate};
use crate::user::auth::AuthTokenValue;

use axum::{
    extract::{Query, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, error, info};

use super::api_error::{ApiError, ApiJson, ApiPath};
use super::archive_routes::parse_id_param;
use super::metrics::record_login_attempt;
use super::pagination::{PageParams, PageSelection, Paginated};
use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::state::{GuardedUserManager, ServerState};
use super::ServerConfig;

// =============================================================================
// Auth
// =============================================================================

#[derive(Deserialize)]
struct LoginBody {
    pub user_handle: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
}

#[derive(Serialize)]
struct SessionResponse {
    user_id: usize,
    user_handle: String,
    roles: Vec<String>,
    permissions: Vec<Permission>,
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    ApiJson(body): ApiJson<LoginBody>,
) -> Result<Response, ApiError> {
    let start = Instant::now();
    debug!("login() called for {}", body.user_handle);

    let credentials = match user_manager.check_password(&body.user_handle, &body.password) {
        Ok(Some(credentials)) => credentials,
        Ok(None) => {
            record_login_attempt("failure", start.elapsed());
            return Err(ApiError::Authentication);
        }
        Err(err) => {
            record_login_attempt("error", start.elapsed());
            return Err(err.into());
        }
    };

    let auth_token = user_manager.generate_auth_token(&credentials).map_err(|err| {
        error!("Error with auth token generation: {}", err);
        record_login_attempt("error", start.elapsed());
        ApiError::from(err)
    })?;
    record_login_attempt("success", start.elapsed());
    info!("User {} logged in", credentials.user_id);

    let cookie = Cookie::build((COOKIE_SESSION_TOKEN_KEY, auth_token.value.0.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie.to_string())],
        Json(LoginSuccessResponse {
            token: auth_token.value.0,
        }),
    )
        .into_response())
}

async fn logout(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
) -> Result<Response, ApiError> {
    user_manager.delete_auth_token(session.user_id, &AuthTokenValue(session.token))?;

    let cookie = Cookie::build((COOKIE_SESSION_TOKEN_KEY, ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
        .same_site(SameSite::Lax)
        .build();
    Ok((StatusCode::OK, [(SET_COOKIE, cookie.to_string())]).into_response())
}

async fn get_session(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
) -> Result<Response, ApiError> {
    let user_handle = user_manager
        .get_user_handle(session.user_id)?
        .ok_or(ApiError::Authentication)?;
    let roles = user_manager
        .get_user_roles(session.user_id)?
        .into_iter()
        .map(|role| role.as_str().to_string())
        .collect();
    Ok(Json(SessionResponse {
        user_id: session.user_id,
        user_handle,
        roles,
        permissions: session.permissions,
    })
    .into_response())
}

pub fn make_auth_routes(state: ServerState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/session", get(get_session))
        .with_state(state)
}

// =============================================================================
// Favorites
// =============================================================================

#[derive(Debug, Deserialize)]
struct FavoriteListParams {
    poem: Option<String>,
    verse: Option<String>,
    #[serde(flatten)]
    page: PageParams,
}

/// Reads an id sent either as a JSON number or as a numeric string.
fn json_id(body: &Value, field: &str) -> Option<i64> {
    match body.get(field)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|id| *id != 0)
}

async fn list_favorites(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    State(config): State<ServerConfig>,
    Query(params): Query<FavoriteListParams>,
) -> Result<Response, ApiError> {
    session.require(Permission::ManageFavorites)?;
    let query = FavoriteQuery {
        poem: parse_id_param("poem", &params.poem)?,
        verse: parse_id_param("verse", &params.verse)?,
    };
    let favorites = user_manager.list_favorites(session.user_id, &query)?;
    let selection = PageSelection::resolve(&params.page, &config.pagination)?;
    Ok(Json(Paginated::from_vec(favorites, selection)?).into_response())
}

async fn create_favorite(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Response, ApiError> {
    session.require(Permission::ManageFavorites)?;
    let poem = json_id(&body, "poem")
        .ok_or_else(|| ApiError::invalid_field("poem", "This field is required."))?;
    let verse = json_id(&body, "verse")
        .ok_or_else(|| ApiError::invalid_field("verse", "This field is required."))?;
    let favorite = user_manager.add_favorite(session.user_id, poem, verse)?;
    Ok((StatusCode::CREATED, Json(favorite)).into_response())
}

async fn get_favorite(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    ApiPath(id): ApiPath<usize>,
) -> Result<Response, ApiError> {
    session.require(Permission::ManageFavorites)?;
    match user_manager.get_favorite(session.user_id, id)? {
        Some(favorite) => Ok(Json(favorite).into_response()),
        None => Err(ApiError::item_not_found()),
    }
}

async fn delete_favorite(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    ApiPath(id): ApiPath<usize>,
) -> Result<StatusCode, ApiError> {
    session.require(Permission::ManageFavorites)?;
    if user_manager.delete_favorite(session.user_id, id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::item_not_found())
    }
}

async fn toggle_favorite(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Response, ApiError> {
    session.require(Permission::ManageFavorites)?;
    let (Some(poem), Some(verse)) = (json_id(&body, "poem"), json_id(&body, "verse")) else {
        return Err(ApiError::bad_request(
            "Poem and verse IDs are required.",
            "شناسه شعر و مصرع الزامی است.",
        ));
    };

    match user_manager.toggle_favorite(session.user_id, poem, verse)? {
        FavoriteToggle::Removed => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "removed",
                "message": "از علاقه‌مندی‌ها حذف شد.",
                "message_en": "Removed from favorites.",
            })),
        )
            .into_response()),
        FavoriteToggle::Added(favorite) => Ok((
            StatusCode::CREATED,
            Json(json!({
                "status": "added",
                "message": "به علاقه‌مندی‌ها اضافه شد.",
                "message_en": "Added to favorites.",
                "data": favorite,
            })),
        )
            .into_response()),
    }
}

// =============================================================================
// Settings
// =============================================================================

async fn get_my_settings(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Result<Response, ApiError> {
    session.require(Permission::ManageSettings)?;
    match user_manager.get_settings(session.user_id)? {
        Some(settings) => Ok(Json(settings).into_response()),
        None => Err(ApiError::settings_not_found()),
    }
}

/// Creates the caller's settings (201) or applies a partial update (200).
async fn save_my_settings(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    ApiJson(update): ApiJson<UserSettingsUpdate>,
) -> Result<Response, ApiError> {
    session.require(Permission::ManageSettings)?;
    let (settings, created) = user_manager.save_settings(session.user_id, &update)?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(settings)).into_response())
}

pub fn make_user_routes(state: ServerState) -> Router {
    Router::new()
        .route("/favorites", get(list_favorites).post(create_favorite))
        .route("/favorites/toggle", post(toggle_favorite))
        .route(
            "/favorites/{id}",
            get(get_favorite).delete(delete_favorite),
        )
        .route("/settings/me", get(get_my_settings).post(save_my_settings))
        .with_state(state)
}
