//! REST resources over the archive: poets, categories, poems, verses, audio
//! recitations and their sync points.
//!
//! Reads are public. Writes need a session holding `EditArchive`. Lists are
//! paginated; relationship endpoints that list a bounded set return a plain
//! array.

use crate::archive_store::{
    AudioQuery, AudioSync, AudioSyncQuery, Category, CategoryQuery, Century, Poem, PoemAudio,
    PoemQuery, Poet, PoetQuery, SortOrder, Verse, VersePosition, VerseQuery, AUDIO_SYNC_ORDERING,
    CATEGORY_ORDERING, POEM_ORDERING, POET_ORDERING, VERSE_ORDERING,
};
use crate::user::Permission;

use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::api_error::{ApiError, ApiJson, ApiPath};
use super::metrics::record_archive_write;
use super::pagination::{paginate, PageParams, PageSelection, Paginated};
use super::session::Session;
use super::state::{GuardedArchiveStore, GuardedSearchVault, ServerState};
use super::ServerConfig;

// =============================================================================
// Query parameter parsing
// =============================================================================

fn non_blank(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub(super) fn parse_id_param(field: &str, raw: &Option<String>) -> Result<Option<i64>, ApiError> {
    match non_blank(raw) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ApiError::invalid_field(field, "Enter a whole number.")),
    }
}

fn parse_bool_param(field: &str, raw: &Option<String>) -> Result<Option<bool>, ApiError> {
    match non_blank(raw) {
        None => Ok(None),
        Some("true" | "True" | "1") => Ok(Some(true)),
        Some("false" | "False" | "0") => Ok(Some(false)),
        Some(_) => Err(ApiError::invalid_field(field, "Select a valid choice.")),
    }
}

fn invalid_choice(field: &str, value: &str) -> ApiError {
    ApiError::invalid_field(
        field,
        format!(
            "Select a valid choice. {} is not one of the available choices.",
            value
        ),
    )
}

fn search_param(raw: &Option<String>) -> Option<String> {
    non_blank(raw).map(str::to_string)
}

/// Unknown ordering fields are ignored and the default order applies.
fn ordering_param(raw: &Option<String>, allowed: &[(&str, &'static str)]) -> Option<SortOrder> {
    non_blank(raw).and_then(|value| SortOrder::parse(value, allowed))
}

/// The record an update writes: the body alone for PUT, the body merged over
/// `current` for PATCH.
fn updated_record<T: Serialize + DeserializeOwned>(
    method: &Method,
    current: &T,
    body: Value,
) -> Result<T, ApiError> {
    if *method != Method::PATCH {
        return Ok(serde_json::from_value(body)?);
    }
    let Value::Object(patch) = body else {
        return Err(ApiError::invalid_payload("Expected a JSON object."));
    };
    let mut merged = serde_json::to_value(current).map_err(|e| ApiError::Internal(e.into()))?;
    if let Value::Object(target) = &mut merged {
        target.extend(patch);
    }
    Ok(serde_json::from_value(merged)?)
}

fn created<T: Serialize>(body: T) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

fn deleted(entity: &str, existed: bool) -> Result<StatusCode, ApiError> {
    if !existed {
        return Err(ApiError::item_not_found());
    }
    record_archive_write(entity, "delete");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Poets
// =============================================================================

#[derive(Debug, Deserialize)]
struct PoetListParams {
    century: Option<String>,
    search: Option<String>,
    ordering: Option<String>,
    #[serde(flatten)]
    page: PageParams,
}

async fn list_poets(
    State(store): State<GuardedArchiveStore>,
    State(config): State<ServerConfig>,
    Query(params): Query<PoetListParams>,
) -> Result<Response, ApiError> {
    let century = match non_blank(&params.century) {
        None => None,
        Some(raw) => Some(
            raw.parse::<Century>()
                .map_err(|_| invalid_choice("century", raw))?,
        ),
    };
    let query = PoetQuery {
        century,
        search: search_param(&params.search),
        ordering: ordering_param(&params.ordering, POET_ORDERING),
    };
    let page = paginate(&params.page, &config.pagination, |request| {
        store.list_poets(&query, Some(request))
    })?;
    Ok(Json(page).into_response())
}

async fn get_poet(
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    match store.get_poet(id)? {
        Some(poet) => Ok(Json(poet).into_response()),
        None => Err(ApiError::poet_not_found(id)),
    }
}

async fn create_poet(
    session: Session,
    State(store): State<GuardedArchiveStore>,
    ApiJson(poet): ApiJson<Poet>,
) -> Result<Response, ApiError> {
    session.require(Permission::EditArchive)?;
    let poet = store.create_poet(poet)?;
    record_archive_write("poet", "create");
    debug!("User {} created poet {}", session.user_id, poet.id);
    let detail = store.get_poet(poet.id)?.ok_or_else(ApiError::item_not_found)?;
    Ok(created(detail))
}

async fn update_poet(
    session: Session,
    method: Method,
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Response, ApiError> {
    session.require(Permission::EditArchive)?;
    let current = store.get_poet(id)?.ok_or_else(|| ApiError::poet_not_found(id))?;
    let mut poet = updated_record(&method, &current.poet, body)?;
    poet.id = id;
    store
        .update_poet(poet)?
        .ok_or_else(|| ApiError::poet_not_found(id))?;
    record_archive_write("poet", "update");
    let detail = store.get_poet(id)?.ok_or_else(|| ApiError::poet_not_found(id))?;
    Ok(Json(detail).into_response())
}

async fn delete_poet(
    session: Session,
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    session.require(Permission::EditArchive)?;
    deleted("poet", store.delete_poet(id)?)
        .map_err(|_| ApiError::poet_not_found(id))
}

/// Top-level categories of a poet, by title.
async fn get_poet_categories(
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    if store.get_poet(id)?.is_none() {
        return Err(ApiError::poet_not_found(id));
    }
    let query = CategoryQuery {
        poet: Some(id),
        top_level_only: true,
        ..Default::default()
    };
    let categories = store.list_categories(&query, None)?;
    Ok(Json(categories.items).into_response())
}

async fn get_poet_poems(
    State(store): State<GuardedArchiveStore>,
    State(config): State<ServerConfig>,
    ApiPath(id): ApiPath<i64>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    if store.get_poet(id)?.is_none() {
        return Err(ApiError::poet_not_found(id));
    }
    let query = PoemQuery {
        poet: Some(id),
        ..Default::default()
    };
    let page = paginate(&params, &config.pagination, |request| {
        store.list_poems(&query, Some(request))
    })?;
    Ok(Json(page).into_response())
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Deserialize)]
struct CategoryListParams {
    poet: Option<String>,
    parent: Option<String>,
    search: Option<String>,
    ordering: Option<String>,
    #[serde(flatten)]
    page: PageParams,
}

async fn list_categories(
    State(store): State<GuardedArchiveStore>,
    State(config): State<ServerConfig>,
    Query(params): Query<CategoryListParams>,
) -> Result<Response, ApiError> {
    let top_level_only = matches!(non_blank(&params.parent), Some("null" | "none"));
    let parent = if top_level_only {
        None
    } else {
        parse_id_param("parent", &params.parent)?
    };
    let query = CategoryQuery {
        poet: parse_id_param("poet", &params.poet)?,
        parent,
        top_level_only,
        search: search_param(&params.search),
        ordering: ordering_param(&params.ordering, CATEGORY_ORDERING),
    };
    let page = paginate(&params.page, &config.pagination, |request| {
        store.list_categories(&query, Some(request))
    })?;
    Ok(Json(page).into_response())
}

async fn get_category(
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    match store.get_category(id)? {
        Some(category) => Ok(Json(category).into_response()),
        None => Err(ApiError::category_not_found(id)),
    }
}

async fn create_category(
    session: Session,
    State(store): State<GuardedArchiveStore>,
    ApiJson(category): ApiJson<Category>,
) -> Result<Response, ApiError> {
    session.require(Permission::EditArchive)?;
    let category = store.create_category(category)?;
    record_archive_write("category", "create");
    let detail = store
        .get_category(category.id)?
        .ok_or_else(ApiError::item_not_found)?;
    Ok(created(detail))
}

async fn update_category(
    session: Session,
    method: Method,
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Response, ApiError> {
    session.require(Permission::EditArchive)?;
    let current = store
        .get_category(id)?
        .ok_or_else(|| ApiError::category_not_found(id))?;
    let mut category = updated_record(&method, &current.summary.category, body)?;
    category.id = id;
    store
        .update_category(category)?
        .ok_or_else(|| ApiError::category_not_found(id))?;
    record_archive_write("category", "update");
    let detail = store
        .get_category(id)?
        .ok_or_else(|| ApiError::category_not_found(id))?;
    Ok(Json(detail).into_response())
}

async fn delete_category(
    session: Session,
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    session.require(Permission::EditArchive)?;
    deleted("category", store.delete_category(id)?)
        .map_err(|_| ApiError::category_not_found(id))
}

async fn get_category_poems(
    State(store): State<GuardedArchiveStore>,
    State(config): State<ServerConfig>,
    ApiPath(id): ApiPath<i64>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    if store.get_category(id)?.is_none() {
        return Err(ApiError::category_not_found(id));
    }
    let query = PoemQuery {
        category: Some(id),
        ..Default::default()
    };
    let page = paginate(&params, &config.pagination, |request| {
        store.list_poems(&query, Some(request))
    })?;
    Ok(Json(page).into_response())
}

async fn get_category_subcategories(
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    if store.get_category(id)?.is_none() {
        return Err(ApiError::category_not_found(id));
    }
    let query = CategoryQuery {
        parent: Some(id),
        ..Default::default()
    };
    Ok(Json(store.list_categories(&query, None)?.items).into_response())
}

// =============================================================================
// Poems
// =============================================================================

#[derive(Debug, Deserialize)]
struct PoemListParams {
    category: Option<String>,
    poet: Option<String>,
    search: Option<String>,
    ordering: Option<String>,
    #[serde(flatten)]
    page: PageParams,
}

async fn list_poems(
    State(store): State<GuardedArchiveStore>,
    State(config): State<ServerConfig>,
    Query(params): Query<PoemListParams>,
) -> Result<Response, ApiError> {
    let query = PoemQuery {
        category: parse_id_param("category", &params.category)?,
        poet: parse_id_param("poet", &params.poet)?,
        search: search_param(&params.search),
        ordering: ordering_param(&params.ordering, POEM_ORDERING),
    };
    let page = paginate(&params.page, &config.pagination, |request| {
        store.list_poems(&query, Some(request))
    })?;
    Ok(Json(page).into_response())
}

async fn get_poem(
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    match store.get_poem(id)? {
        Some(poem) => Ok(Json(poem).into_response()),
        None => Err(ApiError::poem_not_found(id)),
    }
}

async fn create_poem(
    session: Session,
    State(store): State<GuardedArchiveStore>,
    ApiJson(poem): ApiJson<Poem>,
) -> Result<Response, ApiError> {
    session.require(Permission::EditArchive)?;
    let poem = store.create_poem(poem)?;
    record_archive_write("poem", "create");
    let detail = store.get_poem(poem.id)?.ok_or_else(ApiError::item_not_found)?;
    Ok(created(detail))
}

async fn update_poem(
    session: Session,
    method: Method,
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Response, ApiError> {
    session.require(Permission::EditArchive)?;
    let current = store
        .get_poem_summary(id)?
        .ok_or_else(|| ApiError::poem_not_found(id))?;
    let mut poem = updated_record(&method, &current.poem, body)?;
    poem.id = id;
    store
        .update_poem(poem)?
        .ok_or_else(|| ApiError::poem_not_found(id))?;
    record_archive_write("poem", "update");
    let detail = store.get_poem(id)?.ok_or_else(|| ApiError::poem_not_found(id))?;
    Ok(Json(detail).into_response())
}

async fn delete_poem(
    session: Session,
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    session.require(Permission::EditArchive)?;
    deleted("poem", store.delete_poem(id)?).map_err(|_| ApiError::poem_not_found(id))
}

/// Verses of a poem ordered by line order, then position.
async fn get_poem_verses(
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    if store.get_poem_summary(id)?.is_none() {
        return Err(ApiError::poem_not_found(id));
    }
    let query = VerseQuery {
        poem: Some(id),
        ..Default::default()
    };
    Ok(Json(store.list_verses(&query, None)?.items).into_response())
}

#[derive(Debug, Deserialize)]
struct PoemSearchParams {
    q: Option<String>,
    poet: Option<String>,
    #[serde(flatten)]
    page: PageParams,
}

async fn search_poems(
    State(search_vault): State<GuardedSearchVault>,
    State(config): State<ServerConfig>,
    Query(params): Query<PoemSearchParams>,
) -> Result<Response, ApiError> {
    let poet = parse_id_param("poet", &params.poet)?;
    let query = params.q.as_deref().unwrap_or_default();
    let poems = search_vault.search(query, poet)?;
    let selection = PageSelection::resolve(&params.page, &config.pagination)?;
    Ok(Json(Paginated::from_vec(poems, selection)?).into_response())
}

// =============================================================================
// Verses
// =============================================================================

#[derive(Debug, Deserialize)]
struct VerseListParams {
    poem: Option<String>,
    position: Option<String>,
    search: Option<String>,
    ordering: Option<String>,
    #[serde(flatten)]
    page: PageParams,
}

async fn list_verses(
    State(store): State<GuardedArchiveStore>,
    State(config): State<ServerConfig>,
    Query(params): Query<VerseListParams>,
) -> Result<Response, ApiError> {
    let position = match parse_id_param("position", &params.position)? {
        None => None,
        Some(code) => {
            let position = VersePosition::from(code);
            if !position.is_recognized() {
                return Err(invalid_choice("position", &code.to_string()));
            }
            Some(position)
        }
    };
    let query = VerseQuery {
        poem: parse_id_param("poem", &params.poem)?,
        position,
        search: search_param(&params.search),
        ordering: ordering_param(&params.ordering, VERSE_ORDERING),
    };
    let page = paginate(&params.page, &config.pagination, |request| {
        store.list_verses(&query, Some(request))
    })?;
    Ok(Json(page).into_response())
}

async fn get_verse(
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    match store.get_verse(id)? {
        Some(verse) => Ok(Json(verse).into_response()),
        None => Err(ApiError::item_not_found()),
    }
}

async fn create_verse(
    session: Session,
    State(store): State<GuardedArchiveStore>,
    ApiJson(verse): ApiJson<Verse>,
) -> Result<Response, ApiError> {
    session.require(Permission::EditArchive)?;
    let verse = store.create_verse(verse)?;
    record_archive_write("verse", "create");
    let view = store.get_verse(verse.id)?.ok_or_else(ApiError::item_not_found)?;
    Ok(created(view))
}

async fn update_verse(
    session: Session,
    method: Method,
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Response, ApiError> {
    session.require(Permission::EditArchive)?;
    let current = store.get_verse(id)?.ok_or_else(ApiError::item_not_found)?;
    let mut verse = updated_record(&method, &current.verse, body)?;
    verse.id = id;
    store.update_verse(verse)?.ok_or_else(ApiError::item_not_found)?;
    record_archive_write("verse", "update");
    let view = store.get_verse(id)?.ok_or_else(ApiError::item_not_found)?;
    Ok(Json(view).into_response())
}

async fn delete_verse(
    session: Session,
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    session.require(Permission::EditArchive)?;
    deleted("verse", store.delete_verse(id)?)
}

// =============================================================================
// Audio
// =============================================================================

#[derive(Debug, Deserialize)]
struct AudioListParams {
    poem: Option<String>,
    is_uploaded: Option<String>,
    is_direct: Option<String>,
    #[serde(flatten)]
    page: PageParams,
}

async fn list_audios(
    State(store): State<GuardedArchiveStore>,
    State(config): State<ServerConfig>,
    Query(params): Query<AudioListParams>,
) -> Result<Response, ApiError> {
    let query = AudioQuery {
        poem: parse_id_param("poem", &params.poem)?,
        is_uploaded: parse_bool_param("is_uploaded", &params.is_uploaded)?,
        is_direct: parse_bool_param("is_direct", &params.is_direct)?,
    };
    let page = paginate(&params.page, &config.pagination, |request| {
        store.list_audios(&query, Some(request))
    })?;
    Ok(Json(page).into_response())
}

async fn get_audio(
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    match store.get_audio(id)? {
        Some(audio) => Ok(Json(audio).into_response()),
        None => Err(ApiError::item_not_found()),
    }
}

async fn create_audio(
    session: Session,
    State(store): State<GuardedArchiveStore>,
    ApiJson(mut audio): ApiJson<PoemAudio>,
) -> Result<Response, ApiError> {
    session.require(Permission::EditArchive)?;
    audio.is_uploaded = false;
    let audio = store.create_audio(audio)?;
    record_archive_write("audio", "create");
    let view = store.get_audio(audio.id)?.ok_or_else(ApiError::item_not_found)?;
    Ok(created(view))
}

async fn update_audio(
    session: Session,
    method: Method,
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Response, ApiError> {
    session.require(Permission::EditArchive)?;
    let current = store.get_audio(id)?.ok_or_else(ApiError::item_not_found)?;
    let mut audio = updated_record(&method, &current.audio, body)?;
    audio.id = id;
    audio.is_uploaded = current.audio.is_uploaded;
    store.update_audio(audio)?.ok_or_else(ApiError::item_not_found)?;
    record_archive_write("audio", "update");
    let view = store.get_audio(id)?.ok_or_else(ApiError::item_not_found)?;
    Ok(Json(view).into_response())
}

async fn delete_audio(
    session: Session,
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    session.require(Permission::EditArchive)?;
    deleted("audio", store.delete_audio(id)?)
}

#[derive(Debug, Deserialize)]
struct AudioSyncListParams {
    poem: Option<String>,
    audio: Option<String>,
    ordering: Option<String>,
    #[serde(flatten)]
    page: PageParams,
}

async fn list_audio_syncs(
    State(store): State<GuardedArchiveStore>,
    State(config): State<ServerConfig>,
    Query(params): Query<AudioSyncListParams>,
) -> Result<Response, ApiError> {
    let query = AudioSyncQuery {
        poem: parse_id_param("poem", &params.poem)?,
        audio: parse_id_param("audio", &params.audio)?,
        ordering: ordering_param(&params.ordering, AUDIO_SYNC_ORDERING),
    };
    let page = paginate(&params.page, &config.pagination, |request| {
        store.list_audio_syncs(&query, Some(request))
    })?;
    Ok(Json(page).into_response())
}

async fn get_audio_sync(
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    match store.get_audio_sync(id)? {
        Some(sync) => Ok(Json(sync).into_response()),
        None => Err(ApiError::item_not_found()),
    }
}

async fn create_audio_sync(
    session: Session,
    State(store): State<GuardedArchiveStore>,
    ApiJson(sync): ApiJson<AudioSync>,
) -> Result<Response, ApiError> {
    session.require(Permission::EditArchive)?;
    let sync = store.create_audio_sync(sync)?;
    record_archive_write("audio_sync", "create");
    let view = store
        .get_audio_sync(sync.id)?
        .ok_or_else(ApiError::item_not_found)?;
    Ok(created(view))
}

async fn update_audio_sync(
    session: Session,
    method: Method,
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Response, ApiError> {
    session.require(Permission::EditArchive)?;
    let current = store.get_audio_sync(id)?.ok_or_else(ApiError::item_not_found)?;
    let mut sync = updated_record(&method, &current.sync, body)?;
    sync.id = id;
    store
        .update_audio_sync(sync)?
        .ok_or_else(ApiError::item_not_found)?;
    record_archive_write("audio_sync", "update");
    let view = store.get_audio_sync(id)?.ok_or_else(ApiError::item_not_found)?;
    Ok(Json(view).into_response())
}

async fn delete_audio_sync(
    session: Session,
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    session.require(Permission::EditArchive)?;
    deleted("audio_sync", store.delete_audio_sync(id)?)
}

pub fn make_archive_routes(state: ServerState) -> Router {
    Router::new()
        .route("/poets", get(list_poets).post(create_poet))
        .route(
            "/poets/{id}",
            get(get_poet)
                .put(update_poet)
                .patch(update_poet)
                .delete(delete_poet),
        )
        .route("/poets/{id}/categories", get(get_poet_categories))
        .route("/poets/{id}/poems", get(get_poet_poems))
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category)
                .put(update_category)
                .patch(update_category)
                .delete(delete_category),
        )
        .route("/categories/{id}/poems", get(get_category_poems))
        .route(
            "/categories/{id}/subcategories",
            get(get_category_subcategories),
        )
        .route("/poems", get(list_poems).post(create_poem))
        .route("/poems/search", get(search_poems))
        .route(
            "/poems/{id}",
            get(get_poem)
                .put(update_poem)
                .patch(update_poem)
                .delete(delete_poem),
        )
        .route("/poems/{id}/verses", get(get_poem_verses))
        .route("/verses", get(list_verses).post(create_verse))
        .route(
            "/verses/{id}",
            get(get_verse)
                .put(update_verse)
                .patch(update_verse)
                .delete(delete_verse),
        )
        .route("/audios", get(list_audios).post(create_audio))
        .route(
            "/audios/{id}",
            get(get_audio)
                .put(update_audio)
                .patch(update_audio)
                .delete(delete_audio),
        )
        .route("/audio-syncs", get(list_audio_syncs).post(create_audio_sync))
        .route(
            "/audio-syncs/{id}",
            get(get_audio_sync)
                .put(update_audio_sync)
                .patch(update_audio_sync)
                .delete(delete_audio_sync),
        )
        .with_state(state)
}
