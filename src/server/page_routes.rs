//! View models for the reading pages: home, poet, category, poem, favorites
//! and search.

use crate::archive_store::{
    AudioView, Breadcrumb, CategoryQuery, CategorySummary, Century, PageRequest, Poem, PoemQuery,
    PoemSummary, PoetDetail, PoetQuery, PoetSummary, SortOrder,
};
use crate::navigation::{layout, VerseLayout};
use crate::user::{FavoriteQuery, FavoriteView};

use axum::{
    extract::{Query, State},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::api_error::{ApiError, ApiPath};
use super::http_layers::http_cache;
use super::session::Session;
use super::state::{GuardedArchiveStore, GuardedSearchVault, GuardedUserManager, ServerState};

/// Poems listed on a poet page.
const POET_PAGE_POEMS: usize = 50;

fn by_name() -> Option<SortOrder> {
    Some(SortOrder::asc("p.name"))
}

fn by_title_categories() -> Option<SortOrder> {
    Some(SortOrder::asc("c.title"))
}

fn by_title_poems() -> Option<SortOrder> {
    Some(SortOrder::asc("pm.title"))
}

// =============================================================================
// Home
// =============================================================================

#[derive(Serialize)]
struct EraGroup {
    century: Century,
    display_name: &'static str,
    poets: Vec<PoetSummary>,
}

#[derive(Serialize)]
struct HomePage {
    eras: Vec<EraGroup>,
}

/// Groups poets by era, keeping `Century::ALL` order and dropping empty eras.
fn group_by_era(poets: Vec<PoetSummary>) -> Vec<EraGroup> {
    let mut groups: Vec<EraGroup> = Century::ALL
        .into_iter()
        .map(|century| EraGroup {
            century,
            display_name: century.display_name(),
            poets: vec![],
        })
        .collect();
    for poet in poets {
        if let Some(group) = groups.iter_mut().find(|g| g.century == poet.poet.century) {
            group.poets.push(poet);
        }
    }
    groups.retain(|g| !g.poets.is_empty());
    groups
}

async fn home_page(State(store): State<GuardedArchiveStore>) -> Result<Response, ApiError> {
    let query = PoetQuery {
        ordering: by_name(),
        ..Default::default()
    };
    let poets = store.list_poets(&query, None)?.items;
    Ok(Json(HomePage {
        eras: group_by_era(poets),
    })
    .into_response())
}

// =============================================================================
// Poet
// =============================================================================

#[derive(Serialize)]
struct PoetPage {
    poet: PoetDetail,
    categories: Vec<CategorySummary>,
    poems: Vec<PoemSummary>,
}

async fn poet_page(
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    let poet = store.get_poet(id)?.ok_or_else(|| ApiError::poet_not_found(id))?;

    let categories = store
        .list_categories(
            &CategoryQuery {
                poet: Some(id),
                top_level_only: true,
                ordering: by_title_categories(),
                ..Default::default()
            },
            None,
        )?
        .items;
    let poems = store
        .list_poems(
            &PoemQuery {
                poet: Some(id),
                ordering: by_title_poems(),
                ..Default::default()
            },
            Some(PageRequest {
                offset: 0,
                limit: POET_PAGE_POEMS,
            }),
        )?
        .items;

    Ok(Json(PoetPage {
        poet,
        categories,
        poems,
    })
    .into_response())
}

// =============================================================================
// Category
// =============================================================================

#[derive(Serialize)]
struct CategoryPage {
    category: CategorySummary,
    poems: Vec<PoemSummary>,
    all_poems: Vec<Poem>,
    subcategories: Vec<CategorySummary>,
    breadcrumbs: Vec<Breadcrumb>,
}

async fn category_page(
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    let detail = store
        .get_category(id)?
        .ok_or_else(|| ApiError::category_not_found(id))?;

    let poems = store
        .list_poems(
            &PoemQuery {
                category: Some(id),
                ordering: by_title_poems(),
                ..Default::default()
            },
            None,
        )?
        .items;

    let all_poems = match store.category_forest(id)? {
        Some(forest) => forest
            .get(id)
            .map(|category| forest.collect_poems(category).into_iter().cloned().collect())
            .unwrap_or_default(),
        None => vec![],
    };
    debug!("Category {} holds {} poems in its subtree", id, all_poems.len());

    Ok(Json(CategoryPage {
        category: detail.summary,
        poems,
        all_poems,
        subcategories: detail.children,
        breadcrumbs: detail.breadcrumbs,
    })
    .into_response())
}

// =============================================================================
// Poem
// =============================================================================

#[derive(Serialize)]
struct PoemPage {
    poem: PoemSummary,
    poet_id: i64,
    verses: VerseLayout,
    breadcrumbs: Vec<Breadcrumb>,
    audios: Vec<AudioView>,
}

async fn poem_page(
    State(store): State<GuardedArchiveStore>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    let detail = store.get_poem(id)?.ok_or_else(|| ApiError::poem_not_found(id))?;

    let verses: Vec<_> = detail.verses.into_iter().map(|view| view.verse).collect();
    let category_id = detail.summary.poem.category_id;
    let breadcrumbs = match store.category_lineage(category_id)? {
        Some(lineage) => lineage
            .breadcrumbs(lineage.get(category_id))
            .into_iter()
            .map(Breadcrumb::from)
            .collect(),
        None => vec![],
    };

    Ok(Json(PoemPage {
        poem: detail.summary,
        poet_id: detail.poet_id,
        verses: layout(&verses),
        breadcrumbs,
        audios: detail.audios,
    })
    .into_response())
}

// =============================================================================
// Favorites
// =============================================================================

#[derive(Serialize)]
struct FavoritesPage {
    favorites: Vec<FavoriteView>,
}

async fn favorites_page(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Result<Response, ApiError> {
    let favorites = user_manager.list_favorites(session.user_id, &FavoriteQuery::default())?;
    Ok(Json(FavoritesPage { favorites }).into_response())
}

// =============================================================================
// Search
// =============================================================================

#[derive(Debug, Deserialize)]
struct SearchPageParams {
    q: Option<String>,
    poet: Option<String>,
}

#[derive(Serialize)]
struct SearchPage {
    query: String,
    poems: Vec<PoemSummary>,
    poets: Vec<PoetSummary>,
    selected_poet_id: Option<i64>,
}

async fn search_page(
    State(store): State<GuardedArchiveStore>,
    State(search_vault): State<GuardedSearchVault>,
    Query(params): Query<SearchPageParams>,
) -> Result<Response, ApiError> {
    let query = params.q.unwrap_or_default().trim().to_string();
    let selected_poet_id = params
        .poet
        .as_deref()
        .and_then(|raw| raw.trim().parse::<i64>().ok());

    let poems = if query.is_empty() {
        vec![]
    } else {
        search_vault.search(&query, selected_poet_id)?
    };
    let poets = store
        .list_poets(
            &PoetQuery {
                ordering: by_name(),
                ..Default::default()
            },
            None,
        )?
        .items;

    Ok(Json(SearchPage {
        query,
        poems,
        poets,
        selected_poet_id,
    })
    .into_response())
}

pub fn make_page_routes(state: ServerState) -> Router {
    let home_routes: Router = Router::new()
        .route("/home", get(home_page))
        .layer(middleware::from_fn_with_state(
            state.config.content_cache_age_sec,
            http_cache,
        ))
        .with_state(state.clone());

    Router::new()
        .route("/poet/{id}", get(poet_page))
        .route("/category/{id}", get(category_page))
        .route("/poem/{id}", get(poem_page))
        .route("/favorites", get(favorites_page))
        .route("/search", get(search_page))
        .with_state(state)
        .merge(home_routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive_store::Poet;

    fn summary(id: i64, name: &str, century: Century) -> PoetSummary {
        PoetSummary {
            poet: Poet {
                id,
                name: name.to_string(),
                description: String::new(),
                century,
                image: None,
                image_slug: None,
            },
            poems_count: 0,
        }
    }

    #[test]
    fn eras_follow_enumeration_order_and_skip_empty_ones() {
        let poets = vec![
            summary(1, "Shamlou", Century::Modern),
            summary(2, "Hafez", Century::Classical),
            summary(3, "Saadi", Century::Classical),
        ];

        let groups = group_by_era(poets);

        let eras: Vec<_> = groups.iter().map(|g| g.century).collect();
        assert_eq!(eras, vec![Century::Classical, Century::Modern]);
        assert_eq!(groups[0].display_name, "کلاسیک");
        let names: Vec<_> = groups[0].poets.iter().map(|p| p.poet.name.as_str()).collect();
        assert_eq!(names, vec!["Hafez", "Saadi"]);
    }

    #[test]
    fn no_poets_means_no_eras() {
        assert!(group_by_era(vec![]).is_empty());
    }
}
