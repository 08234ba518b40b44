//! Page-number pagination for list endpoints.

use super::api_error::ApiError;
use crate::archive_store::{Page, PageRequest};
use crate::config::PaginationSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// A resolved 1-based page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSelection {
    pub number: usize,
    pub size: usize,
}

impl PageSelection {
    /// Missing or unparsable sizes fall back to the default; large ones are
    /// capped at the configured maximum.
    pub fn resolve(params: &PageParams, settings: &PaginationSettings) -> Result<Self, ApiError> {
        let number = match params.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some("last") => usize::MAX,
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(invalid_page()),
            },
        };
        let size = params
            .page_size
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(settings.default_page_size)
            .min(settings.max_page_size);
        Ok(PageSelection { number, size })
    }

    pub fn request(&self) -> PageRequest {
        PageRequest {
            offset: self.number.saturating_sub(1).saturating_mul(self.size),
            limit: self.size,
        }
    }
}

fn invalid_page() -> ApiError {
    ApiError::NotFound {
        message_en: "Invalid page.".to_string(),
        message_fa: "صفحه نامعتبر است.".to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: usize,
    pub next: Option<usize>,
    pub previous: Option<usize>,
    pub results: Vec<T>,
}

fn page_count(count: usize, size: usize) -> usize {
    count.div_ceil(size).max(1)
}

impl<T> Paginated<T> {
    /// Wraps a store page. Asking past the last page is an error, except for
    /// page 1 of an empty list.
    pub fn from_page(page: Page<T>, selection: PageSelection) -> Result<Self, ApiError> {
        let pages = page_count(page.count, selection.size);
        if selection.number > pages {
            return Err(invalid_page());
        }
        Ok(Paginated {
            count: page.count,
            next: (selection.number < pages).then_some(selection.number + 1),
            previous: (selection.number > 1).then(|| selection.number - 1),
            results: page.items,
        })
    }

    /// Paginates an already materialized list.
    pub fn from_vec(items: Vec<T>, selection: PageSelection) -> Result<Self, ApiError> {
        let count = items.len();
        let pages = page_count(count, selection.size);
        let number = if selection.number == usize::MAX {
            pages
        } else {
            selection.number
        };
        let selection = PageSelection { number, ..selection };
        let request = selection.request();
        let items = items
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .collect();
        Self::from_page(Page { count, items }, selection)
    }
}

/// Runs a paged store query, resolving `page=last` once the total is known.
pub fn paginate<T>(
    params: &PageParams,
    settings: &PaginationSettings,
    fetch: impl Fn(PageRequest) -> anyhow::Result<Page<T>>,
) -> Result<Paginated<T>, ApiError> {
    let mut selection = PageSelection::resolve(params, settings)?;
    if selection.number == usize::MAX {
        let probe = fetch(PageRequest {
            offset: 0,
            limit: 1,
        })?;
        selection.number = page_count(probe.count, selection.size);
    }
    let page = fetch(selection.request())?;
    Paginated::from_page(page, selection)
}
