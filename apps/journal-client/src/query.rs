//! Paginated Query Controller
//!
//! Drives one list view: owns page/size/sort/search state, debounces
//! free-text search, and reconciles responses while discarding stale ones.
//!
//! Every dispatched fetch captures a fresh value of a monotonic request
//! epoch; a response is applied only if no newer request has been issued in
//! the meantime. Superseded responses are dropped without cancelling the
//! underlying transfer, so rapid paging or typing can never render an older
//! page over a newer one.
//!
//! Controllers are isolated per view instance and never share an epoch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;

use crate::config::QuerySettings;
use crate::error::ApiError;

/// Sort direction for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

impl SortOrder {
    /// Wire value for the `sort_order` query parameter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One page request as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// 1-based page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Sort column, if any.
    pub sort_by: Option<String>,
    /// Sort direction.
    pub sort_order: SortOrder,
    /// Committed search text (already debounced).
    pub search: String,
}

impl ListQuery {
    /// Render as query parameters. The `search` parameter is omitted when
    /// the committed text is empty.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        if let Some(sort_by) = &self.sort_by {
            params.push(("sort_by", sort_by.clone()));
        }
        params.push(("sort_order", self.sort_order.as_str().to_string()));
        if !self.search.is_empty() {
            params.push(("search", self.search.clone()));
        }
        params
    }
}

/// Pagination envelope returned by every list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    /// 1-based page number of this response.
    pub page: u32,
    /// Total page count.
    pub pages: u32,
    /// Total item count across all pages.
    pub total: u64,
    /// Whether an earlier page exists.
    #[serde(default)]
    pub has_prev: bool,
    /// Whether a later page exists.
    #[serde(default)]
    pub has_next: bool,
}

/// One page of items plus its pagination envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    /// Items in server order; never reordered client-side.
    pub items: Vec<T>,
    /// Pagination envelope.
    pub pagination: PageInfo,
}

/// Source of pages for one list resource.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Fetch one page matching the query.
    async fn fetch_page(&self, query: &ListQuery) -> Result<Paginated<T>, ApiError>;
}

/// Snapshot of a list view's render state.
#[derive(Debug, Clone)]
pub struct PageView<T> {
    /// Items of the most recently applied page (server order).
    pub items: Vec<T>,
    /// Current 1-based page.
    pub page: u32,
    /// Total page count from the last successful fetch.
    pub total_pages: u32,
    /// Total item count from the last successful fetch.
    pub total_items: u64,
    /// Whether an earlier page exists.
    pub has_prev: bool,
    /// Whether a later page exists.
    pub has_next: bool,
    /// Whether the latest dispatched fetch is still in flight.
    pub loading: bool,
    /// User-facing message from the last failed fetch, if any.
    pub error: Option<String>,
}

/// Mutable query parameters for the view.
#[derive(Debug)]
struct QueryState {
    page: u32,
    per_page: u32,
    sort_by: Option<String>,
    sort_order: SortOrder,
    raw_search: String,
    committed_search: String,
}

/// Applied results for the view.
#[derive(Debug)]
struct ViewState<T> {
    items: Vec<T>,
    total_pages: u32,
    total_items: u64,
    has_prev: bool,
    has_next: bool,
    loading: bool,
    error: Option<String>,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total_pages: 0,
            total_items: 0,
            has_prev: false,
            has_next: false,
            loading: false,
            error: None,
        }
    }
}

/// Controller for one paginated, searchable list view.
///
/// Cheap to clone; clones drive the same view state.
pub struct PagedQuery<T> {
    source: Arc<dyn PageSource<T>>,
    debounce: Duration,
    state: Arc<RwLock<QueryState>>,
    view: Arc<RwLock<ViewState<T>>>,
    /// Monotonic fetch counter; only the response matching the latest value
    /// is ever applied.
    epoch: Arc<AtomicU64>,
    /// Generation counter for raw search text; a commit fires only if no
    /// newer keystroke superseded it during the quiet interval.
    search_generation: Arc<AtomicU64>,
    pending_commit: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl<T> Clone for PagedQuery<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            debounce: self.debounce,
            state: Arc::clone(&self.state),
            view: Arc::clone(&self.view),
            epoch: Arc::clone(&self.epoch),
            search_generation: Arc::clone(&self.search_generation),
            pending_commit: Arc::clone(&self.pending_commit),
        }
    }
}

impl<T> PagedQuery<T>
where
    T: Send + Sync + 'static,
{
    /// Create a controller over a page source.
    #[must_use]
    pub fn new(source: Arc<dyn PageSource<T>>, settings: &QuerySettings) -> Self {
        Self {
            source,
            debounce: settings.search_debounce,
            state: Arc::new(RwLock::new(QueryState {
                page: 1,
                per_page: settings.page_size,
                sort_by: None,
                sort_order: SortOrder::default(),
                raw_search: String::new(),
                committed_search: String::new(),
            })),
            view: Arc::new(RwLock::new(ViewState::default())),
            epoch: Arc::new(AtomicU64::new(0)),
            search_generation: Arc::new(AtomicU64::new(0)),
            pending_commit: Arc::new(Mutex::new(None)),
        }
    }

    /// The search text as typed, before the debounce commits it.
    #[must_use]
    pub fn raw_search_text(&self) -> String {
        self.state.read().raw_search.clone()
    }

    /// The committed (fetch-driving) search text.
    #[must_use]
    pub fn committed_search_text(&self) -> String {
        self.state.read().committed_search.clone()
    }

    /// Fetch the current page/sort/search combination.
    ///
    /// If a newer fetch is dispatched while this one is in flight, this
    /// one's response is discarded.
    pub async fn refresh(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let query = self.current_query();
        self.view.write().loading = true;

        let result = self.source.fetch_page(&query).await;

        let mut view = self.view.write();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!(epoch, "Discarding superseded page response");
            return;
        }

        view.loading = false;
        match result {
            Ok(page) => {
                self.state.write().page = page.pagination.page;
                view.items = page.items;
                view.total_pages = page.pagination.pages;
                view.total_items = page.pagination.total;
                view.has_prev = page.pagination.has_prev;
                view.has_next = page.pagination.has_next;
                view.error = None;
            }
            Err(e) => {
                // Never leave stale rows that misrepresent the backend;
                // pagination counters keep their last known values.
                view.items.clear();
                view.error = Some(e.user_message());
            }
        }
    }

    /// Navigate to a page. No-op when the target is outside the known page
    /// range (and before any fetch has established totals).
    pub async fn go_to_page(&self, page: u32) {
        let total_pages = self.view.read().total_pages;
        if page < 1 || page > total_pages {
            return;
        }
        self.state.write().page = page;
        self.refresh().await;
    }

    /// Change the sort column/direction. Resets to page 1 and refetches.
    pub async fn set_sort(&self, sort_by: Option<String>, sort_order: SortOrder) {
        {
            let mut state = self.state.write();
            state.sort_by = sort_by;
            state.sort_order = sort_order;
            state.page = 1;
        }
        self.refresh().await;
    }

    /// Record a search keystroke.
    ///
    /// The raw text updates immediately so the input stays responsive; the
    /// commit (page reset + fetch) is scheduled after the quiet interval.
    /// A newer keystroke cancels the pending commit and starts a new timer.
    pub fn set_search_text(&self, text: &str) {
        self.state.write().raw_search = text.to_string();
        let generation = self.search_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut pending = self.pending_commit.lock();
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let this = self.clone();
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(this.debounce).await;
            this.commit_search(generation).await;
        }));
    }

    /// Commit the raw search text if no newer keystroke superseded it.
    async fn commit_search(&self, generation: u64) {
        {
            if self.search_generation.load(Ordering::SeqCst) != generation {
                return;
            }
            let mut state = self.state.write();
            state.committed_search = state.raw_search.clone();
            state.page = 1;
        }
        self.refresh().await;
    }

    fn current_query(&self) -> ListQuery {
        let state = self.state.read();
        ListQuery {
            page: state.page,
            per_page: state.per_page,
            sort_by: state.sort_by.clone(),
            sort_order: state.sort_order,
            search: state.committed_search.clone(),
        }
    }
}

impl<T> PagedQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Snapshot the current render state.
    #[must_use]
    pub fn view(&self) -> PageView<T> {
        // Never hold both locks at once; refresh() takes them in the
        // opposite order.
        let page = self.state.read().page;
        let view = self.view.read();
        PageView {
            items: view.items.clone(),
            page,
            total_pages: view.total_pages,
            total_items: view.total_items,
            has_prev: view.has_prev,
            has_next: view.has_next,
            loading: view.loading,
            error: view.error.clone(),
        }
    }
}
