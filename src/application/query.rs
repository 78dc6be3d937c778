//! List query coordination: search debouncing, filter/sort/page state and
//! the decision of when a new list request is required.
//!
//! [`QueryCoordinator`] is a synchronous state machine. Every transition
//! returns the list request it makes necessary, if any, by comparing the
//! would-be request with the last one issued. Search edits schedule a
//! cancellable debounce task that reports back through a channel;
//! [`ListSession`] wires those messages, UI events and remote calls together.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use blogdesk_api_types::query as keys;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, trace};

use crate::config::Settings;
use crate::domain::error::DomainError;
use crate::domain::posts::Category;

use super::actions::PostActions;
use super::api::BlogApi;

const SOURCE: &str = "application::query";

/// Quiet period before a search edit reaches the server.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

const EMPTY_UNFILTERED: &str = "No blog posts have been published yet.";
const EMPTY_FILTERED: &str = "No blog posts match your filters.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// Value for the `category` query parameter; `All` sends nothing.
    pub fn as_query_value(self) -> Option<&'static str> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Only(category) => Some(category.as_str()),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        value.parse().map(CategoryFilter::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Title,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::Title => "title",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            "title" => Ok(SortOrder::Title),
            other => Err(DomainError::validation(format!(
                "unknown sort order `{other}`"
            ))),
        }
    }
}

/// User-controlled parameters of the list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub search_term: String,
    pub debounced_search_term: String,
    pub category: CategoryFilter,
    pub sort: SortOrder,
    pub page: u32,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            debounced_search_term: String::new(),
            category: CategoryFilter::All,
            sort: SortOrder::Newest,
            page: 1,
        }
    }
}

/// Parameters of one list request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub search_term: String,
    pub category: CategoryFilter,
    pub sort: SortOrder,
}

impl ListQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            (keys::PAGE, self.page.to_string()),
            (keys::LIMIT, self.limit.to_string()),
        ];
        let search = self.search_term.trim();
        if !search.is_empty() {
            pairs.push((keys::SEARCH_TERM, search.to_string()));
        }
        if let Some(category) = self.category.as_query_value() {
            pairs.push((keys::CATEGORY, category.to_string()));
        }
        pairs.push((keys::SORT_BY, self.sort.as_str().to_string()));
        pairs
    }
}

/// Message sent by a debounce task once its quiet period elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledSearch {
    token: u64,
    term: String,
}

impl SettledSearch {
    pub fn term(&self) -> &str {
        &self.term
    }
}

/// Pending debounce timer; dropping it cancels the timer.
#[derive(Debug)]
struct DebounceTask {
    token: u64,
    handle: JoinHandle<()>,
}

impl Drop for DebounceTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug)]
pub struct QueryCoordinator {
    state: QueryState,
    limit: u32,
    debounce: Duration,
    settled_tx: mpsc::UnboundedSender<SettledSearch>,
    pending: Option<DebounceTask>,
    next_token: u64,
    last_issued: Option<ListQuery>,
    force_fetch: bool,
}

impl QueryCoordinator {
    /// Create a coordinator and the receiver its debounce tasks report to.
    pub fn new(limit: u32, debounce: Duration) -> (Self, mpsc::UnboundedReceiver<SettledSearch>) {
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            state: QueryState::default(),
            limit,
            debounce,
            settled_tx,
            pending: None,
            next_token: 0,
            last_issued: None,
            force_fetch: false,
        };
        (coordinator, settled_rx)
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn has_pending_search(&self) -> bool {
        self.pending.is_some()
    }

    pub fn current_query(&self) -> ListQuery {
        ListQuery {
            page: self.state.page,
            limit: self.limit,
            search_term: self.state.debounced_search_term.clone(),
            category: self.state.category,
            sort: self.state.sort,
        }
    }

    /// Fetch required when the list view first appears.
    pub fn initial_fetch(&mut self) -> Option<ListQuery> {
        self.derive_fetch()
    }

    /// Must be called from within a tokio runtime: it spawns the debounce timer.
    pub fn edit_search(&mut self, term: impl Into<String>) -> Option<ListQuery> {
        let term = term.into();
        self.state.search_term = term.clone();
        self.state.page = 1;
        self.schedule_settle(term);
        self.derive_fetch()
    }

    pub fn settle_search(&mut self, settled: SettledSearch) -> Option<ListQuery> {
        let current = self.pending.as_ref().map(|task| task.token);
        if current != Some(settled.token) {
            trace!(
                source = SOURCE,
                token = settled.token,
                "ignoring superseded search"
            );
            return None;
        }
        self.pending = None;
        self.state.debounced_search_term = settled.term;
        self.derive_fetch()
    }

    pub fn set_category(&mut self, category: CategoryFilter) -> Option<ListQuery> {
        if self.state.category != category {
            self.state.category = category;
            self.state.page = 1;
        }
        self.derive_fetch()
    }

    pub fn set_sort(&mut self, sort: SortOrder) -> Option<ListQuery> {
        if self.state.sort != sort {
            self.state.sort = sort;
            self.state.page = 1;
        }
        self.derive_fetch()
    }

    /// Pages outside `1..=total_pages` are ignored.
    pub fn set_page(&mut self, page: u32, total_pages: u32) -> Option<ListQuery> {
        if page < 1 || page > total_pages {
            debug!(source = SOURCE, page, total_pages, "page out of range");
            return None;
        }
        self.state.page = page;
        self.derive_fetch()
    }

    /// Re-request the current query, e.g. after a failed list.
    pub fn retry(&mut self) -> Option<ListQuery> {
        self.force_fetch = true;
        self.derive_fetch()
    }

    /// Replace the whole query state, dropping any pending search.
    pub fn restore(&mut self, state: QueryState) {
        self.pending = None;
        self.state = QueryState {
            page: state.page.max(1),
            ..state
        };
    }

    /// Restore defaults and always request a fresh list.
    pub fn reset(&mut self) -> Option<ListQuery> {
        self.pending = None;
        self.state = QueryState::default();
        self.force_fetch = true;
        self.derive_fetch()
    }

    pub fn is_filtered(&self) -> bool {
        let defaults = QueryState::default();
        self.state.search_term != defaults.search_term
            || self.state.category != defaults.category
            || self.state.sort != defaults.sort
            || self.state.page != defaults.page
    }

    pub fn empty_message(&self) -> &'static str {
        if self.is_filtered() {
            EMPTY_FILTERED
        } else {
            EMPTY_UNFILTERED
        }
    }

    fn derive_fetch(&mut self) -> Option<ListQuery> {
        let query = self.current_query();
        let forced = std::mem::take(&mut self.force_fetch);
        if !forced && self.last_issued.as_ref() == Some(&query) {
            return None;
        }
        self.last_issued = Some(query.clone());
        Some(query)
    }

    fn schedule_settle(&mut self, term: String) {
        self.next_token += 1;
        let token = self.next_token;
        let delay = self.debounce;
        let tx = self.settled_tx.clone();
        trace!(source = SOURCE, token, ?delay, "scheduling search debounce");

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SettledSearch { token, term });
        });
        // Replacing the previous task drops it, which aborts its timer.
        self.pending = Some(DebounceTask { token, handle });
    }
}

/// UI intents understood by [`ListSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryEvent {
    Search(String),
    Category(CategoryFilter),
    Sort(SortOrder),
    Page(u32),
    Retry,
    Reset,
}

/// Drives a [`QueryCoordinator`] and issues list requests through [`PostActions`].
///
/// Requests are spawned, not awaited in sequence: a slow response can land
/// after a newer one and overwrite the store.
pub struct ListSession<A: ?Sized> {
    coordinator: QueryCoordinator,
    settled_rx: mpsc::UnboundedReceiver<SettledSearch>,
    actions: PostActions<A>,
    in_flight: JoinSet<()>,
}

impl<A> ListSession<A>
where
    A: BlogApi + ?Sized + 'static,
{
    pub fn new(actions: PostActions<A>, limit: u32, debounce: Duration) -> Self {
        let (coordinator, settled_rx) = QueryCoordinator::new(limit, debounce);
        Self {
            coordinator,
            settled_rx,
            actions,
            in_flight: JoinSet::new(),
        }
    }

    /// Page size and search debounce taken from the loaded settings.
    pub fn from_settings(actions: PostActions<A>, settings: &Settings) -> Self {
        Self::new(
            actions,
            settings.api.page_limit.get(),
            settings.list.search_debounce,
        )
    }

    /// Start from `state` instead of the defaults.
    pub fn starting_at(mut self, state: QueryState) -> Self {
        self.coordinator.restore(state);
        self
    }

    pub fn coordinator(&self) -> &QueryCoordinator {
        &self.coordinator
    }

    pub fn actions(&self) -> &PostActions<A> {
        &self.actions
    }

    /// Process events until the sender side closes, then wait for outstanding requests.
    pub async fn run(mut self, mut events: mpsc::Receiver<QueryEvent>) -> Self {
        let initial = self.coordinator.initial_fetch();
        self.issue(initial);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        let fetch = self.handle(event);
                        self.issue(fetch);
                    }
                    None => break,
                },
                Some(settled) = self.settled_rx.recv() => {
                    let fetch = self.coordinator.settle_search(settled);
                    self.issue(fetch);
                }
            }
        }

        while self.in_flight.join_next().await.is_some() {}
        self
    }

    fn handle(&mut self, event: QueryEvent) -> Option<ListQuery> {
        trace!(source = SOURCE, ?event, "query event");
        match event {
            QueryEvent::Search(term) => self.coordinator.edit_search(term),
            QueryEvent::Category(category) => self.coordinator.set_category(category),
            QueryEvent::Sort(sort) => self.coordinator.set_sort(sort),
            QueryEvent::Page(page) => {
                let total_pages = self.actions.store().total_pages();
                self.coordinator.set_page(page, total_pages)
            }
            QueryEvent::Retry => self.coordinator.retry(),
            QueryEvent::Reset => self.coordinator.reset(),
        }
    }

    fn issue(&mut self, fetch: Option<ListQuery>) {
        let Some(query) = fetch else {
            return;
        };
        debug!(
            source = SOURCE,
            page = query.page,
            search = %query.search_term,
            sort = %query.sort,
            "issuing list request"
        );
        let actions = self.actions.clone();
        self.in_flight.spawn(async move {
            let _ = actions.list(&query).await;
        });
    }
}
