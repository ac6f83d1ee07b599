//! Paginated catalog browsing: one state object per list page, fed by the
//! `list` endpoint and driven by search, filter and scroll events.
//!
//! [CatalogState] is the plain state machine: it owns the accumulated item
//! list, the page counters and the in-flight guard, and hands out
//! [LoadTicket]s that serialize fetches. [CatalogBrowser] wraps it together
//! with a [HondanaClient] and performs the actual requests. All mutations
//! funnel through `&mut self`, so the browser behaves like the single UI
//! thread it replaces.

use crate::requests::collection::{ChapterSummary, ItemSummary, ListQuery, PageResult};
use crate::requests::config::UiConfig;
use crate::requests::query_utils::{Capabilities, Section};
use crate::requests::status::{Status, ToggleOutcome};
use crate::requests::Result;
use crate::timing::{Debouncer, Throttle, SCROLL_THROTTLE};
use crate::HondanaClient;

use tokio::sync::mpsc;

use std::time::Duration;

/// Scroll distance from the document bottom that triggers the next append
pub const NEAR_BOTTOM_UNITS: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Replace,
    Append,
}

/// What the list page currently shows. `NoResults` is deliberately distinct
/// from `Error`: an empty listing renders the empty view, a failed fetch
/// renders a transient notice over the previous state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogPhase {
    Idle,
    Loading,
    Ready,
    NoResults,
    Error(String),
}

/// Permission to run one fetch. Tickets carry a sequence number; a response
/// whose ticket is no longer the latest issued is discarded instead of
/// overwriting fresher state
#[derive(Debug, Clone, Copy)]
pub struct LoadTicket {
    seq: u64,
    pub page: usize,
    pub mode: LoadMode,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub content_height: f64,
}

impl ScrollMetrics {
    fn near_bottom(&self) -> bool {
        self.scroll_top + self.viewport_height >= self.content_height - NEAR_BOTTOM_UNITS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationInfo {
    pub shown: usize,
    pub total: usize,
    pub has_more: bool,
}

/// Outcome of one driver call on [CatalogBrowser]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The fetch ran and its page was merged into the accumulated list
    Applied(PaginationInfo),
    /// The call was a no-op: a load was already in flight or a guard held
    Dropped,
    /// The fetch completed but its ticket was stale and the response was
    /// discarded
    Stale,
}

#[derive(Debug)]
pub struct CatalogState {
    section: Section,
    per_page: usize,
    skip_chapters: bool,
    items: Vec<ItemSummary>,
    current_page: usize,
    total_pages: usize,
    total: usize,
    filter_tag: Option<String>,
    search_term: Option<String>,
    status_filter: Option<Status>,
    favorite_only: bool,
    local_filter: String,
    phase: CatalogPhase,
    in_flight: Option<u64>,
    latest_seq: u64,
}

impl CatalogState {
    pub fn new(section: Section, per_page: usize, skip_chapters: bool) -> Self {
        Self {
            section,
            per_page: per_page.max(1),
            skip_chapters,
            items: Vec::new(),
            current_page: 1,
            total_pages: 1,
            total: 0,
            filter_tag: None,
            search_term: None,
            status_filter: None,
            favorite_only: false,
            local_filter: String::new(),
            phase: CatalogPhase::Idle,
            in_flight: None,
            latest_seq: 0,
        }
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn items(&self) -> &[ItemSummary] {
        &self.items
    }

    pub fn phase(&self) -> &CatalogPhase {
        &self.phase
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search_term.as_deref()
    }

    pub fn pagination_info(&self) -> PaginationInfo {
        PaginationInfo {
            shown: self.items.len(),
            total: self.total,
            has_more: self.total > self.items.len(),
        }
    }

    /// Takes the in-flight guard and issues a ticket for one fetch. A call
    /// arriving while a load is in flight is dropped, not queued
    pub fn begin_load(&mut self, page: usize, mode: LoadMode) -> Option<LoadTicket> {
        if self.in_flight.is_some() {
            return None;
        }

        self.latest_seq += 1;
        self.in_flight = Some(self.latest_seq);
        self.phase = CatalogPhase::Loading;

        Some(LoadTicket {
            seq: self.latest_seq,
            page: page.max(1),
            mode,
        })
    }

    /// The query the ticket's fetch should carry
    pub fn query_for(&self, ticket: &LoadTicket) -> ListQuery {
        ListQuery {
            page: Some(ticket.page),
            per_page: Some(self.per_page),
            filter_tag: self.filter_tag.clone(),
            search: self.search_term.clone(),
            status: self.status_filter,
            favorite_only: self.favorite_only.then_some(true),
            skip_chapters: Some(self.skip_chapters),
        }
    }

    /// Merges a page result into the accumulated list. Returns `false` when
    /// the ticket went stale (a reset happened while the fetch was out) and
    /// the response was discarded
    pub fn apply(&mut self, ticket: &LoadTicket, result: PageResult) -> bool {
        if ticket.seq != self.latest_seq {
            tracing::debug!(seq = ticket.seq, "discarding stale page response");

            return false;
        }

        self.in_flight = None;
        self.current_page = result.normalized_page();
        self.total_pages = result.normalized_total_pages();
        self.total = result.total;

        match ticket.mode {
            LoadMode::Replace => self.items = result.items,
            LoadMode::Append => self.items.extend(result.items),
        }

        self.phase = if self.items.is_empty() {
            CatalogPhase::NoResults
        } else {
            CatalogPhase::Ready
        };

        true
    }

    /// Records a failed fetch. The accumulated list and page counters stay
    /// untouched; only a transient error notice surfaces
    pub fn fail(&mut self, ticket: &LoadTicket, message: impl Into<String>) {
        if ticket.seq != self.latest_seq {
            tracing::debug!(seq = ticket.seq, "discarding stale load failure");

            return;
        }

        self.in_flight = None;
        self.phase = CatalogPhase::Error(message.into());
    }

    fn reset_accumulation(&mut self) {
        self.items.clear();
        self.current_page = 1;
        self.total_pages = 1;
        self.total = 0;
        // abandon whatever is in flight: bumping the sequence makes any
        // outstanding ticket stale at apply time
        self.in_flight = None;
        self.latest_seq += 1;
    }

    /// Applies a new search term: accumulation resets to page 1 and a
    /// replace-mode ticket carrying the term is issued
    pub fn search(&mut self, term: &str) -> LoadTicket {
        let term = term.trim();
        self.search_term = (!term.is_empty()).then(|| term.to_owned());
        self.reset_accumulation();

        self.begin_load(1, LoadMode::Replace)
            .expect("reset cleared the in-flight guard")
    }

    /// Applies a tag filter, clearing any active search term
    pub fn filter_by_tag(&mut self, tag: Option<&str>) -> LoadTicket {
        self.filter_tag = tag.map(str::to_owned);
        self.search_term = None;
        self.local_filter.clear();
        self.reset_accumulation();

        self.begin_load(1, LoadMode::Replace)
            .expect("reset cleared the in-flight guard")
    }

    /// Applies a status filter, clearing any active search term
    pub fn filter_by_status(&mut self, status: Option<Status>) -> LoadTicket {
        self.status_filter = status;
        self.search_term = None;
        self.local_filter.clear();
        self.reset_accumulation();

        self.begin_load(1, LoadMode::Replace)
            .expect("reset cleared the in-flight guard")
    }

    pub fn set_favorite_only(&mut self, favorite_only: bool) -> LoadTicket {
        self.favorite_only = favorite_only;
        self.reset_accumulation();

        self.begin_load(1, LoadMode::Replace)
            .expect("reset cleared the in-flight guard")
    }

    /// Scroll-position listener body: issues the next append ticket when the
    /// viewport is near the document bottom, more pages remain, nothing is
    /// in flight and no client-only filter is active
    pub fn handle_scroll(&mut self, metrics: ScrollMetrics) -> Option<LoadTicket> {
        if !self.local_filter.is_empty() {
            // the filtered view does not reflect true pagination, so
            // scrolling past its end must not fetch
            return None;
        }

        if self.in_flight.is_some() || self.current_page >= self.total_pages {
            return None;
        }

        if !metrics.near_bottom() {
            return None;
        }

        self.begin_load(self.current_page + 1, LoadMode::Append)
    }

    /// Explicit "load more" control
    pub fn load_more(&mut self) -> Option<LoadTicket> {
        if self.current_page >= self.total_pages {
            return None;
        }

        self.begin_load(self.current_page + 1, LoadMode::Append)
    }

    /// Client-only filtering over the already-accumulated list (the weaker
    /// search variant). Matches item names and chapter names
    pub fn set_local_filter(&mut self, term: &str) {
        self.local_filter = term.trim().to_owned();
    }

    pub fn filtered_items(&self) -> Vec<&ItemSummary> {
        if self.local_filter.is_empty() {
            return self.items.iter().collect();
        }

        let needle = self.local_filter.to_lowercase();

        self.items
            .iter()
            .filter(|item| {
                item.name.to_lowercase().contains(&needle)
                    || item
                        .chapters
                        .iter()
                        .any(|chapter| chapter.name.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Patches the cached copy of an entity after a successful status write
    pub fn patch_status(&mut self, path: &str, status: Status) {
        if let Some(item) = self.items.iter_mut().find(|item| item.path == path) {
            item.status = Some(status);
        }
    }
}

/// Async driver owning the client and the per-page state
#[derive(Debug)]
pub struct CatalogBrowser {
    client: HondanaClient,
    section: Section,
    config: UiConfig,
    state: CatalogState,
    scroll_gate: Throttle,
}

impl CatalogBrowser {
    /// Fetches the UI configuration and builds a browser parameterized by it
    pub async fn open(client: HondanaClient, section: Section) -> Self {
        let config = client.fetch_config().await;

        Self::with_config(client, section, config)
    }

    pub fn with_config(client: HondanaClient, section: Section, config: UiConfig) -> Self {
        let list = config.list_section(section);
        let state = CatalogState::new(section, list.per_page(), list.skip_chapters(section));

        Self {
            client,
            section,
            config,
            state,
            scroll_gate: Throttle::new(SCROLL_THROTTLE),
        }
    }

    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    pub fn config(&self) -> &UiConfig {
        &self.config
    }

    pub fn search_debounce(&self) -> Duration {
        self.config.list_section(self.section).search_debounce()
    }

    async fn run(&mut self, ticket: LoadTicket) -> Result<LoadOutcome> {
        let query = self.state.query_for(&ticket);

        match self.client.list(self.section, &query).await {
            Ok(result) => {
                if self.state.apply(&ticket, result) {
                    Ok(LoadOutcome::Applied(self.state.pagination_info()))
                } else {
                    Ok(LoadOutcome::Stale)
                }
            }
            Err(e) => {
                self.state.fail(&ticket, e.to_string());

                Err(e)
            }
        }
    }

    pub async fn load(&mut self, page: usize, mode: LoadMode) -> Result<LoadOutcome> {
        match self.state.begin_load(page, mode) {
            Some(ticket) => self.run(ticket).await,
            None => Ok(LoadOutcome::Dropped),
        }
    }

    pub async fn search(&mut self, term: &str) -> Result<LoadOutcome> {
        let ticket = self.state.search(term);

        self.run(ticket).await
    }

    pub async fn filter_by_tag(&mut self, tag: Option<&str>) -> Result<LoadOutcome> {
        let ticket = self.state.filter_by_tag(tag);

        self.run(ticket).await
    }

    pub async fn filter_by_status(&mut self, status: Option<Status>) -> Result<LoadOutcome> {
        let ticket = self.state.filter_by_status(status);

        self.run(ticket).await
    }

    pub async fn set_favorite_only(&mut self, favorite_only: bool) -> Result<LoadOutcome> {
        let ticket = self.state.set_favorite_only(favorite_only);

        self.run(ticket).await
    }

    /// Rate-limited scroll listener entry point
    pub async fn on_scroll(&mut self, metrics: ScrollMetrics) -> Result<LoadOutcome> {
        if !self.scroll_gate.allow() {
            return Ok(LoadOutcome::Dropped);
        }

        match self.state.handle_scroll(metrics) {
            Some(ticket) => self.run(ticket).await,
            None => Ok(LoadOutcome::Dropped),
        }
    }

    pub async fn load_more(&mut self) -> Result<LoadOutcome> {
        match self.state.load_more() {
            Some(ticket) => self.run(ticket).await,
            None => Ok(LoadOutcome::Dropped),
        }
    }

    pub fn set_local_filter(&mut self, term: &str) {
        self.state.set_local_filter(term);
    }

    pub fn filtered_items(&self) -> Vec<&ItemSummary> {
        self.state.filtered_items()
    }

    /// Toggles an entity's favorite flag and patches the cached card copy
    /// on success
    pub async fn toggle_favorite(&mut self, path: &str, resting: Status) -> Result<ToggleOutcome> {
        let outcome = self.client.toggle_status(self.section, path, resting).await?;
        self.state.patch_status(path, outcome.current);

        Ok(outcome)
    }
}

/// Debounced search input edge. Keystrokes go in; at most one term per
/// quiet period comes out on the receiver, which the owning event loop
/// forwards to [CatalogBrowser::search]
#[derive(Debug)]
pub struct SearchBox {
    debouncer: Debouncer,
    tx: mpsc::Sender<String>,
}

impl SearchBox {
    pub fn new(delay: Duration) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(8);

        (
            Self {
                debouncer: Debouncer::new(delay),
                tx,
            },
            rx,
        )
    }

    pub fn input(&mut self, term: &str) {
        let tx = self.tx.clone();
        let term = term.trim().to_owned();

        self.debouncer.call(async move {
            // the receiver may be gone during teardown, nothing to deliver
            let _ = tx.send(term).await;
        });
    }
}

/// Source of a card's cover visual
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverSource {
    Remote(String),
    Glyph(char),
}

/// Secondary line of a card
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardDetail {
    Chapters(Vec<ChapterSummary>),
    ChapterCount(usize),
    ImageCount(usize),
    Hint,
}

/// Everything a renderer needs for one list card, derived from the item and
/// the section's capability descriptor instead of per-section card code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub title: String,
    pub cover: CoverSource,
    pub detail: CardDetail,
    pub external_link: Option<String>,
    pub favorite_glyph: Option<char>,
}

pub fn card_model(item: &ItemSummary, caps: Capabilities) -> Card {
    let cover = match &item.cover_image {
        Some(path) => CoverSource::Remote(path.clone()),
        None => CoverSource::Glyph(if caps.has_chapters { '📚' } else { '🎨' }),
    };

    let detail = if caps.has_chapters {
        if !item.chapters.is_empty() {
            CardDetail::Chapters(item.chapters.clone())
        } else if item.chapter_count > 0 {
            CardDetail::ChapterCount(item.chapter_count)
        } else {
            CardDetail::Hint
        }
    } else {
        CardDetail::ImageCount(item.chapter_count)
    };

    Card {
        title: item.name.clone(),
        cover,
        detail,
        external_link: if caps.has_external_link {
            item.url_link.clone()
        } else {
            None
        },
        favorite_glyph: caps
            .has_favorite
            .then(|| item.status.unwrap_or_default().glyph()),
    }
}
