//! Reader-side lazy loading. One chapter fetch yields the complete ordered
//! image list; the [SlotBoard] realizes a small prefix eagerly, keeps
//! placeholders for the rest and promotes them as the viewport approaches,
//! while finished loads warm the next few images ahead of the reader.

use crate::requests::chapter::{ChapterImages, ChapterRef, Navigation};
use crate::requests::query_utils::Section;
use crate::requests::status::{Status, StatusRecord, ToggleOutcome};
use crate::requests::Result;
use crate::HondanaClient;

use tokio::sync::mpsc::{self, Sender};
use tokio::task;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt as _;

use parking_lot::{Mutex, MutexGuard};

use std::collections::HashSet;
use std::sync::Arc;

/// Slots realized synchronously on initialization, ahead of any viewport
/// signal
pub const INITIAL_BATCH: usize = 5;

/// Images warmed into the cache after each successful load
pub const PRELOAD_AHEAD: usize = 8;

/// Pre-trigger margin around the viewport, in layout units. Placeholders
/// promote well before the reader reaches them
pub const PROMOTE_MARGIN: f64 = 1200.0;

/// Assumed extent of a slot that has not been measured yet
pub const DEFAULT_SLOT_EXTENT: f64 = 800.0;

/// Inline fallback graphic substituted for a single failed image
pub fn fallback_data_uri() -> String {
    concat!(
        "data:image/svg+xml,",
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"400\" height=\"300\">",
        "<text x=\"50%\" y=\"50%\" text-anchor=\"middle\" fill=\"%23999\">image unavailable</text>",
        "</svg>"
    )
    .to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Remote(String),
    Fallback(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Loading,
    Loaded,
    Failed,
}

/// One reader slot: either an unrealized placeholder or an element bound to
/// its image source. The placeholder to realized transition is
/// one-directional and happens exactly once per index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSlot {
    Placeholder,
    Realized {
        source: ImageSource,
        state: SlotState,
    },
}

impl ImageSlot {
    pub fn is_realized(&self) -> bool {
        matches!(self, ImageSlot::Realized { .. })
    }

    pub fn is_loaded(&self) -> bool {
        matches!(
            self,
            ImageSlot::Realized {
                state: SlotState::Loaded,
                ..
            }
        )
    }
}

/// Scroll window over the rendered column, in layout units
#[derive(Debug, Clone, Copy, Default)]
pub struct Viewport {
    pub offset: f64,
    pub height: f64,
}

impl Viewport {
    fn midline(&self) -> f64 {
        self.offset + self.height / 2.0
    }
}

/// Logical reading position recorded before a reflow: the slot spanning the
/// viewport midline and the fractional offset within its extent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingAnchor {
    pub index: usize,
    pub fraction: f64,
}

/// Ordered slot column for one chapter
#[derive(Debug)]
pub struct SlotBoard {
    urls: Vec<String>,
    slots: Vec<ImageSlot>,
    extents: Vec<f64>,
    preloaded: HashSet<usize>,
    initial_batch: usize,
    preload_ahead: usize,
    promote_margin: f64,
}

impl SlotBoard {
    pub fn new(urls: Vec<String>) -> Self {
        Self::with_tuning(urls, INITIAL_BATCH, PRELOAD_AHEAD, PROMOTE_MARGIN)
    }

    pub fn with_tuning(
        urls: Vec<String>,
        initial_batch: usize,
        preload_ahead: usize,
        promote_margin: f64,
    ) -> Self {
        let len = urls.len();

        let mut board = Self {
            urls,
            slots: vec![ImageSlot::Placeholder; len],
            extents: vec![DEFAULT_SLOT_EXTENT; len],
            preloaded: HashSet::new(),
            initial_batch,
            preload_ahead,
            promote_margin,
        };

        for index in 0..initial_batch.min(len) {
            board.realize(index);
        }

        board
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&ImageSlot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[ImageSlot] {
        &self.slots
    }

    pub fn url(&self, index: usize) -> Option<&str> {
        self.urls.get(index).map(String::as_str)
    }

    pub fn realized_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_realized()).count()
    }

    pub fn placeholder_count(&self) -> usize {
        self.len() - self.realized_count()
    }

    fn realize(&mut self, index: usize) {
        self.slots[index] = ImageSlot::Realized {
            source: ImageSource::Remote(self.urls[index].clone()),
            state: SlotState::Loading,
        };
    }

    /// Intents for the initial cache warm, starting right after the eager
    /// batch
    pub fn initial_preload(&mut self) -> Vec<usize> {
        self.preload_window(self.initial_batch)
    }

    fn preload_window(&mut self, start: usize) -> Vec<usize> {
        let mut intents = Vec::new();

        for index in start..start + self.preload_ahead {
            if index >= self.urls.len() {
                break;
            }

            if self.preloaded.contains(&index) || self.slots[index].is_realized() {
                continue;
            }

            self.preloaded.insert(index);
            intents.push(index);
        }

        intents
    }

    /// Promotes every placeholder whose extent intersects the viewport
    /// extended by the pre-trigger margin. Each promotion happens exactly
    /// once; the returned indices need their fetches started
    pub fn poll_viewport(&mut self, viewport: Viewport) -> Vec<usize> {
        let lo = viewport.offset - self.promote_margin;
        let hi = viewport.offset + viewport.height + self.promote_margin;

        let mut promoted = Vec::new();
        let mut top = 0.0;

        for index in 0..self.slots.len() {
            let bottom = top + self.extents[index];

            if bottom >= lo {
                if top > hi {
                    break;
                }

                if matches!(self.slots[index], ImageSlot::Placeholder) {
                    self.realize(index);
                    promoted.push(index);
                }
            }

            top = bottom;
        }

        promoted
    }

    /// Records a finished load and returns the indices to warm next:
    /// `index+1 ..= index+N`, skipping anything already preloaded or
    /// realized
    pub fn mark_loaded(&mut self, index: usize) -> Vec<usize> {
        match self.slots.get_mut(index) {
            Some(ImageSlot::Realized { state, .. }) => {
                *state = SlotState::Loaded;

                self.preload_window(index + 1)
            }
            _ => Vec::new(),
        }
    }

    /// Substitutes the inline fallback graphic for a single failed slot.
    /// Neighbouring slots and the promotion pipeline are unaffected
    pub fn mark_failed(&mut self, index: usize) {
        if let Some(ImageSlot::Realized { source, state }) = self.slots.get_mut(index) {
            *source = ImageSource::Fallback(fallback_data_uri());
            *state = SlotState::Failed;
        }
    }

    pub fn set_extent(&mut self, index: usize, extent: f64) {
        if let Some(slot) = self.extents.get_mut(index) {
            *slot = extent.max(1.0);
        }
    }

    pub fn content_height(&self) -> f64 {
        self.extents.iter().sum()
    }

    fn offset_of(&self, index: usize) -> f64 {
        self.extents[..index].iter().sum()
    }

    /// The slot spanning the viewport midline, with the fractional offset
    /// within its extent. Positions beyond either end clamp to the first or
    /// last slot
    pub fn reading_anchor(&self, viewport: Viewport) -> Option<ReadingAnchor> {
        if self.is_empty() {
            return None;
        }

        let midline = viewport.midline();

        if midline <= 0.0 {
            return Some(ReadingAnchor {
                index: 0,
                fraction: 0.0,
            });
        }

        let mut top = 0.0;

        for index in 0..self.slots.len() {
            let extent = self.extents[index];
            let bottom = top + extent;

            if midline < bottom {
                return Some(ReadingAnchor {
                    index,
                    fraction: (midline - top) / extent,
                });
            }

            top = bottom;
        }

        Some(ReadingAnchor {
            index: self.slots.len() - 1,
            fraction: 1.0,
        })
    }

    /// Absolute scroll offset that puts the anchored position back on the
    /// viewport midline after extents changed
    pub fn scroll_for_anchor(&self, anchor: ReadingAnchor, viewport_height: f64) -> f64 {
        if self.is_empty() {
            return 0.0;
        }

        let index = anchor.index.min(self.slots.len() - 1);
        let target = self.offset_of(index) + anchor.fraction * self.extents[index];

        (target - viewport_height / 2.0).max(0.0)
    }

    /// 1-based number of the slot under the viewport midline, for the page
    /// indicator
    pub fn visible_page(&self, viewport: Viewport) -> Option<usize> {
        self.reading_anchor(viewport).map(|anchor| anchor.index + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded,
    Failed,
}

/// Completion signal of one background image fetch
#[derive(Debug, Clone, Copy)]
pub struct SlotEvent {
    pub index: usize,
    pub outcome: FetchOutcome,
}

/// Reader page driver: owns the slot board, the chapter's navigation record
/// and the fetch plumbing
#[derive(Debug)]
pub struct ChapterViewer {
    client: HondanaClient,
    section: Section,
    chapter_path: String,
    board: Arc<Mutex<SlotBoard>>,
    navigation: Option<Navigation>,
    total_images: usize,
    events_tx: Sender<SlotEvent>,
    events: ReceiverStream<SlotEvent>,
}

impl HondanaClient {
    /// Fetches a chapter's image list once and builds the reader for it
    #[tracing::instrument(skip(self))]
    pub async fn chapter_viewer(
        &self,
        section: Section,
        path: &str,
        favorite_only: Option<bool>,
    ) -> Result<ChapterViewer> {
        let chapter = self.chapter(section, path, favorite_only).await?;

        Ok(ChapterViewer::assemble()
            .client(self.clone())
            .section(section)
            .chapter_path(path.to_owned())
            .chapter(chapter)
            .call())
    }
}

#[bon::bon]
impl ChapterViewer {
    /// Builds a viewer from an already-fetched chapter. The eager batch
    /// starts loading immediately and the first preload window is warmed
    #[builder]
    pub fn assemble(
        client: HondanaClient,
        section: Section,
        chapter_path: String,
        chapter: ChapterImages,
        initial_batch: Option<usize>,
    ) -> Self {
        let total_images = chapter.total_images();

        let mut board = SlotBoard::with_tuning(
            chapter.images,
            initial_batch.unwrap_or(INITIAL_BATCH),
            PRELOAD_AHEAD,
            PROMOTE_MARGIN,
        );

        let warm = board.initial_preload();
        let eager: Vec<usize> = (0..board.len()).filter(|&i| board.slots()[i].is_realized()).collect();

        let (events_tx, events_rx) = mpsc::channel(32);

        let viewer = Self {
            client,
            section,
            chapter_path,
            board: Arc::new(Mutex::new(board)),
            navigation: chapter.navigation,
            total_images,
            events_tx,
            events: ReceiverStream::new(events_rx),
        };

        for index in eager {
            viewer.spawn_fetch(index);
        }

        for index in warm {
            viewer.spawn_warm(index);
        }

        viewer
    }

    pub fn board(&self) -> MutexGuard<'_, SlotBoard> {
        self.board.lock()
    }

    pub fn navigation(&self) -> Option<&Navigation> {
        self.navigation.as_ref()
    }

    pub fn total_images(&self) -> usize {
        self.total_images
    }

    pub fn prev_chapter(&self) -> Option<&ChapterRef> {
        self.navigation.as_ref().and_then(|nav| nav.prev.as_ref())
    }

    pub fn next_chapter(&self) -> Option<&ChapterRef> {
        self.navigation.as_ref().and_then(|nav| nav.next.as_ref())
    }

    /// Header line of the reader: work and chapter names plus the chapter's
    /// position within the work, falling back to the last path segment
    pub fn chapter_info(&self) -> String {
        match self.navigation.as_ref().and_then(|nav| {
            nav.current_chapter
                .as_ref()
                .map(|chapter| (nav, chapter))
        }) {
            Some((nav, chapter)) if nav.total_chapters > 0 => format!(
                "{} - {} ({}/{})",
                nav.manga_name, chapter.name, nav.current_index, nav.total_chapters
            ),
            Some((nav, chapter)) => format!("{} - {}", nav.manga_name, chapter.name),
            None => self
                .chapter_path
                .rsplit('/')
                .next()
                .unwrap_or(&self.chapter_path)
                .to_owned(),
        }
    }

    fn spawn_fetch(&self, index: usize) {
        let Some(url) = self.board.lock().url(index).map(str::to_owned) else {
            return;
        };

        let client = self.client.clone();
        let section = self.section;
        let tx = self.events_tx.clone();

        task::spawn(async move {
            let outcome = match client.download_image(section, &url).await {
                Ok(_) => FetchOutcome::Loaded,
                Err(e) => {
                    tracing::warn!("image {url} failed to load: {e}");

                    FetchOutcome::Failed
                }
            };

            // the viewer may be gone by the time the fetch settles
            let _ = tx.send(SlotEvent { index, outcome }).await;
        });
    }

    fn spawn_warm(&self, index: usize) {
        let Some(url) = self.board.lock().url(index).map(str::to_owned) else {
            return;
        };

        let client = self.client.clone();
        let section = self.section;

        task::spawn(async move {
            // cache warm only: failures are absorbed, a miss just loads
            // normally later
            if let Err(e) = client.warm_image(section, &url).await {
                tracing::debug!("preload of {url} failed: {e}");
            }
        });
    }

    /// Feeds a scroll position to the board and starts fetches for every
    /// slot it promoted
    pub fn poll_viewport(&self, viewport: Viewport) -> Vec<usize> {
        let promoted = self.board.lock().poll_viewport(viewport);

        for &index in &promoted {
            self.spawn_fetch(index);
        }

        promoted
    }

    /// Waits for the next fetch completion. Only resolves while fetches
    /// are outstanding; callers bound their pumping by the slot count
    pub async fn next_event(&mut self) -> Option<SlotEvent> {
        self.events.next().await
    }

    /// Applies a completion to the board; successful loads kick off the
    /// next preload window
    pub fn apply_event(&self, event: SlotEvent) {
        match event.outcome {
            FetchOutcome::Loaded => {
                let warm = self.board.lock().mark_loaded(event.index);

                for index in warm {
                    self.spawn_warm(index);
                }
            }
            FetchOutcome::Failed => {
                self.board.lock().mark_failed(event.index);
            }
        }
    }

    /// Convenience: wait for one completion and apply it
    pub async fn pump_event(&mut self) -> Option<SlotEvent> {
        let event = self.next_event().await?;
        self.apply_event(event);

        Some(event)
    }

    fn status_key(&self) -> Option<&str> {
        self.navigation
            .as_ref()
            .map(|nav| nav.manga_name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Current status of the displayed work, for the reader's star control.
    /// `None` when the chapter has no navigation record to key on
    pub async fn favorite_status(&self) -> Result<Option<StatusRecord>> {
        let Some(name) = self.status_key() else {
            return Ok(None);
        };

        let record = self.client.status(self.section, name).await?;

        Ok(Some(record))
    }

    /// Toggles the displayed work's favorite flag from the reader header
    pub async fn toggle_favorite(&self, resting: Status) -> Result<Option<ToggleOutcome>> {
        let Some(name) = self.status_key().map(str::to_owned) else {
            return Ok(None);
        };

        let outcome = self
            .client
            .toggle_status(self.section, &name, resting)
            .await?;

        Ok(Some(outcome))
    }
}
