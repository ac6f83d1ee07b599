// TODO: add request timeouts once the server advertises expected image sizes
// TODO: reuse one chapter viewer across prev/next navigation instead of
// rebuilding the slot board per chapter

pub mod catalog;
pub mod prefs;
pub mod requests;
pub mod timing;
pub mod viewer;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;

/// Handle to one Hondana server. Cheap to clone; spawned fetch tasks each
/// hold their own copy
#[derive(Debug, Clone)]
pub struct HondanaClient {
    pub(crate) client: ClientWithMiddleware,
    pub(crate) base_url: String,
}

impl HondanaClient {
    pub const USER_AGENT: &str = "Hondana/0.1";

    pub fn new(base_url: impl Into<String>) -> requests::Result<Self> {
        let base_url: String = base_url.into();

        let client = reqwest::Client::builder()
            .user_agent(Self::USER_AGENT)
            .build()?;
        let client = ClientBuilder::new(client)
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{card_model, CardDetail, CoverSource};
    use requests::chapter::ChapterImages;
    use requests::collection::{ItemSummary, ListQuery, PageResult};
    use requests::config::UiConfig;
    use requests::query_utils::{encode_path, Section};
    use requests::status::{FavoriteControl, Status, StatusRecord};
    use timing::{Debouncer, Throttle};
    use viewer::fallback_data_uri;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time;

    #[test]
    fn parse_page_result() {
        let raw = serde_json::json!({
            "mangas": [
                {
                    "name": "Yokohama Kaidashi Kikou",
                    "path": "yokohama",
                    "cover_image": "yokohama/cover.jpg",
                    "chapters": [
                        {"path": "yokohama/ch1", "name": "ch1", "image_count": 30}
                    ],
                    "chapter_count": 1
                },
                {"name": "Blame!", "path": "blame"}
            ],
            "page": 2,
            "per_page": 6,
            "total": 14,
            "total_pages": 3
        });

        let result: PageResult = serde_json::from_value(raw).unwrap();

        assert_eq!(result.items.len(), 2);
        assert_eq!(result.items[0].chapters[0].image_count, 30);
        assert_eq!(result.items[1].chapter_count, 0);
        assert!(result.items[1].cover_image.is_none());
        assert_eq!(result.page, 2);
        assert_eq!(result.total_pages, 3);
    }

    #[test]
    fn empty_page_result_defaults() {
        let result: PageResult = serde_json::from_value(serde_json::json!({})).unwrap();

        assert!(result.items.is_empty());
        assert_eq!(result.total, 0);
        // the front-end clamp that keeps the scroll guard meaningful
        assert_eq!(result.normalized_page(), 1);
        assert_eq!(result.normalized_total_pages(), 1);
    }

    #[test]
    fn list_query_serialization() {
        let query = ListQuery::builder()
            .page(2)
            .per_page(6)
            .search("tea")
            .skip_chapters(false)
            .build();

        let qs = serde_qs::to_string(&query).unwrap();

        assert_eq!(qs, "page=2&per_page=6&search=tea&skip_chapters=false");
    }

    #[test]
    fn list_query_status_filter() {
        let query = ListQuery::builder().page(1).status(Status::Favorite).build();

        let qs = serde_qs::to_string(&query).unwrap();

        assert_eq!(qs, "page=1&status=favorite");
    }

    #[test]
    fn parse_chapter_images() {
        let raw = serde_json::json!({
            "images": ["yokohama/ch1/001.jpg", "yokohama/ch1/002.jpg"],
            "total": 2,
            "navigation": {
                "manga_name": "Yokohama Kaidashi Kikou",
                "current_chapter": {"path": "yokohama/ch1", "name": "ch1"},
                "current_index": 1,
                "total_chapters": 14,
                "next": {"path": "yokohama/ch2", "name": "ch2"}
            }
        });

        let chapter: ChapterImages = serde_json::from_value(raw).unwrap();

        assert_eq!(chapter.total_images(), 2);

        let nav = chapter.navigation.unwrap();
        assert_eq!(nav.manga_name, "Yokohama Kaidashi Kikou");
        assert!(nav.prev.is_none());
        assert_eq!(nav.next.unwrap().path, "yokohama/ch2");
    }

    #[test]
    fn chapter_total_falls_back_to_image_count() {
        let raw = serde_json::json!({"images": ["a.jpg", "b.jpg", "c.jpg"]});

        let chapter: ChapterImages = serde_json::from_value(raw).unwrap();

        assert_eq!(chapter.total_images(), 3);
        assert!(chapter.navigation.is_none());
    }

    #[test]
    fn empty_chapter_parses() {
        let chapter: ChapterImages = serde_json::from_value(serde_json::json!({})).unwrap();

        assert_eq!(chapter.total_images(), 0);
        assert!(chapter.images.is_empty());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: UiConfig = serde_json::from_value(serde_json::json!({})).unwrap();

        let list = config.list_section(Section::Gallery);
        assert_eq!(list.per_page(), 6);
        assert_eq!(list.search_debounce(), Duration::from_millis(300));
        assert!(list.skip_chapters(Section::Gallery));
        assert!(!config.list_section(Section::Manga).skip_chapters(Section::Manga));
    }

    #[test]
    fn config_overrides_apply() {
        let raw = serde_json::json!({
            "gallery": {"per_page": 12, "search_debounce_ms": 150},
            "ui": {"search_placeholder": "search works"}
        });

        let config: UiConfig = serde_json::from_value(raw).unwrap();

        let list = config.list_section(Section::Gallery);
        assert_eq!(list.per_page(), 12);
        assert_eq!(list.search_debounce(), Duration::from_millis(150));
        assert_eq!(config.ui.search_placeholder.as_deref(), Some("search works"));
    }

    #[test]
    fn status_record_defaults_to_unreviewed() {
        let record: StatusRecord = serde_json::from_value(serde_json::json!({})).unwrap();

        assert_eq!(record.status, Status::Unreviewed);
    }

    #[test]
    fn status_toggle_semantics() {
        assert_eq!(
            Status::Favorite.toggled(Status::Unreviewed),
            Status::Unreviewed
        );
        assert_eq!(Status::Favorite.toggled(Status::Reviewed), Status::Reviewed);
        assert_eq!(
            Status::Unreviewed.toggled(Status::Unreviewed),
            Status::Favorite
        );
        assert_eq!(Status::Reviewed.toggled(Status::Unreviewed), Status::Favorite);
    }

    #[test]
    fn favorite_control_optimistic_flow() {
        let mut control = FavoriteControl::new(Status::Favorite);
        assert_eq!(control.glyph(), '★');

        // pressing flips optimistically and reports the status to write
        let target = control.press(Status::Unreviewed).unwrap();
        assert_eq!(target, Status::Unreviewed);
        assert_eq!(control.glyph(), '☆');

        // a second press while the write is out is swallowed
        assert!(control.press(Status::Unreviewed).is_none());

        // failed write: back to the pre-toggle visual
        control.revert(Status::Favorite);
        assert_eq!(control.glyph(), '★');
        assert!(!control.is_busy());

        // successful write settles on the confirmed status
        let target = control.press(Status::Unreviewed).unwrap();
        control.confirm(target);
        assert_eq!(control.glyph(), '☆');
    }

    #[test]
    fn card_model_follows_capabilities() {
        let item = ItemSummary {
            path: "yokohama".to_owned(),
            name: "Yokohama Kaidashi Kikou".to_owned(),
            cover_image: None,
            chapters: Vec::new(),
            chapter_count: 14,
            status: Some(Status::Favorite),
            url_link: Some("https://example.com/src".to_owned()),
        };

        let manga_card = card_model(&item, Section::Manga.capabilities());
        assert_eq!(manga_card.cover, CoverSource::Glyph('📚'));
        assert_eq!(manga_card.detail, CardDetail::ChapterCount(14));
        assert!(manga_card.external_link.is_none());
        assert!(manga_card.favorite_glyph.is_none());

        let gallery_card = card_model(&item, Section::Gallery.capabilities());
        assert_eq!(gallery_card.cover, CoverSource::Glyph('🎨'));
        assert_eq!(gallery_card.detail, CardDetail::ImageCount(14));
        assert_eq!(
            gallery_card.external_link.as_deref(),
            Some("https://example.com/src")
        );
        assert_eq!(gallery_card.favorite_glyph, Some('★'));
    }

    #[test]
    fn encode_path_escapes_separators() {
        assert_eq!(encode_path("series/ch 1"), "series%2Fch%201");
    }

    #[test]
    fn fallback_graphic_is_inline() {
        assert!(fallback_data_uri().starts_with("data:image/svg+xml,"));
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_search_fires_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        // keystrokes 100 units apart keep re-arming the quiet period
        for _ in 0..4 {
            let hits = Arc::clone(&hits);
            debouncer.call(async move {
                hits.fetch_add(1, Ordering::SeqCst);
            });

            time::advance(Duration::from_millis(100)).await;
        }

        assert_eq!(hits.load(Ordering::SeqCst), 0);

        time::advance(Duration::from_millis(300)).await;
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_passes_leading_edge_only() {
        let mut throttle = Throttle::new(Duration::from_millis(200));

        assert!(throttle.allow());
        assert!(!throttle.allow());

        time::advance(Duration::from_millis(100)).await;
        assert!(!throttle.allow());

        time::advance(Duration::from_millis(100)).await;
        assert!(throttle.allow());
        assert!(!throttle.allow());
    }

    #[tokio::test]
    async fn prefs_default_and_roundtrip() {
        let dir = std::env::temp_dir().join(format!("hondana-prefs-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        // nothing persisted yet
        assert!(!prefs::load_favorite_only(&dir).await);

        prefs::store_favorite_only(&dir, true).await;
        assert!(prefs::load_favorite_only(&dir).await);

        // corrupt contents degrade to the default
        tokio::fs::write(dir.join(prefs::PREFS_FILE), b"{not json")
            .await
            .unwrap();
        assert!(!prefs::load_favorite_only(&dir).await);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
