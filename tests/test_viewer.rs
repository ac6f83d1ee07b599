use hondana::requests::chapter::ChapterImages;
use hondana::requests::query_utils::Section;
use hondana::viewer::{
    ImageSlot, ImageSource, ReadingAnchor, SlotBoard, SlotState, Viewport, INITIAL_BATCH,
};
use hondana::HondanaClient;

fn urls(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("chapter/{i:03}.jpg")).collect()
}

fn realized_indices(board: &SlotBoard) -> Vec<usize> {
    (0..board.len())
        .filter(|&i| board.slot(i).unwrap().is_realized())
        .collect()
}

#[test]
fn init_realizes_min_of_batch_and_length() {
    let board = SlotBoard::new(urls(12));
    assert_eq!(board.realized_count(), INITIAL_BATCH);
    assert_eq!(board.placeholder_count(), 12 - INITIAL_BATCH);
    assert_eq!(realized_indices(&board), [0, 1, 2, 3, 4]);

    // shorter chapter than the eager batch
    let board = SlotBoard::new(urls(3));
    assert_eq!(board.realized_count(), 3);
    assert_eq!(board.placeholder_count(), 0);
}

#[test]
fn empty_chapter_yields_empty_board() {
    let chapter: ChapterImages = serde_json::from_value(serde_json::json!({"images": []})).unwrap();
    assert_eq!(chapter.total_images(), 0);

    let mut board = SlotBoard::new(chapter.images);
    assert!(board.is_empty());
    assert_eq!(board.realized_count(), 0);

    // the empty branch must not blow up on viewport traffic
    assert!(board
        .poll_viewport(Viewport {
            offset: 0.0,
            height: 800.0
        })
        .is_empty());
    assert!(board
        .visible_page(Viewport {
            offset: 0.0,
            height: 800.0
        })
        .is_none());
    assert!(board.initial_preload().is_empty());
}

#[test]
fn placeholders_promote_exactly_once() {
    // 10 slots of extent 800, eager batch 2, no margin so the window is
    // easy to reason about
    let mut board = SlotBoard::with_tuning(urls(10), 2, 3, 0.0);

    let viewport = Viewport {
        offset: 1600.0,
        height: 800.0,
    };

    // slots 2 (1600..2400) and 3 (2400..3200, touching the bottom edge)
    let promoted = board.poll_viewport(viewport);
    assert_eq!(promoted, [2, 3]);
    assert!(board.slot(2).unwrap().is_realized());

    // the same viewport again promotes nothing
    assert!(board.poll_viewport(viewport).is_empty());

    // realized indices never regress
    assert_eq!(realized_indices(&board), [0, 1, 2, 3]);
}

#[test]
fn promotion_margin_pretriggers_ahead_of_viewport() {
    let mut board = SlotBoard::with_tuning(urls(10), 1, 3, 1200.0);

    // viewport sits over slot 0; the margin reaches into slots 1 and 2
    let promoted = board.poll_viewport(Viewport {
        offset: 0.0,
        height: 600.0,
    });

    assert_eq!(promoted, [1, 2]);
    assert!(matches!(board.slot(3), Some(ImageSlot::Placeholder)));
}

#[test]
fn initial_preload_warms_past_the_eager_batch() {
    let mut board = SlotBoard::with_tuning(urls(20), 5, 8, 1200.0);

    assert_eq!(board.initial_preload(), [5, 6, 7, 8, 9, 10, 11, 12]);

    // idempotent: the set already tracks these indices
    assert!(board.initial_preload().is_empty());
}

#[test]
fn finished_load_warms_the_next_window() {
    let mut board = SlotBoard::with_tuning(urls(20), 5, 8, 1200.0);
    let warmed = board.initial_preload();
    assert_eq!(warmed.len(), 8);

    // indices 1..=8 are all realized or already preloaded
    assert!(board.mark_loaded(0).is_empty());

    // promote the slots around index 13 and finish it: the next window
    // opens right after it, skips the freshly realized neighbours and
    // touches nothing below index 14
    let promoted = board.poll_viewport(Viewport {
        offset: 13.0 * 800.0,
        height: 800.0,
    });
    assert_eq!(promoted, [11, 12, 13, 14, 15]);

    let warmed = board.mark_loaded(13);
    assert_eq!(warmed, [16, 17, 18, 19]);

    // a second completion for the same index warms nothing new
    assert!(board.mark_loaded(13).is_empty());
}

#[test]
fn preload_skips_realized_and_seen_indices() {
    let mut board = SlotBoard::with_tuning(urls(30), 2, 4, 0.0);

    // realize 2 and 3
    board.poll_viewport(Viewport {
        offset: 1600.0,
        height: 800.0,
    });

    // window after 1 is 2..=5; 2 and 3 are realized, so only 4 and 5 warm
    assert_eq!(board.mark_loaded(1), [4, 5]);

    // window after 3 is 4..=7; 4 and 5 were just warmed
    assert_eq!(board.mark_loaded(3), [6, 7]);
}

#[test]
fn loading_placeholder_is_not_a_completion() {
    let mut board = SlotBoard::with_tuning(urls(10), 2, 3, 0.0);

    // index 7 is still a placeholder: no state change, no warm window
    assert!(board.mark_loaded(7).is_empty());
    assert!(matches!(board.slot(7), Some(ImageSlot::Placeholder)));

    // out-of-range completions are ignored too
    assert!(board.mark_loaded(99).is_empty());
}

#[test]
fn failed_slot_gets_inline_fallback_and_neighbors_survive() {
    let mut board = SlotBoard::with_tuning(urls(6), 3, 3, 0.0);

    board.mark_failed(2);

    match board.slot(2) {
        Some(ImageSlot::Realized { source, state }) => {
            assert!(matches!(source, ImageSource::Fallback(_)));
            assert_eq!(*state, SlotState::Failed);
        }
        other => panic!("expected a realized fallback slot, got {other:?}"),
    }

    // neighbors keep their remote sources
    assert!(matches!(
        board.slot(1),
        Some(ImageSlot::Realized {
            source: ImageSource::Remote(_),
            ..
        })
    ));

    // and the preload pipeline keeps moving: finishing slot 1 warms the
    // placeholders past the failure
    assert_eq!(board.mark_loaded(1), [3, 4]);
}

#[test]
fn reading_anchor_survives_reflow() {
    let mut board = SlotBoard::with_tuning(urls(10), 10, 3, 0.0);

    let viewport = Viewport {
        offset: 2000.0,
        height: 1000.0,
    };

    // midline 2500 sits in slot 3 (2400..3200), an eighth of the way in
    let anchor = board.reading_anchor(viewport).unwrap();
    assert_eq!(anchor.index, 3);
    assert!((anchor.fraction - 0.125).abs() < 1e-9);

    // reflow: every image is remeasured to half the extent
    for index in 0..board.len() {
        board.set_extent(index, 400.0);
    }

    // the anchored position lands back on the midline
    let restored = board.scroll_for_anchor(anchor, 1000.0);
    assert!((restored - 750.0).abs() < 1e-9);
}

#[test]
fn anchor_clamps_at_the_edges() {
    let board = SlotBoard::with_tuning(urls(4), 4, 3, 0.0);

    let top = board
        .reading_anchor(Viewport {
            offset: -100.0,
            height: 100.0,
        })
        .unwrap();
    assert_eq!(top.index, 0);
    assert_eq!(top.fraction, 0.0);

    let bottom = board
        .reading_anchor(Viewport {
            offset: 1_000_000.0,
            height: 100.0,
        })
        .unwrap();
    assert_eq!(bottom.index, 3);
    assert_eq!(bottom.fraction, 1.0);

    // restoring an anchor clamps the scroll offset to the top as well
    let restored = board.scroll_for_anchor(
        ReadingAnchor {
            index: 0,
            fraction: 0.0,
        },
        5000.0,
    );
    assert_eq!(restored, 0.0);
}

#[test]
fn visible_page_tracks_the_midline() {
    let board = SlotBoard::with_tuning(urls(5), 5, 3, 0.0);

    let page = board.visible_page(Viewport {
        offset: 0.0,
        height: 800.0,
    });
    assert_eq!(page, Some(1));

    let page = board.visible_page(Viewport {
        offset: 800.0,
        height: 800.0,
    });
    assert_eq!(page, Some(2));
}

#[tokio::test]
async fn viewer_surfaces_fallbacks_for_unreachable_images() {
    // nothing listens on port 9; every eager fetch fails fast and the
    // affected slots fall back without touching the rest of the pipeline
    let client = HondanaClient::new("http://127.0.0.1:9").unwrap();

    let chapter: ChapterImages = serde_json::from_value(serde_json::json!({
        "images": ["work/001.jpg", "work/002.jpg"],
        "total": 2,
        "navigation": {
            "manga_name": "Solitude Train",
            "current_chapter": {"path": "work", "name": "work"}
        }
    }))
    .unwrap();

    let mut viewer = hondana::viewer::ChapterViewer::assemble()
        .client(client)
        .section(Section::Gallery)
        .chapter_path("work".to_owned())
        .chapter(chapter)
        .call();

    assert_eq!(viewer.total_images(), 2);
    assert_eq!(viewer.chapter_info(), "Solitude Train - work");
    assert!(viewer.prev_chapter().is_none());

    for _ in 0..2 {
        let event = viewer.pump_event().await.expect("fetch task reports back");
        assert_eq!(event.outcome, hondana::viewer::FetchOutcome::Failed);
    }

    let board = viewer.board();
    assert!(matches!(
        board.slot(0),
        Some(ImageSlot::Realized {
            source: ImageSource::Fallback(_),
            state: SlotState::Failed,
        })
    ));
    assert!(matches!(
        board.slot(1),
        Some(ImageSlot::Realized {
            source: ImageSource::Fallback(_),
            state: SlotState::Failed,
        })
    ));
}
