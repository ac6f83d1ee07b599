use hondana::catalog::{card_model, CatalogBrowser, LoadMode};
use hondana::requests::query_utils::Section;
use hondana::viewer::Viewport;
use hondana::HondanaClient;

use kdam::{tqdm, BarExt};

use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_file = std::fs::File::options()
        .create(true)
        .append(true)
        .open("hondana.log")?;
    let (writer, _guard) = tracing_appender::non_blocking(log_file);

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(writer).compact())
        .with(filter)
        .init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://127.0.0.1:5000".to_owned());

    let client = HondanaClient::new(base_url)?;

    let mut browser = CatalogBrowser::open(client.clone(), Section::Manga).await;
    browser.load(1, LoadMode::Replace).await?;

    let caps = Section::Manga.capabilities();
    for item in browser.state().items() {
        let card = card_model(item, caps);
        println!("{} ({:?})", card.title, card.detail);
    }

    let info = browser.state().pagination_info();
    println!("showing {} of {}", info.shown, info.total);

    let Some(first) = browser.state().items().first().cloned() else {
        println!("library is empty");

        return Ok(());
    };

    let Some(chapter_path) = client.first_chapter(Section::Manga, &first).await? else {
        println!("{} has no readable chapters", first.name);

        return Ok(());
    };

    let mut viewer = client
        .chapter_viewer(Section::Manga, &chapter_path, None)
        .await?;

    println!("{}", viewer.chapter_info());

    let total = viewer.board().len();

    // promote everything at once and watch the fetches drain
    let full_window = Viewport {
        offset: 0.0,
        height: viewer.board().content_height(),
    };
    viewer.poll_viewport(full_window);

    let mut pb = tqdm!(total = total);
    for _ in 0..total {
        let Some(_event) = viewer.pump_event().await else {
            break;
        };

        pb.update(1)?;
    }

    let loaded = viewer
        .board()
        .slots()
        .iter()
        .filter(|slot| slot.is_loaded())
        .count();

    println!("\n{loaded}/{total} pages cached");

    Ok(())
}
