use serde::{Deserialize, Serialize};

use super::Section;

use std::time::Duration;

pub const DEFAULT_PER_PAGE: usize = 6;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;

/// Frontend configuration served by `/api/config`. Every level defaults so
/// a missing endpoint or an empty object parses into usable settings
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UiConfig {
    #[serde(default)]
    pub ui: UiSection,
    #[serde(default)]
    pub reader: ReaderSection,
    #[serde(default)]
    pub performance: PerformanceSection,
    #[serde(default)]
    pub manga: ListSection,
    #[serde(default)]
    pub gallery: ListSection,
}

impl UiConfig {
    pub fn list_section(&self, section: Section) -> &ListSection {
        match section {
            Section::Manga => &self.manga,
            Section::Gallery => &self.gallery,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UiSection {
    #[serde(default)]
    pub search_placeholder: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ReaderSection {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub auto_hide_toolbar: Option<bool>,
    #[serde(default)]
    pub default_zoom: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PerformanceSection {
    #[serde(default)]
    pub image_cache: Option<bool>,
    #[serde(default)]
    pub preload_pages: Option<usize>,
}

/// Per-section listing behaviour
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ListSection {
    #[serde(default)]
    pub per_page: Option<usize>,
    #[serde(default)]
    pub search_debounce_ms: Option<u64>,
    #[serde(default)]
    pub skip_chapters_on_list: Option<bool>,
    #[serde(default)]
    pub default_filter: Option<String>,
}

impl ListSection {
    pub fn per_page(&self) -> usize {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(
            self.search_debounce_ms
                .unwrap_or(DEFAULT_SEARCH_DEBOUNCE_MS),
        )
    }

    pub fn skip_chapters(&self, section: Section) -> bool {
        // manga lists ship chapter rows by default, gallery lists skip them
        self.skip_chapters_on_list
            .unwrap_or(matches!(section, Section::Gallery))
    }
}
