use serde::{Deserialize, Serialize};

use super::status::Status;
use super::Query;

/// One entry of a paginated listing. The backend omits most fields for
/// sections or query modes that do not use them, so everything except the
/// identity is defaulted
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ItemSummary {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub chapters: Vec<ChapterSummary>,
    #[serde(default)]
    pub chapter_count: usize,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub url_link: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChapterSummary {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub image_count: usize,
}

/// Response envelope of one `list` fetch
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PageResult {
    #[serde(rename = "mangas", alias = "items", default)]
    pub items: Vec<ItemSummary>,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub per_page: usize,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub total_pages: usize,
}

impl PageResult {
    /// The backend reports `page: 0, total_pages: 0` for an empty listing.
    /// Counters are clamped to 1 so the `current_page >= total_pages` scroll
    /// guard holds without a special case
    pub fn normalized_page(&self) -> usize {
        self.page.max(1)
    }

    pub fn normalized_total_pages(&self) -> usize {
        self.total_pages.max(1)
    }
}

/// Query parameters of the `list` endpoint. `None` fields stay off the wire
#[derive(bon::Builder, Serialize, Deserialize, Debug, Clone, Default)]
#[builder(on(String, into))]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_chapters: Option<bool>,
}

impl Query for ListQuery {}
