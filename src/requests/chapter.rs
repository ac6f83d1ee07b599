use serde::{Deserialize, Serialize};

use super::Query;

/// Response of the `chapter` endpoint: the complete ordered image list for
/// one chapter or work, fetched once per reader page
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ChapterImages {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub navigation: Option<Navigation>,
}

impl ChapterImages {
    /// Older backends omit `total`; the image list itself is authoritative
    pub fn total_images(&self) -> usize {
        if self.total > 0 {
            self.total
        } else {
            self.images.len()
        }
    }
}

/// Position of the current chapter within its work, plus the neighbouring
/// chapters for prev/next navigation
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Navigation {
    #[serde(default)]
    pub manga_name: String,
    #[serde(default)]
    pub current_chapter: Option<ChapterRef>,
    #[serde(default)]
    pub current_index: usize,
    #[serde(default)]
    pub total_chapters: usize,
    #[serde(default)]
    pub prev: Option<ChapterRef>,
    #[serde(default)]
    pub next: Option<ChapterRef>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChapterRef {
    pub path: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ChapterQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_only: Option<bool>,
}

impl Query for ChapterQuery {}
