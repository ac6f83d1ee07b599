use serde::{Deserialize, Serialize};

pub trait Query: Serialize + std::fmt::Debug {}

#[derive(Serialize, Deserialize, Debug, Clone, Default, Copy)]
pub struct EmptyQuery {}
impl Query for EmptyQuery {}

/// The two content sections served by the backend. Each section has its own
/// API prefix and its own card capabilities, but both speak the same wire
/// format
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, std::hash::Hash, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Manga,
    Gallery,
}

impl Section {
    pub fn api_prefix(&self) -> &'static str {
        match self {
            Section::Manga => "manga/api",
            Section::Gallery => "gallery/api",
        }
    }

    pub fn image_prefix(&self) -> &'static str {
        match self {
            Section::Manga => "manga/image",
            Section::Gallery => "gallery/image",
        }
    }

    /// What a list card can show for this section. Manga cards expand into
    /// chapter rows, gallery cards show a flat image count and may carry an
    /// external source link
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Section::Manga => Capabilities {
                has_chapters: true,
                has_favorite: false,
                has_external_link: false,
            },
            Section::Gallery => Capabilities {
                has_chapters: false,
                has_favorite: true,
                has_external_link: true,
            },
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Section::Manga => write!(f, "manga"),
            Section::Gallery => write!(f, "gallery"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct Capabilities {
    pub has_chapters: bool,
    pub has_favorite: bool,
    pub has_external_link: bool,
}

/// Percent-encodes an entity path for use as a single URL component,
/// matching what the backend expects for `detail`, `chapter`, `status` and
/// `image` routes. Slashes inside the path are encoded too
pub fn encode_path(path: &str) -> String {
    urlencoding::encode(path).into_owned()
}
