use serde::{Deserialize, Serialize};

/// Tri-state classification persisted server-side per entity. `Unreviewed`
/// is virtual: entities absent from both server lists report it
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, std::hash::Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Favorite,
    Reviewed,
    Unreviewed,
}

impl Status {
    pub fn is_favorite(&self) -> bool {
        matches!(self, Status::Favorite)
    }

    /// Star glyph shown on the favorite control
    pub fn glyph(&self) -> char {
        if self.is_favorite() {
            '★'
        } else {
            '☆'
        }
    }

    /// The status a toggle writes: favorites drop to the configured resting
    /// state, everything else becomes a favorite
    pub fn toggled(self, resting: Status) -> Status {
        if self.is_favorite() {
            resting
        } else {
            Status::Favorite
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Unreviewed
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Favorite => write!(f, "favorite"),
            Status::Reviewed => write!(f, "reviewed"),
            Status::Unreviewed => write!(f, "unreviewed"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default)]
pub struct StatusRecord {
    #[serde(default)]
    pub status: Status,
}

/// Result of one read-compute-write toggle round trip
#[derive(Debug, Clone, Copy)]
pub struct ToggleOutcome {
    pub previous: Status,
    pub current: Status,
}

/// Display state of one favorite control. The control flips optimistically
/// when pressed and is reverted if the write fails; concurrent controls for
/// the same entity are not coordinated, last write wins at the backend
#[derive(Debug, Clone, Copy)]
pub struct FavoriteControl {
    displayed: Status,
    busy: bool,
}

impl FavoriteControl {
    pub fn new(status: Status) -> Self {
        Self {
            displayed: status,
            busy: false,
        }
    }

    pub fn displayed(&self) -> Status {
        self.displayed
    }

    pub fn glyph(&self) -> char {
        self.displayed.glyph()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Optimistically flips the control and returns the status the write
    /// should carry. Returns `None` while a previous toggle is still
    /// settling
    pub fn press(&mut self, resting: Status) -> Option<Status> {
        if self.busy {
            return None;
        }

        self.busy = true;
        let target = self.displayed.toggled(resting);
        self.displayed = target;

        Some(target)
    }

    /// Settles the control on the status the backend confirmed
    pub fn confirm(&mut self, actual: Status) {
        self.displayed = actual;
        self.busy = false;
    }

    /// Returns the control to its pre-toggle visual state after a failed
    /// write
    pub fn revert(&mut self, previous: Status) {
        self.displayed = previous;
        self.busy = false;
    }
}
