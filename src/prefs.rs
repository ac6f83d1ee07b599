//! Client-local preference storage. A single boolean survives page loads:
//! whether listings are restricted to favorites. Anything missing or
//! unreadable falls back to `false`.

use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

pub const PREFS_FILE: &str = "hondana_prefs.json";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default)]
pub struct Prefs {
    #[serde(default)]
    pub favorite_only: bool,
}

fn prefs_path(dir: &Path) -> PathBuf {
    dir.join(PREFS_FILE)
}

/// Reads the persisted preference. A missing file, unreadable bytes or a
/// corrupt body all yield the defaults
pub async fn load(dir: &Path) -> Prefs {
    let raw = match tokio::fs::read(prefs_path(dir)).await {
        Ok(raw) => raw,
        Err(_) => return Prefs::default(),
    };

    match serde_json::from_slice(&raw) {
        Ok(prefs) => prefs,
        Err(e) => {
            tracing::warn!("corrupt preference file, using defaults: {e}");

            Prefs::default()
        }
    }
}

/// Persists the preference. Best-effort: an unwritable directory only logs
pub async fn store(dir: &Path, prefs: Prefs) {
    let body = match serde_json::to_vec_pretty(&prefs) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("failed to encode preferences: {e}");

            return;
        }
    };

    if let Err(e) = tokio::fs::write(prefs_path(dir), body).await {
        tracing::warn!("failed to persist preferences: {e}");
    }
}

pub async fn load_favorite_only(dir: &Path) -> bool {
    load(dir).await.favorite_only
}

pub async fn store_favorite_only(dir: &Path, favorite_only: bool) {
    let mut prefs = load(dir).await;
    prefs.favorite_only = favorite_only;

    store(dir, prefs).await;
}
