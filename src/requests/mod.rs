//! Structs and utilities for making requests to a Hondana server

pub mod chapter;
pub mod collection;
pub mod config;
pub mod query_utils;
pub mod status;

use crate::HondanaClient;
use chapter::{ChapterImages, ChapterQuery};
use collection::{ItemSummary, ListQuery, PageResult};
use config::UiConfig;
use query_utils::{encode_path, EmptyQuery, Query, Section};
use status::{Status, StatusRecord, ToggleOutcome};

use bytes::Bytes;
use futures::Stream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use reqwest::{Response, StatusCode};

/// Error body the server attaches to non-success responses
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerResponseError {
    #[serde(default)]
    pub error: String,
}

/// Custom error type that contains all errors that can be emitted by this
/// crate's functions
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
    #[error(transparent)]
    RequestMiddlewareError(#[from] reqwest_middleware::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
    #[error("400 server response: {0}")]
    BadRequestError(String),
    #[error("404 server response: {0}")]
    NotFoundError(String),
    #[error("{status} server response: {message}")]
    HttpError { status: StatusCode, message: String },
    #[error(transparent)]
    QsError(#[from] serde_qs::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Type alias for the [`Result`](std::result::Result) that is used in the
/// crate's functions
pub type Result<T> = std::result::Result<T, Error>;

impl HondanaClient {
    /// Lowest level function that executes an arbitrary [Query] against the
    /// given URL and returns its raw response
    #[tracing::instrument(skip(self))]
    pub async fn query(&self, url: &str, query: &impl Query) -> Result<Response> {
        let query_data = match serde_qs::to_string(query) {
            Ok(res) => res,
            Err(e) => return Err(Error::QsError(e)),
        };

        let url = if query_data.is_empty() {
            url.to_owned()
        } else {
            format!("{url}?{query_data}")
        };

        match self.client.get(url).send().await {
            Ok(res) => Ok(res),
            Err(e) => Err(Error::RequestMiddlewareError(e)),
        }
    }

    fn api_url(&self, section: Section, route: &str) -> String {
        format!("{}/{}/{route}", self.base_url, section.api_prefix())
    }

    /// Shorthand for turning a non-success response into the matching error
    /// variant
    async fn deserialize_response_error<T: std::fmt::Debug>(resp: Response) -> Result<T> {
        let status = resp.status();

        let body: ServerResponseError = resp.json().await.unwrap_or_default();

        let res = match status.as_u16() {
            400 => Err(Error::BadRequestError(body.error)),
            404 => Err(Error::NotFoundError(body.error)),
            _ => Err(Error::HttpError {
                status,
                message: body.error,
            }),
        };

        tracing::warn!("got {res:#?} from server");

        res
    }

    async fn expect_success(resp: Response) -> Result<Response> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Self::deserialize_response_error(resp).await
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &impl Query) -> Result<T> {
        let resp = self.query(url, query).await?;
        let resp = Self::expect_success(resp).await?;

        Ok(resp.json().await?)
    }

    /// Fetches the process-wide UI configuration. This never fails: a
    /// missing endpoint, a transport error or a malformed body all degrade
    /// to the default configuration
    #[tracing::instrument(skip(self))]
    pub async fn fetch_config(&self) -> UiConfig {
        let url = format!("{}/api/config", self.base_url);

        match self.get_json(&url, &EmptyQuery {}).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("failed to load config, falling back to defaults: {e}");

                UiConfig::default()
            }
        }
    }

    /// Fetches one page of a section's listing
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, section: Section, query: &ListQuery) -> Result<PageResult> {
        self.get_json(&self.api_url(section, "list"), query).await
    }

    /// Fetches one item including its nested chapters
    #[tracing::instrument(skip(self))]
    pub async fn detail(&self, section: Section, path: &str) -> Result<ItemSummary> {
        let url = self.api_url(section, &format!("detail/{}", encode_path(path)));

        self.get_json(&url, &EmptyQuery {}).await
    }

    /// Fetches the complete ordered image list for one chapter, along with
    /// its navigation record
    #[tracing::instrument(skip(self))]
    pub async fn chapter(
        &self,
        section: Section,
        path: &str,
        favorite_only: Option<bool>,
    ) -> Result<ChapterImages> {
        let url = self.api_url(section, &format!("chapter/{}", encode_path(path)));

        self.get_json(&url, &ChapterQuery { favorite_only }).await
    }

    /// Reads the current status record of an entity
    #[tracing::instrument(skip(self))]
    pub async fn status(&self, section: Section, path: &str) -> Result<StatusRecord> {
        let url = self.api_url(section, &format!("status/{}", encode_path(path)));

        self.get_json(&url, &EmptyQuery {}).await
    }

    /// Writes a new status for an entity and returns the confirmed record
    #[tracing::instrument(skip(self))]
    pub async fn set_status(
        &self,
        section: Section,
        path: &str,
        status: Status,
    ) -> Result<StatusRecord> {
        let url = self.api_url(section, &format!("status/{}", encode_path(path)));

        let resp = match self.client.post(url).json(&StatusRecord { status }).send().await {
            Ok(res) => res,
            Err(e) => return Err(Error::RequestMiddlewareError(e)),
        };
        let resp = Self::expect_success(resp).await?;

        Ok(resp.json().await?)
    }

    /// Reads the entity's current status, flips it relative to `favorite`
    /// and writes the result. Favorites drop to `resting`, everything else
    /// becomes a favorite. Concurrent toggles are not coordinated, last
    /// write wins at the backend
    #[tracing::instrument(skip(self))]
    pub async fn toggle_status(
        &self,
        section: Section,
        path: &str,
        resting: Status,
    ) -> Result<ToggleOutcome> {
        let previous = self.status(section, path).await?.status;
        let target = previous.toggled(resting);

        let confirmed = self.set_status(section, path, target).await?;

        Ok(ToggleOutcome {
            previous,
            current: confirmed.status,
        })
    }

    /// Downloads one image resource in full
    #[tracing::instrument(skip(self))]
    pub async fn download_image(&self, section: Section, image_path: &str) -> Result<Bytes> {
        let url = format!(
            "{}/{}/{}",
            self.base_url,
            section.image_prefix(),
            encode_path(image_path)
        );

        let resp = self.query(&url, &EmptyQuery {}).await?;
        let resp = Self::expect_success(resp).await?;

        match resp.bytes().await {
            Ok(res) => Ok(res),
            Err(e) => Err(Error::ReqwestError(e)),
        }
    }

    /// Requests an image and discards the body, warming the transport-level
    /// cache ahead of the reader. Callers treat failures as best-effort
    #[tracing::instrument(skip(self))]
    pub async fn warm_image(&self, section: Section, image_path: &str) -> Result<()> {
        self.download_image(section, image_path).await.map(|_| ())
    }

    /// Walks a section's listing page by page and yields every item in
    /// arrival order
    pub fn stream_items(
        &self,
        section: Section,
        query: ListQuery,
    ) -> impl Stream<Item = Result<ItemSummary>> {
        let client = self.clone();

        async_stream::try_stream! {
            let mut query = query;
            let mut page = query.page.unwrap_or(1);

            loop {
                query.page = Some(page);

                let result = client.list(section, &query).await?;
                let total_pages = result.normalized_total_pages();

                for item in result.items {
                    yield item;
                }

                if page >= total_pages {
                    break;
                }

                page += 1;
            }
        }
    }

    /// Resolves the chapter a card click should open: gallery items open
    /// themselves, manga items open their first chapter, consulting the
    /// detail endpoint when the summary was fetched without chapters
    #[tracing::instrument(skip(self, item))]
    pub async fn first_chapter(
        &self,
        section: Section,
        item: &ItemSummary,
    ) -> Result<Option<String>> {
        if !section.capabilities().has_chapters {
            return Ok(Some(item.path.clone()));
        }

        if let Some(chapter) = item.chapters.first() {
            return Ok(Some(chapter.path.clone()));
        }

        let detail = self.detail(section, &item.path).await?;

        Ok(detail.chapters.first().map(|c| c.path.clone()))
    }
}
