use std::sync::Arc;

use serde::de::DeserializeOwned;
use url::Url;
use wp_export_core::{RemoteMedia, RemoteTag};

use crate::error::ExportError;
use crate::fetch::Fetcher;
use crate::{FailureKind, FetchError};

pub const PER_PAGE: u32 = 100;

/// Thin typed layer over a [`Fetcher`] for the `wp/v2` REST routes.
#[derive(Clone)]
pub struct WpClient {
    base: Url,
    fetcher: Arc<dyn Fetcher>,
}

impl WpClient {
    /// `api_url` is the `wp/v2` root, e.g. `https://example.com/wp-json/wp/v2/`.
    /// A missing trailing slash is added so route joins keep the last segment.
    pub fn new(api_url: &str, fetcher: Arc<dyn Fetcher>) -> Result<Self, FetchError> {
        let mut normalized = api_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base = Url::parse(&normalized)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        Ok(Self { base, fetcher })
    }

    pub fn fetcher(&self) -> Arc<dyn Fetcher> {
        self.fetcher.clone()
    }

    /// Site root the API is served from; relative media URLs resolve against it.
    pub fn site_origin(&self) -> Url {
        let mut origin = self.base.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin
    }

    pub fn collection_url(&self, collection: &str, page: Option<u32>) -> String {
        let mut url = self.route(collection);
        {
            let mut query = url.query_pairs_mut();
            if let Some(page) = page {
                query.append_pair("page", &page.to_string());
            }
            query.append_pair("per_page", &PER_PAGE.to_string());
        }
        url.into()
    }

    /// Number of pages the collection spans at [`PER_PAGE`] records per page.
    /// A response without the pagination header counts as a single page.
    pub async fn total_pages(&self, collection: &str) -> Result<u32, ExportError> {
        let output = self
            .fetcher
            .fetch(&self.collection_url(collection, None))
            .await?;
        Ok(output.metadata.total_pages.unwrap_or(1))
    }

    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        collection: &str,
        page: u32,
    ) -> Result<Vec<T>, ExportError> {
        self.get_json(&self.collection_url(collection, Some(page)))
            .await
    }

    pub async fn fetch_media(&self, media_id: u64) -> Result<RemoteMedia, ExportError> {
        self.get_json(&self.item_url("media", media_id)).await
    }

    pub async fn fetch_tag(&self, tag_id: u64) -> Result<RemoteTag, ExportError> {
        self.get_json(&self.item_url("tags", tag_id)).await
    }

    pub fn item_url(&self, collection: &str, id: u64) -> String {
        self.route(&format!("{collection}/{id}")).into()
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ExportError> {
        let output = self.fetcher.fetch(url).await?;
        serde_json::from_slice(&output.bytes).map_err(|source| ExportError::Decode {
            url: url.to_string(),
            source,
        })
    }

    fn route(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let joined = format!("{}{}", self.base.path(), path);
        url.set_path(&joined);
        url
    }
}
