use std::path::Path;
use std::sync::Arc;

use export_logging::{export_debug, export_warn};
use url::Url;

use crate::fetch::Fetcher;
use crate::filename::image_filename;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// No source URL or no destination folder was given.
    Absent,
    AlreadyPresent(String),
    Downloaded(String),
    Failed { url: String, reason: String },
}

impl ImageOutcome {
    pub fn filename(&self) -> Option<&str> {
        match self {
            ImageOutcome::AlreadyPresent(name) | ImageOutcome::Downloaded(name) => Some(name),
            ImageOutcome::Absent | ImageOutcome::Failed { .. } => None,
        }
    }

    pub fn failed_url(&self) -> Option<&str> {
        match self {
            ImageOutcome::Failed { url, .. } => Some(url),
            _ => None,
        }
    }
}

/// Downloads post images into their post folder, at most once per file name.
#[derive(Clone)]
pub struct ImageMaterializer {
    fetcher: Arc<dyn Fetcher>,
    site_origin: Option<Url>,
}

impl ImageMaterializer {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            site_origin: None,
        }
    }

    /// Relative and protocol-relative sources resolve against `origin`.
    pub fn with_site_origin(mut self, origin: Url) -> Self {
        self.site_origin = Some(origin);
        self
    }

    /// An existing file of the same name counts as already downloaded; its
    /// content is not checked. Failures are returned, never raised.
    pub async fn materialize(&self, source_url: Option<&str>, folder: Option<&Path>) -> ImageOutcome {
        let (Some(source), Some(folder)) = (source_url, folder) else {
            return ImageOutcome::Absent;
        };
        let source = source.trim();
        if source.is_empty() {
            return ImageOutcome::Absent;
        }

        let Some(url) = self.resolve(source) else {
            export_warn!("Cannot resolve image URL {:?}", source);
            return ImageOutcome::Failed {
                url: source.to_string(),
                reason: "unresolvable url".to_string(),
            };
        };

        let filename = image_filename(&url);
        let destination = folder.join(&filename);
        if destination.exists() {
            export_debug!("Image {:?} already exists, skipping", destination);
            return ImageOutcome::AlreadyPresent(filename);
        }

        match self.fetcher.download(url.as_str(), &destination).await {
            Ok(metadata) => {
                export_debug!("Saved image {:?} ({} bytes)", destination, metadata.byte_len);
                ImageOutcome::Downloaded(filename)
            }
            Err(err) => {
                export_warn!("Failed to download image {}: {}", url, err);
                ImageOutcome::Failed {
                    url: source.to_string(),
                    reason: err.to_string(),
                }
            }
        }
    }

    fn resolve(&self, source: &str) -> Option<Url> {
        if let Ok(url) = Url::parse(source) {
            return matches!(url.scheme(), "http" | "https").then_some(url);
        }
        self.site_origin
            .as_ref()
            .and_then(|origin| origin.join(source).ok())
    }
}
