use std::path::PathBuf;

use crate::persist::PersistError;
use crate::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("request failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("unexpected response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog {path:?} is not valid JSON: {source}")]
    CatalogParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0:?} not found; the catalog stages must run before posts are exported")]
    MissingPrerequisite(PathBuf),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("export cancelled")]
    Cancelled,
}
