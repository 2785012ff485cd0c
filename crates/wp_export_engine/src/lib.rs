//! wp_export engine: WordPress REST fetching, catalog merging and post export.
mod api;
mod catalog;
mod config;
mod convert;
mod error;
mod fetch;
mod filename;
mod images;
mod persist;
mod pipeline;
mod posts;
mod rewrite;
mod transform;
mod types;

pub use api::{WpClient, PER_PAGE};
pub use catalog::merge_catalog;
pub use config::{ExportConfig, AUTHORS_DIR, AUTHORS_FILE, CATEGORIES_FILE, POSTS_DIR};
pub use convert::{CodeBlockStyle, Converter, MarkdownConverter, MarkdownOptions};
pub use error::ExportError;
pub use fetch::{
    FetchSettings, Fetcher, NullProgressSink, ProgressSink, ReqwestFetcher, TOTAL_PAGES_HEADER,
};
pub use filename::{image_filename, safe_component};
pub use images::{ImageMaterializer, ImageOutcome};
pub use persist::{
    ensure_output_dir, load_json_array, write_json_pretty, AtomicFileWriter, PersistError,
};
pub use pipeline::Exporter;
pub use posts::{PostExportOptions, PostExporter, POSTS_COLLECTION, POST_FILENAME};
pub use rewrite::{
    collect_image_sources, rewrite_html, ElementEdit, LocalizeImageSources, PollPlaceholder,
    RewriteRule, StripPresentationAttributes, POLL_PLACEHOLDER,
};
pub use transform::{sanitize_html, HtmlTransformer};
pub use types::{ExportEvent, FailureKind, FetchError, FetchMetadata, FetchOutput};
