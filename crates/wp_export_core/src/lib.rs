//! wp_export core: pure data model, merge policies and the pipeline stage machine.
mod catalog;
mod entities;
mod frontmatter;
mod post;
mod remote;
mod report;
mod stage;

pub use catalog::{AuthorRecord, Catalog, CatalogRecord, CategoryRecord, MergeOutcome};
pub use entities::decode_entities;
pub use frontmatter::{build_post_document, Frontmatter, PostStatus};
pub use post::{resolve_author, resolve_category, PostAuthor, UNKNOWN_AUTHOR};
pub use remote::{RemoteCategory, RemoteMedia, RemotePost, RemoteTag, RemoteUser, Rendered};
pub use report::ExportReport;
pub use stage::Stage;
