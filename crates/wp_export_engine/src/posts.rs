use std::collections::HashMap;
use std::path::{Path, PathBuf};

use export_logging::{export_info, export_warn};
use tokio_util::sync::CancellationToken;
use wp_export_core::{
    build_post_document, decode_entities, resolve_author, resolve_category, AuthorRecord,
    Catalog, CategoryRecord, ExportReport, Frontmatter, PostStatus, RemotePost,
};

use crate::api::WpClient;
use crate::error::ExportError;
use crate::fetch::ProgressSink;
use crate::filename::safe_component;
use crate::images::ImageMaterializer;
use crate::persist::{ensure_output_dir, load_json_array, AtomicFileWriter};
use crate::transform::HtmlTransformer;
use crate::ExportEvent;

pub const POSTS_COLLECTION: &str = "posts";
pub const POST_FILENAME: &str = "index.md";

#[derive(Debug, Clone, Default)]
pub struct PostExportOptions {
    /// Maximum number of posts to export in one run; 0 means no limit.
    pub posts_limit: usize,
    pub show_tags: bool,
}

/// Writes one `posts/<slug>/index.md` per remote post.
pub struct PostExporter {
    client: WpClient,
    images: ImageMaterializer,
    transformer: HtmlTransformer,
    options: PostExportOptions,
    authors: Catalog<AuthorRecord>,
    categories: Vec<CategoryRecord>,
    posts_dir: PathBuf,
    tag_cache: HashMap<u64, Option<String>>,
}

impl PostExporter {
    /// Loads the author and category catalogs from disk. Both files must
    /// exist; they are produced by the catalog stages.
    pub fn from_catalog_files(
        client: WpClient,
        images: ImageMaterializer,
        transformer: HtmlTransformer,
        options: PostExportOptions,
        authors_file: &Path,
        categories_file: &Path,
        posts_dir: PathBuf,
    ) -> Result<Self, ExportError> {
        for prerequisite in [authors_file, categories_file] {
            if !prerequisite.exists() {
                return Err(ExportError::MissingPrerequisite(prerequisite.to_path_buf()));
            }
        }
        let authors: Vec<AuthorRecord> = load_json_array(authors_file)?;
        let categories: Vec<CategoryRecord> = load_json_array(categories_file)?;

        Ok(Self {
            client,
            images,
            transformer,
            options,
            authors: Catalog::from_records(authors),
            categories,
            posts_dir,
            tag_cache: HashMap::new(),
        })
    }

    /// Exports every post page by page. Returns the number of posts written.
    pub async fn export_all(
        &mut self,
        report: &mut ExportReport,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<usize, ExportError> {
        ensure_output_dir(&self.posts_dir)?;
        let total_pages = self.client.total_pages(POSTS_COLLECTION).await?;
        export_info!("Found {} pages of posts", total_pages);

        let limit = self.options.posts_limit;
        let mut exported = 0usize;
        'pages: for page in 1..=total_pages {
            if cancel.is_cancelled() {
                return Err(ExportError::Cancelled);
            }
            export_info!("Fetching posts page {}/{}", page, total_pages);
            let posts: Vec<RemotePost> = self.client.fetch_page(POSTS_COLLECTION, page).await?;
            sink.emit(ExportEvent::PageFetched {
                collection: POSTS_COLLECTION,
                page,
                total_pages,
            });

            for post in &posts {
                if limit > 0 && exported >= limit {
                    break 'pages;
                }
                if cancel.is_cancelled() {
                    return Err(ExportError::Cancelled);
                }
                self.export_post(post, report, sink).await?;
                exported += 1;
            }
            if limit > 0 && exported >= limit {
                break;
            }
        }

        export_info!("Successfully exported {} posts", exported);
        Ok(exported)
    }

    /// Exports a single post, overwriting any previous `index.md`.
    pub async fn export_post(
        &mut self,
        post: &RemotePost,
        report: &mut ExportReport,
        sink: &dyn ProgressSink,
    ) -> Result<PathBuf, ExportError> {
        let title = decode_entities(&post.title.rendered);
        export_info!("Exporting post: {}", title);

        let author = resolve_author(&self.authors, post.author);
        if author.is_unknown() {
            export_warn!(
                "Author not found for post {:?} (ID: {})",
                title,
                post.author
            );
        }
        let category = resolve_category(&self.categories, &post.categories).cloned();

        let folder_name = safe_component(&post.slug).unwrap_or_else(|| format!("post-{}", post.id));
        let folder = self.posts_dir.join(folder_name);
        ensure_output_dir(&folder)?;

        let title_image = self.title_image(post, &folder, report).await;
        let tags = if self.options.show_tags {
            Some(self.tag_names(&post.tags).await)
        } else {
            None
        };

        let body = self
            .transformer
            .transform(&post.content.rendered, &folder, report)
            .await;

        let frontmatter = Frontmatter {
            id: post.slug.clone(),
            title,
            status: PostStatus::from_remote(&post.status),
            author: author.name,
            author_slug: author.slug,
            title_image,
            category_slug: category.as_ref().map(|c| c.id.clone()),
            category: category.map(|c| c.name),
            published_date: post.date.clone(),
            updated_at: post.modified.clone(),
            remote_id: post.id,
            tags,
        };

        let document = build_post_document(&frontmatter, &body);
        let path = AtomicFileWriter::new(folder).write(POST_FILENAME, &document)?;
        sink.emit(ExportEvent::PostExported {
            slug: post.slug.clone(),
        });
        Ok(path)
    }

    async fn title_image(
        &self,
        post: &RemotePost,
        folder: &Path,
        report: &mut ExportReport,
    ) -> Option<String> {
        if post.featured_media == 0 {
            return None;
        }
        let source_url = match self.client.fetch_media(post.featured_media).await {
            Ok(media) => media.source_url,
            Err(err) => {
                let url = self.client.item_url("media", post.featured_media);
                export_warn!("Media lookup {} failed: {}", url, err);
                report.record_failed_image(url);
                return None;
            }
        };

        let outcome = self
            .images
            .materialize(source_url.as_deref(), Some(folder))
            .await;
        if let Some(url) = outcome.failed_url() {
            report.record_failed_image(url);
        }
        outcome.filename().map(str::to_string)
    }

    /// Tag names in post order. Each tag id is fetched at most once per run;
    /// tags whose lookup fails are left out.
    async fn tag_names(&mut self, tag_ids: &[u64]) -> Vec<String> {
        let mut names = Vec::with_capacity(tag_ids.len());
        for &tag_id in tag_ids {
            if !self.tag_cache.contains_key(&tag_id) {
                let name = match self.client.fetch_tag(tag_id).await {
                    Ok(tag) => Some(tag.name),
                    Err(err) => {
                        export_warn!("Tag {} lookup failed: {}", tag_id, err);
                        None
                    }
                };
                self.tag_cache.insert(tag_id, name);
            }
            if let Some(Some(name)) = self.tag_cache.get(&tag_id) {
                names.push(decode_entities(name));
            }
        }
        names
    }
}
