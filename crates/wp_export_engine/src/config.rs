use std::path::PathBuf;

use crate::convert::MarkdownOptions;
use crate::fetch::FetchSettings;
use crate::posts::PostExportOptions;

pub const AUTHORS_DIR: &str = "authors";
pub const AUTHORS_FILE: &str = "authors.json";
pub const CATEGORIES_FILE: &str = "categories.json";
pub const POSTS_DIR: &str = "posts";

#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Root of the `wp/v2` REST API, e.g. `https://example.com/wp-json/wp/v2/`.
    pub api_url: String,
    pub data_dir: PathBuf,
    /// 0 exports every post.
    pub posts_limit: usize,
    pub show_tags: bool,
    pub markdown: MarkdownOptions,
    pub fetch: FetchSettings,
}

impl ExportConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            data_dir: PathBuf::from("data"),
            posts_limit: 0,
            show_tags: false,
            markdown: MarkdownOptions::default(),
            fetch: FetchSettings::default(),
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn authors_file(&self) -> PathBuf {
        self.data_dir.join(AUTHORS_DIR).join(AUTHORS_FILE)
    }

    pub fn categories_file(&self) -> PathBuf {
        self.data_dir.join(CATEGORIES_FILE)
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.data_dir.join(POSTS_DIR)
    }

    pub(crate) fn post_options(&self) -> PostExportOptions {
        PostExportOptions {
            posts_limit: self.posts_limit,
            show_tags: self.show_tags,
        }
    }
}
