use std::fs;
use std::sync::Arc;

use tempfile::TempDir;
use wp_export_engine::{
    ExportError, FetchSettings, HtmlTransformer, ImageMaterializer, MarkdownConverter,
    PostExportOptions, PostExporter, ReqwestFetcher, WpClient,
};

fn build(authors: &std::path::Path, categories: &std::path::Path, posts: std::path::PathBuf) -> Result<PostExporter, ExportError> {
    let fetcher = Arc::new(ReqwestFetcher::new(FetchSettings::default()).unwrap());
    let client = WpClient::new("https://example.com/wp-json/wp/v2", fetcher.clone()).unwrap();
    let images = ImageMaterializer::new(fetcher);
    let transformer = HtmlTransformer::new(images.clone(), Arc::new(MarkdownConverter::default()));
    PostExporter::from_catalog_files(
        client,
        images,
        transformer,
        PostExportOptions::default(),
        authors,
        categories,
        posts,
    )
}

#[test]
fn missing_author_catalog_is_a_prerequisite_error() {
    let temp = TempDir::new().unwrap();
    let authors = temp.path().join("authors/authors.json");
    let categories = temp.path().join("categories.json");
    fs::write(&categories, "[]").unwrap();

    match build(&authors, &categories, temp.path().join("posts")) {
        Err(ExportError::MissingPrerequisite(path)) => assert_eq!(path, authors),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a missing prerequisite"),
    }
    assert!(!temp.path().join("posts").exists());
}

#[test]
fn missing_category_catalog_is_a_prerequisite_error() {
    let temp = TempDir::new().unwrap();
    let authors = temp.path().join("authors.json");
    let categories = temp.path().join("categories.json");
    fs::write(&authors, "[]").unwrap();

    assert!(matches!(
        build(&authors, &categories, temp.path().join("posts")),
        Err(ExportError::MissingPrerequisite(path)) if path == categories
    ));
}

#[test]
fn malformed_catalog_is_reported_with_its_path() {
    let temp = TempDir::new().unwrap();
    let authors = temp.path().join("authors.json");
    let categories = temp.path().join("categories.json");
    fs::write(&authors, "[]").unwrap();
    fs::write(&categories, "[{\"id\": 1}]").unwrap();

    assert!(matches!(
        build(&authors, &categories, temp.path().join("posts")),
        Err(ExportError::CatalogParse { path, .. }) if path == categories
    ));
}
