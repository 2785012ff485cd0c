/// Outcome of a completed export run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportReport {
    pub authors: usize,
    pub categories: usize,
    pub posts_exported: usize,
    /// Image URLs that could not be materialized, in the order they failed.
    pub failed_images: Vec<String>,
}

impl ExportReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failed_image(&mut self, url: impl Into<String>) {
        self.failed_images.push(url.into());
    }
}
