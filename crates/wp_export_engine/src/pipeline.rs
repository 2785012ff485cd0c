use std::sync::Arc;

use export_logging::{export_error, export_info};
use tokio_util::sync::CancellationToken;
use wp_export_core::{AuthorRecord, CategoryRecord, ExportReport, Stage};

use crate::api::WpClient;
use crate::catalog::merge_catalog;
use crate::config::ExportConfig;
use crate::convert::MarkdownConverter;
use crate::error::ExportError;
use crate::fetch::{Fetcher, NullProgressSink, ProgressSink, ReqwestFetcher};
use crate::images::ImageMaterializer;
use crate::persist::ensure_output_dir;
use crate::posts::PostExporter;
use crate::transform::HtmlTransformer;
use crate::ExportEvent;

/// Runs authors, categories and posts strictly in that order. Posts read the
/// catalogs back from disk, so each stage must finish before the next starts.
pub struct Exporter {
    config: ExportConfig,
    client: WpClient,
    sink: Arc<dyn ProgressSink>,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Result<Self, ExportError> {
        let fetcher = Arc::new(ReqwestFetcher::new(config.fetch.clone())?);
        Self::with_fetcher(config, fetcher)
    }

    pub fn with_fetcher(
        config: ExportConfig,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, ExportError> {
        let client = WpClient::new(&config.api_url, fetcher)?;
        Ok(Self {
            config,
            client,
            sink: Arc::new(NullProgressSink),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Runs the whole export. Any stage error aborts the run; image failures
    /// are collected in the returned report instead.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<ExportReport, ExportError> {
        ensure_output_dir(&self.config.data_dir)?;
        let mut report = ExportReport::new();
        let mut stage = Stage::default();

        while !stage.is_terminal() {
            self.sink.emit(ExportEvent::StageEntered(stage));
            let result = if cancel.is_cancelled() {
                Err(ExportError::Cancelled)
            } else {
                self.run_stage(stage, &mut report, cancel).await
            };
            match result {
                Ok(()) => stage = stage.advance(),
                Err(err) => {
                    export_error!("Export failed during {} stage: {}", stage, err);
                    self.sink.emit(ExportEvent::StageEntered(stage.fail()));
                    return Err(err);
                }
            }
        }

        self.sink.emit(ExportEvent::StageEntered(stage));
        export_info!(
            "Export finished: {} authors, {} categories, {} posts, {} failed images",
            report.authors,
            report.categories,
            report.posts_exported,
            report.failed_images.len()
        );
        Ok(report)
    }

    async fn run_stage(
        &self,
        stage: Stage,
        report: &mut ExportReport,
        cancel: &CancellationToken,
    ) -> Result<(), ExportError> {
        match stage {
            Stage::AuthorsPending => {
                export_info!("Exporting authors...");
                let authors = merge_catalog::<AuthorRecord>(
                    &self.client,
                    &self.config.authors_file(),
                    self.sink.as_ref(),
                    cancel,
                )
                .await?;
                report.authors = authors.len();
            }
            Stage::CategoriesPending => {
                export_info!("Exporting categories...");
                let categories = merge_catalog::<CategoryRecord>(
                    &self.client,
                    &self.config.categories_file(),
                    self.sink.as_ref(),
                    cancel,
                )
                .await?;
                report.categories = categories.len();
            }
            Stage::PostsPending => {
                export_info!("Exporting posts...");
                let mut exporter = self.post_exporter()?;
                report.posts_exported = exporter
                    .export_all(report, self.sink.as_ref(), cancel)
                    .await?;
            }
            Stage::Done | Stage::Failed => {}
        }
        Ok(())
    }

    fn post_exporter(&self) -> Result<PostExporter, ExportError> {
        let images = ImageMaterializer::new(self.client.fetcher())
            .with_site_origin(self.client.site_origin());
        let converter = Arc::new(MarkdownConverter::new(self.config.markdown.clone()));
        let transformer = HtmlTransformer::new(images.clone(), converter);
        PostExporter::from_catalog_files(
            self.client.clone(),
            images,
            transformer,
            self.config.post_options(),
            &self.config.authors_file(),
            &self.config.categories_file(),
            self.config.posts_dir(),
        )
    }
}
