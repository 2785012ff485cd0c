use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use export_logging::export_debug;
use wp_export_core::ExportReport;

use crate::convert::Converter;
use crate::images::ImageMaterializer;
use crate::rewrite::{
    collect_image_sources, rewrite_html, LocalizeImageSources, PollPlaceholder, RewriteRule,
    StripPresentationAttributes,
};

/// Applies the sanitize rules to a post body.
pub fn sanitize_html(html: &str) -> String {
    let rules: [&dyn RewriteRule; 2] = [&PollPlaceholder, &StripPresentationAttributes];
    rewrite_html(html, &rules)
}

/// Turns a rendered post body into self-contained Markdown: sanitize,
/// download and re-link images into `post_folder`, then convert.
pub struct HtmlTransformer {
    images: ImageMaterializer,
    converter: Arc<dyn Converter>,
}

impl HtmlTransformer {
    pub fn new(images: ImageMaterializer, converter: Arc<dyn Converter>) -> Self {
        Self { images, converter }
    }

    pub async fn transform(
        &self,
        raw_html: &str,
        post_folder: &Path,
        report: &mut ExportReport,
    ) -> String {
        let sanitized = sanitize_html(raw_html);

        let mut resolved = HashMap::new();
        for src in collect_image_sources(&sanitized) {
            let outcome = self
                .images
                .materialize(Some(src.as_str()), Some(post_folder))
                .await;
            if let Some(url) = outcome.failed_url() {
                report.record_failed_image(url);
            }
            export_debug!("Body image {} -> {:?}", src, outcome.filename());
            resolved.insert(src, outcome.filename().map(str::to_string));
        }

        let localized = rewrite_html(&sanitized, &[&LocalizeImageSources::new(&resolved)]);
        self.converter.to_markdown(&localized)
    }
}
