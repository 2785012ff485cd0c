use export_logging::{export_debug, export_trace};
use wp_export_engine::{ExportEvent, ProgressSink};

/// Forwards engine progress to the log. The engine already logs the
/// milestones at info level, so events go out at debug and trace.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: ExportEvent) {
        match event {
            ExportEvent::StageEntered(stage) => export_debug!("Stage: {}", stage),
            ExportEvent::PageFetched {
                collection,
                page,
                total_pages,
            } => export_debug!("{} page {}/{} fetched", collection, page, total_pages),
            ExportEvent::RecordMerged {
                collection,
                key,
                outcome,
            } => export_trace!("{} {}: {:?}", collection, key, outcome),
            ExportEvent::PostExported { slug } => export_debug!("Post {} written", slug),
        }
    }
}
