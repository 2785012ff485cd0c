use std::path::Path;

use export_logging::{export_debug, export_info};
use tokio_util::sync::CancellationToken;
use wp_export_core::{Catalog, CatalogRecord, MergeOutcome};

use crate::api::WpClient;
use crate::error::ExportError;
use crate::fetch::ProgressSink;
use crate::persist::{load_json_array, write_json_pretty};
use crate::ExportEvent;

/// Loads the catalog at `path`, merges every page of the remote collection
/// into it and writes it back once all pages have been processed.
///
/// Re-running against an unchanged remote rewrites an identical file: known
/// keys are never duplicated and existing entries keep their position.
pub async fn merge_catalog<R: CatalogRecord>(
    client: &WpClient,
    path: &Path,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<Catalog<R>, ExportError> {
    let existing: Vec<R> = load_json_array(path)?;
    export_info!(
        "Loaded {} existing {} from {:?}",
        existing.len(),
        R::COLLECTION,
        path
    );
    let mut catalog = Catalog::from_records(existing);

    let total_pages = client.total_pages(R::COLLECTION).await?;
    export_info!("Found {} pages of {}", total_pages, R::COLLECTION);

    for page in 1..=total_pages {
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }
        export_info!(
            "Fetching {} page {}/{}",
            R::COLLECTION,
            page,
            total_pages
        );
        let remote_records: Vec<R::Remote> = client.fetch_page(R::COLLECTION, page).await?;
        sink.emit(ExportEvent::PageFetched {
            collection: R::COLLECTION,
            page,
            total_pages,
        });

        for remote in &remote_records {
            let outcome = catalog.merge_remote(remote);
            let key = R::remote_key(remote).to_string();
            match outcome {
                MergeOutcome::Inserted => {
                    export_info!("Adding {} entry {}", R::COLLECTION, key)
                }
                MergeOutcome::Skipped | MergeOutcome::Refreshed => {
                    export_debug!("{} entry {} already exists", R::COLLECTION, key)
                }
                MergeOutcome::Filtered => {
                    export_debug!("{} entry {} filtered out", R::COLLECTION, key)
                }
            }
            sink.emit(ExportEvent::RecordMerged {
                collection: R::COLLECTION,
                key,
                outcome,
            });
        }
    }

    write_json_pretty(path, catalog.records())?;
    export_info!(
        "Saved {} {} to {:?}",
        catalog.len(),
        R::COLLECTION,
        path
    );
    Ok(catalog)
}
