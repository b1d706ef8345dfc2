use humansize::{format_size, DECIMAL};
use serde::Serialize;

use crate::plan::UploadPlan;
use crate::progress::{CancelPredicate, Progress, ProgressCallback};
use crate::resolve::Resolution;
use crate::store::{ObjectStore, StoreContext};

/// Outcome of one ingestion attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    /// Destination keys that were written, in attempt order. On cancel or
    /// partial failure these are the rollback candidates.
    pub uploaded_paths: Vec<String>,
    /// `(destination key, error message)` for every item whose write failed.
    pub failed: Vec<(String, String)>,
    pub done_files: u64,
    pub done_bytes: u64,
    pub total_files: u64,
    pub total_bytes: u64,
    pub skipped_duplicates: u64,
    pub cancelled: bool,
}

impl UploadResult {
    pub fn is_complete_success(&self) -> bool {
        !self.cancelled && self.failed.is_empty() && self.done_files == self.total_files
    }
}

/// Stream every resolved item to the store, strictly sequentially.
///
/// A snapshot goes to `on_progress` before the first item and after every
/// attempted item, including the cancel check that stops the loop. One
/// item's failure is recorded and never aborts the batch. The plan's
/// `cleanup()` runs exactly once at the end, on every path.
pub(crate) async fn run_upload(
    store: &dyn ObjectStore,
    ctx: &StoreContext,
    mut plan: UploadPlan,
    resolution: Resolution,
    cancel: Option<CancelPredicate>,
    on_progress: Option<ProgressCallback>,
) -> UploadResult {
    let Resolution {
        items,
        skipped_duplicates,
    } = resolution;

    // Totals are fixed here and never recomputed mid-execution.
    let total_files = items.len() as u64;
    let total_bytes: u64 = items.iter().map(|item| item.size_bytes).sum();

    let reader = plan.content_reader();

    let mut done_files = 0u64;
    let mut done_bytes = 0u64;
    let mut failed_count = 0u64;
    let mut uploaded_paths = Vec::new();
    let mut failed = Vec::new();
    let mut cancelled = false;

    let emit = |done_files, done_bytes, failed_count| {
        if let Some(callback) = &on_progress {
            callback(Progress {
                done_files,
                done_bytes,
                total_files,
                total_bytes,
                skipped_duplicates,
                failed_count,
            });
        }
    };

    emit(done_files, done_bytes, failed_count);

    for item in &items {
        if let Some(cancel) = &cancel {
            if cancel() {
                cancelled = true;
                log::info!(
                    "Upload cancelled after {done_files}/{total_files} item(s); \
                     {} already written",
                    uploaded_paths.len()
                );
                emit(done_files, done_bytes, failed_count);
                break;
            }
        }

        let dest_key = ctx.key_for(&item.dest_relative_path);
        let outcome = match reader.as_ref() {
            Some(reader) => match reader.read(&item.source_relative_path).await {
                Ok(bytes) => {
                    store
                        .upload(
                            &ctx.bucket,
                            &dest_key,
                            bytes,
                            content_type_for(&item.dest_relative_path),
                            item.upsert,
                        )
                        .await
                }
                Err(err) => Err(err),
            },
            None => Err(anyhow::anyhow!("upload plan was already cleaned up")),
        };

        match outcome {
            Ok(()) => {
                done_files += 1;
                done_bytes += item.size_bytes;
                uploaded_paths.push(dest_key);
            }
            Err(err) => {
                failed_count += 1;
                log::warn!("Upload failed for {dest_key}: {err:#}");
                failed.push((dest_key, format!("{err:#}")));
            }
        }

        emit(done_files, done_bytes, failed_count);
    }

    plan.cleanup();

    if !cancelled {
        log::info!(
            "Uploaded {done_files}/{total_files} item(s) ({}), {failed_count} failed, \
             {skipped_duplicates} skipped",
            format_size(done_bytes, DECIMAL)
        );
    }

    UploadResult {
        uploaded_paths,
        failed,
        done_files,
        done_bytes,
        total_files,
        total_bytes,
        skipped_duplicates,
        cancelled,
    }
}

/// Content type by file extension; unknown extensions fall back to the
/// store's generic binary type.
pub(crate) fn content_type_for(path: &str) -> &'static str {
    let extension = path
        .rsplit('.')
        .next()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
