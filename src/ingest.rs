use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::decompress::Decompressor;
use crate::error::IngestError;
use crate::executor::{self, UploadResult};
use crate::inspect::{self, Classification};
use crate::plan::{self, UploadPlan};
use crate::progress::{CancelPredicate, ProgressCallback};
use crate::resolve::{self, DuplicateStrategy};
use crate::rollback;
use crate::store::{ObjectStore, StoreContext};

/// Orchestrator facade over the ingestion pipeline.
///
/// Holds the two injected capabilities and exposes the pipeline's operations
/// in the order an application drives them: inspect → prepare_plan →
/// detect_duplicates → execute, with rollback available for partial results.
pub struct Ingestor {
    store: Arc<dyn ObjectStore>,
    decompressor: Arc<dyn Decompressor>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn ObjectStore>, decompressor: Arc<dyn Decompressor>) -> Self {
        Self {
            store,
            decompressor,
        }
    }

    /// Extension-based classification; needs no capability and no I/O.
    pub fn inspect(path: &Path) -> Classification {
        inspect::classify(path)
    }

    /// Classify and enumerate the archive. For formats that require full
    /// decompression the optional password is forwarded to the backend.
    pub async fn prepare_plan(
        &self,
        archive_path: &Path,
        password: Option<&str>,
    ) -> Result<UploadPlan, IngestError> {
        plan::prepare_plan(self.decompressor.clone(), archive_path, password).await
    }

    /// Planned base names that already exist at the destination.
    pub fn detect_duplicates(
        &self,
        plan: &UploadPlan,
        existing_names: &HashSet<String>,
    ) -> HashSet<String> {
        resolve::detect_duplicates(plan.entries(), existing_names)
    }

    /// Convenience wrapper over the store's name listing for the context's
    /// bucket and prefix.
    pub async fn list_existing_names(
        &self,
        ctx: &StoreContext,
    ) -> anyhow::Result<HashSet<String>> {
        self.store.list_names(&ctx.bucket, &ctx.prefix).await
    }

    /// Resolve duplicates per `strategy` and stream the resulting items to
    /// the store. The strategy string is validated before any I/O happens;
    /// everything past that point is reported through the returned
    /// [`UploadResult`], including per-item failures and cancellation.
    #[allow(clippy::too_many_arguments)]
    pub async fn execute(
        &self,
        plan: UploadPlan,
        ctx: &StoreContext,
        strategy: &str,
        existing_names: &HashSet<String>,
        duplicates: &HashSet<String>,
        cancel: Option<CancelPredicate>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<UploadResult, IngestError> {
        let strategy: DuplicateStrategy = strategy.parse()?;

        let resolution =
            resolve::resolve_entries(plan.entries(), existing_names, duplicates, strategy);

        Ok(executor::run_upload(
            self.store.as_ref(),
            ctx,
            plan,
            resolution,
            cancel,
            on_progress,
        )
        .await)
    }

    /// Delete previously uploaded keys in bounded batches.
    pub async fn rollback(
        &self,
        ctx: &StoreContext,
        uploaded_paths: &[String],
    ) -> anyhow::Result<()> {
        rollback::rollback(self.store.as_ref(), ctx, uploaded_paths).await
    }
}
