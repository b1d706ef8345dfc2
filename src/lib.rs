//! Ingestion core for moving compressed archives into a remote object store.
//!
//! The pipeline classifies an archive, enumerates or extracts its entries,
//! resolves name collisions against the destination, then streams each item
//! to the store sequentially while reporting progress and honoring a
//! cooperative cancellation flag. Partially completed transfers can be
//! rolled back in bounded delete batches.
//!
//! The two external collaborators — the decompression backend and the object
//! store — are injected as the [`Decompressor`] and [`ObjectStore`] traits;
//! this crate defines neither a wire protocol nor a user interface.

pub mod decompress;
pub mod error;
pub mod executor;
mod extract;
pub mod ingest;
pub mod inspect;
pub mod plan;
pub mod progress;
pub mod resolve;
pub mod retry;
pub mod rollback;
pub mod store;
pub mod throughput;

pub use decompress::{Decompressor, SevenZipCli};
pub use error::{DecompressError, IngestError};
pub use executor::UploadResult;
pub use ingest::Ingestor;
pub use inspect::{classify, is_supported, ArchiveFormat, Classification};
pub use plan::{ArchiveEntry, UploadPlan};
pub use progress::{progress_channel, CancelPredicate, Progress, ProgressCallback};
pub use resolve::{DuplicateStrategy, UploadItem};
pub use store::{ObjectStore, StoreContext};
pub use throughput::ThroughputEstimator;
