//! Out-of-band repair jobs that run against committed data.

pub mod cleanup;
pub mod merge;

pub use cleanup::{CleanupPreview, CleanupSummary, cleanup_all, preview};
pub use merge::{MergeReport, merge_duplicate_leagues, plan_merges};
