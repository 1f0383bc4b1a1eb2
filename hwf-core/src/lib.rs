// hwf-core/src/lib.rs

pub mod archive;
pub mod ledger;
pub mod source;
pub mod tracker;

// Re-export key types for easier use by the CLI crate
pub use archive::{archive_and_prune, ArchiveOutcome};
pub use ledger::{Decision, VersionLedger};
pub use source::{builtin_sources, load_sources, SourceDescriptor};
pub use tracker::{select_sources, RunSummary, ToolOutcome, ToolReport, Tracker};
