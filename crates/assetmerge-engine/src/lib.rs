//! assetmerge engine: duplicate grouping, survivor selection, field merging
//! and reference relinking over an [`assetmerge_core::AssetStore`].

pub mod census;
pub mod error;
pub mod executor;
pub mod grouping;
pub mod merge;
pub mod normalize;
pub mod relink;
pub mod scoring;
pub mod selector;
pub mod similar;

pub use census::{Census, KeyCount, census};
pub use error::{DedupError, Result};
pub use executor::{Deduplicator, PlannedMerge, RunSummary};
pub use grouping::{DuplicateFinder, DuplicateGroup, GroupStrategy};
pub use merge::{MergeOutcome, NOTES_SEPARATOR, merge};
pub use normalize::normalize;
pub use relink::relink;
pub use scoring::{score, score_with};
pub use selector::{select, select_with};
pub use similar::{SimilarPair, find_similar, name_similarity};
