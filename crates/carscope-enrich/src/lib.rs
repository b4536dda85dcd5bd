//! Batch enrichment of profile records.
//!
//! Drives the fetch → analyze → normalize → apply cycle: pages of
//! not-yet-analyzed profiles are pulled from the store, sent in chunks to the
//! model, and the parsed results are written back row by row. Transient
//! failures retry a chunk up to a configured attempt budget; exhausted chunks
//! are abandoned and picked up by the next invocation, since their rows stay
//! unprocessed in the store.

pub mod apply;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod store;
pub mod types;

#[cfg(test)]
mod testutil;

pub use apply::{apply_results, coerce_car_flag, coerce_profile_type, ApplyOutcome};
pub use error::EnrichError;
pub use normalize::{clean_response, normalize_response};
pub use pipeline::{run_enrichment, Analyzer};
pub use store::{PgProfileStore, ProfileStore};
pub use types::{AnalysisResult, CarFlag, EnrichConfig, RunSummary};
