//! Company search pipeline: registry fan-out, merge, distance filtering,
//! optional contact enrichment, statistics.

pub mod dedupe;
pub mod distance;
pub mod error;
pub mod service;
pub mod stats;

pub use dedupe::dedupe;
pub use distance::{filter_and_sort, filter_by_place, haversine_km, round_one_decimal};
pub use error::{BuildError, SearchError};
pub use service::{EnrichmentSummary, SearchOutcome, SearchService, Warning};
pub use stats::SearchStats;
