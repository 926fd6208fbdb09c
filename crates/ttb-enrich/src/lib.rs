//! Best-effort contact enrichment from a public business directory.

pub mod client;
pub mod error;
pub mod extract;
pub mod pipeline;

pub use client::{lookup_query, DirectoryClient, DirectoryLookup, DEFAULT_DIRECTORY_URL};
pub use error::EnrichmentError;
pub use extract::extract_contact;
pub use pipeline::{
    needs_contact, BatchState, EnrichmentConfig, EnrichmentPipeline, EnrichmentReport,
    ItemOutcome, ItemTrace,
};
