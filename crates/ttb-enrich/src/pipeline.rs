//! Sequential contact enrichment.
//!
//! A batch starts `Running`. Each item goes `Searching` and settles as
//! `Found`, `NotFound`, `Blocked` or `Error`. A block moves the batch to
//! `Stopped` and no further item is searched.

use std::sync::Arc;
use std::time::Duration;

use ttb_core::CompanyRecord;

use crate::client::DirectoryLookup;
use crate::error::EnrichmentError;

/// Upper bound honoured for a directory-supplied `Retry-After`.
const MAX_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentConfig {
    /// Maximum records attempted per batch; `0` means unlimited.
    pub limit: usize,
    /// Fixed pause between two items.
    pub delay: Duration,
    /// One-time pause before retrying an item that was rate limited.
    pub rate_limit_pause: Duration,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            limit: 20,
            delay: Duration::from_secs(2),
            rate_limit_pause: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Found,
    NotFound,
    Blocked,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTrace {
    pub registry_id: String,
    pub outcome: ItemOutcome,
    /// Directory requests issued for this item (2 after a rate-limit retry).
    pub attempts: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentReport {
    /// Records that gained at least one contact field, in input order.
    pub enriched: Vec<CompanyRecord>,
    pub trace: Vec<ItemTrace>,
    pub state: BatchState,
    /// Items that ended in `Error`.
    pub errors: usize,
}

impl EnrichmentReport {
    fn new() -> Self {
        Self {
            enriched: Vec::new(),
            trace: Vec::new(),
            state: BatchState::Running,
            errors: 0,
        }
    }

    #[must_use]
    pub fn blocked(&self) -> bool {
        self.state == BatchState::Stopped
    }

    #[must_use]
    pub fn attempted(&self) -> usize {
        self.trace.len()
    }
}

enum Settled {
    Found(CompanyRecord),
    NotFound,
    Blocked(EnrichmentError),
    Error(EnrichmentError),
}

/// A record is worth a directory lookup when it has a name and lacks an
/// e-mail or a phone number.
#[must_use]
pub fn needs_contact(record: &CompanyRecord) -> bool {
    record.name.is_some() && (record.email().is_none() || record.phone().is_none())
}

pub struct EnrichmentPipeline {
    lookup: Arc<dyn DirectoryLookup>,
    config: EnrichmentConfig,
}

impl EnrichmentPipeline {
    #[must_use]
    pub fn new(lookup: Arc<dyn DirectoryLookup>, config: EnrichmentConfig) -> Self {
        Self { lookup, config }
    }

    #[must_use]
    pub fn config(&self) -> EnrichmentConfig {
        self.config
    }

    /// Runs one batch over `records`.
    ///
    /// `limit` overrides the configured cap for this batch. Items are
    /// searched strictly one after another.
    pub async fn run(&self, records: &[CompanyRecord], limit: Option<usize>) -> EnrichmentReport {
        let cap = match limit.unwrap_or(self.config.limit) {
            0 => usize::MAX,
            n => n,
        };
        let batch: Vec<&CompanyRecord> = records
            .iter()
            .filter(|r| needs_contact(r))
            .take(cap)
            .collect();

        tracing::info!(candidates = batch.len(), "enrichment batch started");
        let mut report = EnrichmentReport::new();

        for (index, record) in batch.iter().enumerate() {
            if index > 0 && !self.config.delay.is_zero() {
                tokio::time::sleep(self.config.delay).await;
            }

            let (settled, attempts) = self.search(record).await;
            let outcome = match settled {
                Settled::Found(enriched) => {
                    tracing::debug!(registry_id = %record.registry_id, "contact found");
                    report.enriched.push(enriched);
                    ItemOutcome::Found
                }
                Settled::NotFound => {
                    tracing::debug!(registry_id = %record.registry_id, "no contact found");
                    ItemOutcome::NotFound
                }
                Settled::Blocked(e) => {
                    tracing::warn!(
                        registry_id = %record.registry_id,
                        remaining = batch.len() - index - 1,
                        error = %e,
                        "directory blocked enrichment, stopping batch"
                    );
                    report.state = BatchState::Stopped;
                    ItemOutcome::Blocked
                }
                Settled::Error(e) => {
                    tracing::warn!(
                        registry_id = %record.registry_id,
                        error = %e,
                        "enrichment item failed"
                    );
                    report.errors += 1;
                    ItemOutcome::Error
                }
            };
            report.trace.push(ItemTrace {
                registry_id: record.registry_id.clone(),
                outcome,
                attempts,
            });
            if report.state == BatchState::Stopped {
                break;
            }
        }

        tracing::info!(
            attempted = report.attempted(),
            enriched = report.enriched.len(),
            errors = report.errors,
            blocked = report.blocked(),
            "enrichment batch finished"
        );
        report
    }

    async fn search(&self, record: &CompanyRecord) -> (Settled, u8) {
        let mut attempts = 0_u8;
        let mut paused = false;
        loop {
            attempts += 1;
            match self.lookup.lookup(record).await {
                Ok(found) => {
                    let settled = match record.with_contact(&found) {
                        Some(enriched) => Settled::Found(enriched),
                        None => Settled::NotFound,
                    };
                    return (settled, attempts);
                }
                Err(EnrichmentError::RateLimited { retry_after_secs }) if !paused => {
                    paused = true;
                    let pause = self.rate_limit_pause(retry_after_secs);
                    tracing::warn!(
                        registry_id = %record.registry_id,
                        pause_ms = pause.as_millis(),
                        "directory rate limited, pausing before retry"
                    );
                    tokio::time::sleep(pause).await;
                }
                Err(e @ EnrichmentError::Blocked { .. }) => return (Settled::Blocked(e), attempts),
                Err(e) => return (Settled::Error(e), attempts),
            }
        }
    }

    fn rate_limit_pause(&self, retry_after_secs: Option<u64>) -> Duration {
        let advertised =
            Duration::from_secs(retry_after_secs.unwrap_or(0).min(MAX_RETRY_AFTER_SECS));
        self.config.rate_limit_pause.max(advertised)
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
