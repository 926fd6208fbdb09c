//! Bounded fan-out of registry sub-queries: one per (registry, code) pair.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use ttb_core::{CompanyRecord, RecordSource};

use crate::adapter::{DetailBudget, LocationFilter, RegistryAdapter};
use crate::error::RegistryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOutLimits {
    /// Upstream calls in flight at once.
    pub max_concurrent: usize,
    /// Classification codes queried per sector; the rest are skipped.
    pub max_codes: usize,
}

impl Default for FanOutLimits {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            max_codes: 5,
        }
    }
}

/// A sub-query that failed and was absorbed.
#[derive(Debug)]
pub struct SubQueryFailure {
    pub source: RecordSource,
    pub code: Option<String>,
    pub error: RegistryError,
}

#[derive(Debug, Default)]
pub struct FanOutReport {
    /// Records in sub-query order (registry order, then code order).
    pub records: Vec<CompanyRecord>,
    pub failures: Vec<SubQueryFailure>,
    /// Registries with at least one successful sub-query, in registry order.
    pub succeeded: Vec<RecordSource>,
    pub attempted: usize,
}

impl FanOutReport {
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.succeeded.is_empty()
    }

    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty() && !self.succeeded.is_empty()
    }

    /// The error to surface when every sub-query failed: the last one that
    /// says more than "unavailable", otherwise the last one.
    #[must_use]
    pub fn into_decisive_error(self) -> Option<RegistryError> {
        let specific = self.failures.iter().rposition(|f| f.error.is_specific());
        let idx = specific.or_else(|| self.failures.len().checked_sub(1))?;
        self.failures.into_iter().nth(idx).map(|f| f.error)
    }
}

/// Deduplicated codes in table order, capped at `max_codes`. `[None]` (a
/// single unfiltered sub-query) when there is no sector filter.
#[must_use]
pub fn bounded_codes(codes: Option<&[String]>, max_codes: usize) -> Vec<Option<String>> {
    let mut out: Vec<Option<String>> = Vec::new();
    for code in codes.unwrap_or_default() {
        let code = code.trim();
        if code.is_empty() || out.iter().any(|c| c.as_deref() == Some(code)) {
            continue;
        }
        if out.len() >= max_codes.max(1) {
            break;
        }
        out.push(Some(code.to_owned()));
    }
    if out.is_empty() {
        out.push(None);
    }
    out
}

/// Runs every (registry, code) sub-query with at most
/// `limits.max_concurrent` in flight and waits for all of them to settle.
///
/// Failures are collected, never short-circuited. Output order does not
/// depend on completion order.
pub async fn fan_out(
    registries: &[Arc<dyn RegistryAdapter>],
    filter: &LocationFilter,
    codes: Option<&[String]>,
    limits: FanOutLimits,
) -> FanOutReport {
    let codes = bounded_codes(codes, limits.max_codes);
    let budgets: Vec<DetailBudget> = registries
        .iter()
        .map(|r| DetailBudget::new(r.detail_budget()))
        .collect();

    let jobs: Vec<(usize, Option<String>)> = (0..registries.len())
        .flat_map(|ri| codes.iter().map(move |c| (ri, c.clone())))
        .collect();
    let attempted = jobs.len();

    let mut outcomes: Vec<_> = stream::iter(jobs.into_iter().enumerate())
        .map(|(idx, (ri, code))| {
            let registry = &registries[ri];
            let budget = &budgets[ri];
            async move {
                let result = registry.query_code(filter, code.as_deref(), budget).await;
                (idx, ri, registry.source(), code, result)
            }
        })
        .buffer_unordered(limits.max_concurrent.max(1))
        .collect()
        .await;
    outcomes.sort_by_key(|(idx, ..)| *idx);

    let mut report = FanOutReport {
        attempted,
        ..FanOutReport::default()
    };
    let mut succeeded_idx: Vec<usize> = Vec::new();

    for (_, ri, source, code, result) in outcomes {
        match result {
            Ok(records) => {
                tracing::debug!(
                    source = source.as_str(),
                    code = ?code,
                    count = records.len(),
                    "sub-query succeeded"
                );
                report.records.extend(records);
                if !succeeded_idx.contains(&ri) {
                    succeeded_idx.push(ri);
                }
            }
            Err(error) => {
                tracing::warn!(
                    source = source.as_str(),
                    code = ?code,
                    kind = %error.kind(),
                    error = %error,
                    "sub-query failed"
                );
                report.failures.push(SubQueryFailure {
                    source,
                    code,
                    error,
                });
            }
        }
    }

    succeeded_idx.sort_unstable();
    report.succeeded = succeeded_idx
        .into_iter()
        .map(|ri| registries[ri].source())
        .collect();
    report
}
