//! The capability every registry variant implements, plus the request-scoped
//! inputs handed to it.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ttb_core::{CompanyRecord, Coordinates, Location, RecordSource};

use crate::error::RegistryError;

/// Where to search. Built once per request from the user's location and
/// whatever the geocoder resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationFilter {
    pub postcode: Option<String>,
    pub city: Option<String>,
    pub center: Option<Coordinates>,
}

impl LocationFilter {
    #[must_use]
    pub fn from_location(location: &Location) -> Self {
        Self {
            postcode: location.postcode(),
            city: location.city(),
            center: location.center(),
        }
    }

    /// Free-text location term. The commune name matches better than a
    /// postcode on full-text registries, so it wins when both are known.
    #[must_use]
    pub fn free_text(&self) -> Option<&str> {
        self.city.as_deref().or(self.postcode.as_deref())
    }
}

/// Request-scoped allowance of per-entity detail calls, shared by every
/// sub-query an adapter runs for the same search.
#[derive(Debug)]
pub struct DetailBudget {
    remaining: AtomicUsize,
}

impl DetailBudget {
    #[must_use]
    pub fn new(calls: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(calls),
        }
    }

    /// Takes one call from the budget. `false` once it is spent.
    pub fn try_take(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Drops the remaining allowance, e.g. after a quota error.
    pub fn exhaust(&self) {
        self.remaining.store(0, Ordering::Release);
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }
}

/// One upstream company registry.
///
/// `query_code` runs a single sub-query: one location filter and at most one
/// classification code, since none of the upstreams accept several codes per
/// call. [`crate::fan_out`] drives the per-code calls and merges the results.
#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    fn source(&self) -> RecordSource;

    /// Detail calls this adapter may spend per search. Zero for registries
    /// without a detail stage.
    fn detail_budget(&self) -> usize {
        0
    }

    /// # Errors
    ///
    /// Returns [`RegistryError`] mapped from the upstream status, or from
    /// the transport/deserialisation failure.
    async fn query_code(
        &self,
        filter: &LocationFilter,
        code: Option<&str>,
        budget: &DetailBudget,
    ) -> Result<Vec<CompanyRecord>, RegistryError>;
}
