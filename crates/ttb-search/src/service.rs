//! Search orchestration: locate, fan out, merge, filter, enrich, count.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use ttb_core::{
    AppConfig, CompanyRecord, Coordinates, ErrorKind, SearchOptions, SearchRequest, SectorTable,
    MAX_RADIUS_KM,
};
use ttb_enrich::{DirectoryClient, EnrichmentConfig, EnrichmentPipeline};
use ttb_registry::{
    build_geocoder, build_registries, fan_out, FanOutLimits, GeocodeError, Geocoder,
    LocationFilter, RegistryAdapter,
};

use crate::dedupe::dedupe;
use crate::distance::{filter_and_sort, filter_by_place};
use crate::error::{BuildError, SearchError};
use crate::stats::SearchStats;

/// A failure that was absorbed rather than returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: ErrorKind,
    pub message: String,
}

impl Warning {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnrichmentSummary {
    pub attempted: usize,
    pub enriched: usize,
    pub blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub companies: Vec<CompanyRecord>,
    pub stats: SearchStats,
    /// Registries that answered at least one sub-query.
    pub source: String,
    pub partial: bool,
    pub warnings: Vec<Warning>,
    pub center: Option<Coordinates>,
    pub radius_km: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentSummary>,
}

pub struct SearchService {
    registries: Vec<Arc<dyn RegistryAdapter>>,
    geocoder: Geocoder,
    sectors: Arc<SectorTable>,
    limits: FanOutLimits,
    enrichment: Option<EnrichmentPipeline>,
}

impl SearchService {
    #[must_use]
    pub fn new(
        registries: Vec<Arc<dyn RegistryAdapter>>,
        geocoder: Geocoder,
        sectors: Arc<SectorTable>,
        limits: FanOutLimits,
    ) -> Self {
        Self {
            registries,
            geocoder,
            sectors,
            limits,
            enrichment: None,
        }
    }

    #[must_use]
    pub fn with_enrichment(mut self, pipeline: EnrichmentPipeline) -> Self {
        self.enrichment = Some(pipeline);
        self
    }

    /// Wires every collaborator from process configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the sector table cannot be loaded or any
    /// upstream client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, BuildError> {
        let sectors = SectorTable::load(config.sectors_path.as_deref())?;
        let registries = build_registries(config)?;
        let geocoder = build_geocoder(config)?;
        let directory = match config.upstream_urls.directory.as_deref() {
            Some(base) => DirectoryClient::with_base_url(config.enrichment_timeout_secs, base)?,
            None => DirectoryClient::new(config.enrichment_timeout_secs)?,
        };
        let pipeline = EnrichmentPipeline::new(
            Arc::new(directory),
            EnrichmentConfig {
                limit: config.enrichment_limit,
                delay: Duration::from_millis(config.enrichment_delay_ms),
                rate_limit_pause: Duration::from_millis(config.enrichment_rate_limit_pause_ms),
            },
        );
        let limits = FanOutLimits {
            max_concurrent: config.max_concurrent_subqueries,
            max_codes: config.max_codes_per_sector,
        };

        tracing::info!(
            registries = registries.len(),
            sectors = sectors.sectors().len(),
            sectors_version = sectors.version(),
            "search service ready"
        );
        Ok(Self::new(registries, geocoder, Arc::new(sectors), limits).with_enrichment(pipeline))
    }

    #[must_use]
    pub fn sectors(&self) -> &SectorTable {
        &self.sectors
    }

    #[must_use]
    pub fn registry_count(&self) -> usize {
        self.registries.len()
    }

    /// Runs one search.
    ///
    /// # Errors
    ///
    /// - [`SearchError::InvalidRequest`] for an unusable location, an
    ///   out-of-range radius or an unknown sector.
    /// - [`SearchError::AllSourcesFailed`] when no registry sub-query succeeded.
    /// - [`SearchError::Geocode`] when the place could not be located and no
    ///   candidate matched the postcode/city fallback, or when a bare point
    ///   could not be placed in a commune.
    pub async fn search(
        &self,
        request: &SearchRequest,
        options: SearchOptions,
    ) -> Result<SearchOutcome, SearchError> {
        let codes = self.validate(request)?;
        let mut warnings = Vec::new();

        let mut filter = LocationFilter::from_location(&request.location);
        let (center, mut geocode_failure) = self.locate(request, &mut filter).await;
        if filter.free_text().is_none() {
            // A bare point the geocoder could not place: no registry can search it.
            if let Some(e) = geocode_failure.take() {
                return Err(SearchError::Geocode(e));
            }
        }
        if let Some(e) = &geocode_failure {
            tracing::warn!(error = %e, "geocoding failed, falling back to place equality");
            warnings.push(Warning::new(e.kind(), e.to_string()));
        }

        let report = fan_out(&self.registries, &filter, codes, self.limits).await;
        if report.all_failed() {
            if let Some(cause) = report.into_decisive_error() {
                return Err(SearchError::AllSourcesFailed { cause });
            }
            return Ok(Self::empty_outcome(request, center, warnings));
        }

        let mut partial = report.is_partial();
        for failure in &report.failures {
            warnings.push(Warning::new(
                failure.error.kind(),
                format!("{}: {}", failure.source.label(), failure.error),
            ));
        }
        let source = report
            .succeeded
            .iter()
            .map(|s| s.label())
            .collect::<Vec<_>>()
            .join(", ");

        let mut companies: Vec<CompanyRecord> = dedupe(report.records)
            .into_iter()
            .filter(CompanyRecord::is_displayable)
            .collect();
        for record in &mut companies {
            if record.sector_label.is_none() {
                record.sector_label = record
                    .sector_code
                    .as_deref()
                    .and_then(|code| self.sectors.label_for(code))
                    .map(str::to_owned);
            }
        }

        let companies = match (center, geocode_failure) {
            (Some(point), _) => filter_and_sort(
                companies,
                Some(point),
                request.radius_km,
                filter.postcode.as_deref(),
            ),
            (None, Some(e)) => {
                let candidates = companies.len();
                let kept =
                    filter_by_place(companies, filter.postcode.as_deref(), filter.city.as_deref());
                if candidates > 0 && kept.is_empty() {
                    return Err(SearchError::Geocode(e));
                }
                kept
            }
            (None, None) => companies,
        };

        let (companies, enrichment) = if options.enrich {
            self.enrich(companies, options, &mut warnings, &mut partial)
                .await
        } else {
            (companies, None)
        };

        let stats = SearchStats::from_records(&companies);
        tracing::info!(
            total = stats.total,
            partial,
            source = %source,
            "search completed"
        );
        Ok(SearchOutcome {
            companies,
            stats,
            source,
            partial,
            warnings,
            center,
            radius_km: request.radius_km,
            enrichment,
        })
    }

    fn validate<'a>(
        &'a self,
        request: &SearchRequest,
    ) -> Result<Option<&'a [String]>, SearchError> {
        if !request.location.is_usable() {
            return Err(SearchError::InvalidRequest(
                "location needs a postcode, a city or a lat/lon pair".to_owned(),
            ));
        }
        if !request.radius_km.is_finite() || !(0.0..=MAX_RADIUS_KM).contains(&request.radius_km) {
            return Err(SearchError::InvalidRequest(format!(
                "radius must be between 0 and {MAX_RADIUS_KM} km"
            )));
        }
        match request.sector_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(id) => self
                .sectors
                .codes_for(id)
                .map(Some)
                .ok_or_else(|| SearchError::InvalidRequest(format!("unknown sector '{id}'"))),
        }
    }

    /// Resolves the search center. A geocoded place also supplies the
    /// postcode the registries need when the user gave only a city, and a
    /// bare point is reverse geocoded to its commune.
    async fn locate(
        &self,
        request: &SearchRequest,
        filter: &mut LocationFilter,
    ) -> (Option<Coordinates>, Option<GeocodeError>) {
        if let Some(center) = request.location.center() {
            if filter.free_text().is_some() {
                return (Some(center), None);
            }
            return match self.geocoder.reverse(center).await {
                Ok(place) => {
                    filter.postcode = place.postcode;
                    filter.city = place.city;
                    (Some(center), None)
                }
                Err(e) => (Some(center), Some(e)),
            };
        }
        let Some(term) = request.location.geocode_term() else {
            return (None, None);
        };
        match self.geocoder.resolve(&term).await {
            Ok(place) => {
                tracing::debug!(term = %term, label = ?place.label, "geocoded search location");
                if filter.postcode.is_none() {
                    filter.postcode = place.postcode;
                }
                (Some(place.point), None)
            }
            Err(e) => (None, Some(e)),
        }
    }

    async fn enrich(
        &self,
        companies: Vec<CompanyRecord>,
        options: SearchOptions,
        warnings: &mut Vec<Warning>,
        partial: &mut bool,
    ) -> (Vec<CompanyRecord>, Option<EnrichmentSummary>) {
        let Some(pipeline) = &self.enrichment else {
            tracing::debug!("enrichment requested but no directory is configured");
            return (companies, None);
        };

        let report = pipeline.run(&companies, options.enrichment_limit).await;
        let summary = EnrichmentSummary {
            attempted: report.attempted(),
            enriched: report.enriched.len(),
            blocked: report.blocked(),
        };
        if report.blocked() {
            *partial = true;
            warnings.push(Warning::new(
                ErrorKind::EnrichmentBlocked,
                "directory blocked automated requests; enrichment stopped early",
            ));
        }
        if report.errors > 0 {
            *partial = true;
        }

        let mut enriched = report.enriched;
        let merged = companies
            .into_iter()
            .map(|record| {
                match enriched
                    .iter()
                    .position(|e| e.registry_id == record.registry_id)
                {
                    Some(idx) => enriched.swap_remove(idx),
                    None => record,
                }
            })
            .collect();
        (merged, Some(summary))
    }

    fn empty_outcome(
        request: &SearchRequest,
        center: Option<Coordinates>,
        warnings: Vec<Warning>,
    ) -> SearchOutcome {
        SearchOutcome {
            companies: Vec::new(),
            stats: SearchStats::default(),
            source: String::new(),
            partial: false,
            warnings,
            center,
            radius_km: request.radius_km,
            enrichment: None,
        }
    }
}
