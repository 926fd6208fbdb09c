//! Command handlers. Every command prints JSON on stdout; logs go to stderr.

use anyhow::Context;
use clap::Args;
use ttb_core::{AppConfig, Location, SearchOptions, SearchRequest, SectorTable};
use ttb_search::SearchService;

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Five-digit postcode
    #[arg(long)]
    pub postcode: Option<String>,
    /// Commune name
    #[arg(long)]
    pub city: Option<String>,
    /// Latitude of the search centre (requires --lon)
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,
    /// Longitude of the search centre (requires --lat)
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
    /// Radius in kilometres (defaults to TTB_DEFAULT_RADIUS_KM)
    #[arg(long, short)]
    pub radius: Option<f64>,
    /// Sector id, see `ttb sectors`
    #[arg(long, short)]
    pub sector: Option<String>,
    /// Look up missing contact details in the business directory
    #[arg(long)]
    pub enrich: bool,
    /// Maximum companies to enrich (0 = all)
    #[arg(long, requires = "enrich")]
    pub enrichment_limit: Option<usize>,
    /// Print compact JSON
    #[arg(long)]
    pub compact: bool,
}

impl SearchArgs {
    pub fn to_request(&self, default_radius_km: f64) -> (SearchRequest, SearchOptions) {
        let request = SearchRequest {
            location: Location {
                city: self.city.clone(),
                postcode: self.postcode.clone(),
                lat: self.lat,
                lon: self.lon,
                label: None,
            },
            radius_km: self.radius.unwrap_or(default_radius_km),
            sector_id: self.sector.clone(),
        };
        let options = SearchOptions {
            enrich: self.enrich,
            enrichment_limit: self.enrichment_limit,
        };
        (request, options)
    }
}

fn print_json<T: serde::Serialize>(value: &T, compact: bool) -> anyhow::Result<()> {
    let out = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{out}");
    Ok(())
}

pub async fn run_search(config: &AppConfig, args: SearchArgs) -> anyhow::Result<()> {
    let service = SearchService::from_config(config).context("failed to build search service")?;
    let (request, options) = args.to_request(config.default_radius_km);

    let outcome = service
        .search(&request, options)
        .await
        .map_err(|e| anyhow::anyhow!("{e} [{}]", e.kind()))?;

    for warning in &outcome.warnings {
        tracing::warn!(kind = %warning.kind, "{}", warning.message);
    }
    print_json(&outcome, args.compact)
}

pub fn run_sectors(config: &AppConfig, with_codes: bool) -> anyhow::Result<()> {
    let table = SectorTable::load(config.sectors_path.as_deref())?;
    let sectors: Vec<serde_json::Value> = table
        .sectors()
        .iter()
        .map(|s| {
            if with_codes {
                serde_json::json!({"id": s.id, "label": s.label, "codes": s.codes})
            } else {
                serde_json::json!({"id": s.id, "label": s.label})
            }
        })
        .collect();
    print_json(
        &serde_json::json!({"version": table.version(), "sectors": sectors}),
        false,
    )
}

pub async fn run_geocode(config: &AppConfig, term: &str) -> anyhow::Result<()> {
    let geocoder = ttb_registry::build_geocoder(config)?;
    let place = geocoder
        .resolve(term)
        .await
        .map_err(|e| anyhow::anyhow!("{e} [{}]", e.kind()))?;
    print_json(
        &serde_json::json!({
            "lat": place.point.lat,
            "lon": place.point.lon,
            "city": place.city,
            "postcode": place.postcode,
            "label": place.label,
        }),
        false,
    )
}
