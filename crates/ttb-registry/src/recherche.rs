//! Client for the free government company search (`recherche-entreprises`).
//!
//! Unauthenticated, returns legal units with their head office. Only active
//! units are requested. No contact fields are ever available from this source.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use ttb_core::{clean_value, CompanyRecord, RecordSource};

use crate::adapter::{DetailBudget, LocationFilter, RegistryAdapter};
use crate::error::RegistryError;
use crate::http::{build_client, parse_base_url, send_json};
use crate::normalize::{bounded_executives, executive, parse_coordinates, parse_date};

const DEFAULT_BASE_URL: &str = "https://recherche-entreprises.api.gouv.fr";
const REGISTRY: &str = "recherche-entreprises";
/// Largest page size the API accepts.
const PER_PAGE: u32 = 25;

pub struct RechercheClient {
    client: Client,
    base_url: Url,
    max_pages: u32,
}

impl RechercheClient {
    /// # Errors
    ///
    /// Returns [`RegistryError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(timeout_secs: u64, user_agent: &str, max_pages: u32) -> Result<Self, RegistryError> {
        Self::with_base_url(timeout_secs, user_agent, max_pages, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`RegistryError::InvalidBaseUrl`] for a malformed `base_url`.
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        max_pages: u32,
        base_url: &str,
    ) -> Result<Self, RegistryError> {
        let client = build_client(timeout_secs, user_agent).map_err(|source| {
            RegistryError::Http {
                registry: REGISTRY,
                source,
            }
        })?;
        let base_url = parse_base_url(base_url).map_err(|reason| RegistryError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason,
        })?;
        Ok(Self {
            client,
            base_url,
            max_pages: max_pages.max(1),
        })
    }

    fn search_url(&self, term: &str, page: u32, code: Option<&str>) -> Result<Url, RegistryError> {
        let mut url = self
            .base_url
            .join("search")
            .map_err(|e| RegistryError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", term);
            pairs.append_pair("page", &page.to_string());
            pairs.append_pair("per_page", &PER_PAGE.to_string());
            pairs.append_pair("etat_administratif", "A");
            if let Some(code) = code {
                pairs.append_pair("activite_principale", code);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl RegistryAdapter for RechercheClient {
    fn source(&self) -> RecordSource {
        RecordSource::RechercheEntreprises
    }

    async fn query_code(
        &self,
        filter: &LocationFilter,
        code: Option<&str>,
        _budget: &DetailBudget,
    ) -> Result<Vec<CompanyRecord>, RegistryError> {
        let term = filter.free_text().ok_or(RegistryError::MissingLocation {
            registry: REGISTRY,
            field: "city or postcode",
        })?;

        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let url = self.search_url(term, page, code)?;
            let context = format!("search(q={term}, page={page}, code={code:?})");
            let body: SearchPage = send_json(REGISTRY, self.client.get(url), &context).await?;

            records.extend(body.results.into_iter().filter_map(normalize_unit));

            let total_pages = body.total_pages.unwrap_or(page);
            if page >= total_pages || page >= self.max_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!(
            source = REGISTRY,
            code = ?code,
            count = records.len(),
            "recherche sub-query completed"
        );
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<LegalUnit>,
    total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LegalUnit {
    siren: Option<String>,
    nom_complet: Option<String>,
    nom_raison_sociale: Option<String>,
    activite_principale: Option<String>,
    nature_juridique: Option<String>,
    date_creation: Option<String>,
    etat_administratif: Option<String>,
    tranche_effectif_salarie: Option<String>,
    #[serde(default)]
    siege: HeadOffice,
    #[serde(default)]
    dirigeants: Vec<Officer>,
}

#[derive(Debug, Default, Deserialize)]
struct HeadOffice {
    siret: Option<String>,
    adresse: Option<String>,
    geo_adresse: Option<String>,
    libelle_commune: Option<String>,
    code_postal: Option<String>,
    latitude: Option<Value>,
    longitude: Option<Value>,
    coordonnees: Option<String>,
    date_creation: Option<String>,
    tranche_effectif_salarie: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Officer {
    nom: Option<String>,
    prenoms: Option<String>,
    qualite: Option<String>,
    /// Set instead of `nom` when the officer is itself a company.
    denomination: Option<String>,
}

fn normalize_unit(unit: LegalUnit) -> Option<CompanyRecord> {
    let siege = unit.siege;
    let mut record = CompanyRecord::keyed(
        unit.siren.as_deref(),
        siege.siret.as_deref(),
        RecordSource::RechercheEntreprises,
    )?;

    record.name = clean_value(unit.nom_complet).or_else(|| clean_value(unit.nom_raison_sociale));
    record.address = clean_value(siege.adresse).or_else(|| clean_value(siege.geo_adresse));
    record.city = clean_value(siege.libelle_commune);
    record.postcode = clean_value(siege.code_postal);
    record.sector_code = clean_value(unit.activite_principale);
    record.coordinates = parse_coordinates(
        siege.latitude.as_ref(),
        siege.longitude.as_ref(),
        siege.coordonnees.as_deref(),
    );
    record.legal_form = clean_value(unit.nature_juridique);
    record.employee_range = clean_value(siege.tranche_effectif_salarie)
        .or_else(|| clean_value(unit.tranche_effectif_salarie));
    record.creation_date = parse_date(unit.date_creation.as_deref())
        .or_else(|| parse_date(siege.date_creation.as_deref()));
    // Only active units are requested, so a missing state means active.
    record.administrative_state =
        clean_value(unit.etat_administratif).or_else(|| Some("A".to_owned()));
    record.executives = bounded_executives(unit.dirigeants.iter().filter_map(|d| {
        let last = d.nom.as_deref().or(d.denomination.as_deref());
        executive(last, d.prenoms.as_deref(), d.qualite.as_deref())
    }));

    Some(record)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn unit(value: serde_json::Value) -> LegalUnit {
        serde_json::from_value(value).expect("valid legal unit")
    }

    #[test]
    fn search_url_carries_filters() {
        let client = RechercheClient::with_base_url(5, "test", 1, "https://example.test").unwrap();
        let url = client.search_url("Lyon", 2, Some("62.01Z")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/search?q=Lyon&page=2&per_page=25&etat_administratif=A&activite_principale=62.01Z"
        );
    }

    #[test]
    fn search_url_without_code() {
        let client = RechercheClient::with_base_url(5, "test", 1, "https://example.test/").unwrap();
        let url = client.search_url("75001", 1, None).unwrap();
        assert!(!url.as_str().contains("activite_principale"));
    }

    #[test]
    fn normalize_reads_head_office_and_officers() {
        let rec = normalize_unit(unit(json!({
            "siren": "552100554",
            "nom_complet": "ACME CONSEIL",
            "activite_principale": "70.22Z",
            "nature_juridique": "5710",
            "date_creation": "2010-06-01",
            "etat_administratif": "A",
            "siege": {
                "siret": "55210055400013",
                "adresse": "1 RUE DE LA REPUBLIQUE 69001 LYON",
                "libelle_commune": "LYON",
                "code_postal": "69001",
                "latitude": "45.7676",
                "longitude": "4.8344",
                "tranche_effectif_salarie": "12"
            },
            "dirigeants": [
                {"nom": "DUPONT", "prenoms": "Jean Paul", "qualite": "Président de SAS"},
                {"denomination": "HOLDING X", "qualite": "Commissaire aux comptes"}
            ]
        })))
        .expect("record");

        assert_eq!(rec.registry_id, "552100554");
        assert_eq!(rec.establishment_id.as_deref(), Some("55210055400013"));
        assert_eq!(rec.city.as_deref(), Some("LYON"));
        assert_eq!(rec.sector_code.as_deref(), Some("70.22Z"));
        assert!(rec.coordinates.is_some());
        assert_eq!(rec.executives.len(), 2);
        assert_eq!(rec.executives[1].last_name, "HOLDING X");
        assert!(rec.contact.is_none());
        assert!(rec.is_active());
    }

    #[test]
    fn normalize_uses_coordinate_pair_string() {
        let rec = normalize_unit(unit(json!({
            "siren": "1",
            "siege": {"coordonnees": "48.8566,2.3522"}
        })))
        .unwrap();
        let point = rec.coordinates.unwrap();
        assert!((point.lon - 2.3522).abs() < 1e-9);
    }

    #[test]
    fn normalize_skips_units_without_identifier() {
        assert!(normalize_unit(unit(json!({"nom_complet": "NO ID"}))).is_none());
    }
}
