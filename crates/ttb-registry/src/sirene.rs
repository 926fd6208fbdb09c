//! Client for the INSEE Sirene establishment registry (`api-sirene/3.11`).
//!
//! Sirene never exposes contact data or coordinates. Unknown values come
//! back as the `[ND]` sentinel and are dropped during normalisation.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use ttb_core::{clean_value, compose_address, CompanyRecord, RecordSource};

use crate::adapter::{DetailBudget, LocationFilter, RegistryAdapter};
use crate::error::RegistryError;
use crate::http::{build_client, parse_base_url, send_json};
use crate::normalize::{parse_date, person_name, postcode_digits};

const DEFAULT_BASE_URL: &str = "https://api.insee.fr/api-sirene/3.11";
const REGISTRY: &str = "sirene";
const API_KEY_HEADER: &str = "X-INSEE-Api-Key-Integration";
const PAGE_SIZE: u32 = 100;
const SORT: &str = "dateCreationUniteLegale desc";
const MAX_CITY_CHARS: usize = 100;

pub struct SireneClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_pages: u32,
}

impl SireneClient {
    /// # Errors
    ///
    /// Returns [`RegistryError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        api_key: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_pages: u32,
    ) -> Result<Self, RegistryError> {
        Self::with_base_url(api_key, timeout_secs, user_agent, max_pages, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`RegistryError::InvalidBaseUrl`] for a malformed `base_url`.
    pub fn with_base_url(
        api_key: &str,
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
            api_key: api_key.to_owned(),
            base_url,
            max_pages: max_pages.max(1),
        })
    }

    fn siret_url(&self, query: &str, offset: u32) -> Result<Url, RegistryError> {
        let mut url = self
            .base_url
            .join("siret")
            .map_err(|e| RegistryError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("nombre", &PAGE_SIZE.to_string())
            .append_pair("debut", &offset.to_string())
            .append_pair("tri", SORT);
        Ok(url)
    }
}

/// Builds the Sirene multi-criteria query. The postcode wins over the city;
/// both are reduced to characters that cannot alter the query syntax.
pub(crate) fn build_query(filter: &LocationFilter, code: Option<&str>) -> Option<String> {
    let location = if let Some(postcode) = filter.postcode.as_deref().and_then(postcode_digits) {
        format!("codePostalEtablissement:{postcode}")
    } else {
        let city: String = filter
            .city
            .as_deref()?
            .chars()
            .filter(|c| *c != '"' && *c != '\'')
            .collect();
        let city = city.trim();
        if city.is_empty() || city.chars().count() > MAX_CITY_CHARS {
            return None;
        }
        format!("libelleCommuneEtablissement:\"{city}\"")
    };

    match code {
        Some(code) => Some(format!("{location} AND activitePrincipaleUniteLegale:{code}")),
        None => Some(location),
    }
}

#[async_trait]
impl RegistryAdapter for SireneClient {
    fn source(&self) -> RecordSource {
        RecordSource::Sirene
    }

    async fn query_code(
        &self,
        filter: &LocationFilter,
        code: Option<&str>,
        _budget: &DetailBudget,
    ) -> Result<Vec<CompanyRecord>, RegistryError> {
        let query = build_query(filter, code).ok_or(RegistryError::MissingLocation {
            registry: REGISTRY,
            field: "postcode or city",
        })?;

        let mut records = Vec::new();
        let mut offset = 0;
        for _ in 0..self.max_pages {
            let url = self.siret_url(&query, offset)?;
            let request = self.client.get(url).header(API_KEY_HEADER, &self.api_key);
            let context = format!("siret(q={query}, debut={offset})");
            let body: SiretPage = match send_json(REGISTRY, request, &context).await {
                Ok(body) => body,
                // Sirene answers 404 when nothing matches the query.
                Err(RegistryError::BadRequest { status: 404, .. }) => break,
                Err(e) => return Err(e),
            };

            let fetched = body.etablissements.len();
            records.extend(body.etablissements.into_iter().filter_map(normalize_establishment));

            let total = body.header.and_then(|h| h.total).unwrap_or(0);
            offset = offset.saturating_add(PAGE_SIZE);
            if fetched == 0 || u64::from(offset) >= total {
                break;
            }
        }

        tracing::debug!(
            source = REGISTRY,
            code = ?code,
            count = records.len(),
            "sirene sub-query completed"
        );
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct SiretPage {
    header: Option<PageHeader>,
    #[serde(default)]
    etablissements: Vec<Establishment>,
}

#[derive(Debug, Deserialize)]
struct PageHeader {
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Establishment {
    siren: Option<String>,
    siret: Option<String>,
    date_creation_etablissement: Option<String>,
    tranche_effectifs_etablissement: Option<String>,
    #[serde(default)]
    unite_legale: LegalUnit,
    #[serde(default)]
    adresse_etablissement: Address,
    #[serde(default)]
    periodes_etablissement: Vec<Period>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegalUnit {
    denomination_unite_legale: Option<String>,
    prenom1_unite_legale: Option<String>,
    nom_unite_legale: Option<String>,
    activite_principale_unite_legale: Option<String>,
    categorie_juridique_unite_legale: Option<String>,
    date_creation_unite_legale: Option<String>,
    etat_administratif_unite_legale: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Address {
    numero_voie_etablissement: Option<String>,
    type_voie_etablissement: Option<String>,
    libelle_voie_etablissement: Option<String>,
    code_postal_etablissement: Option<String>,
    libelle_commune_etablissement: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Period {
    etat_administratif_etablissement: Option<String>,
}

fn normalize_establishment(etab: Establishment) -> Option<CompanyRecord> {
    let unit = etab.unite_legale;
    let addr = etab.adresse_etablissement;
    let mut record =
        CompanyRecord::keyed(etab.siren.as_deref(), etab.siret.as_deref(), RecordSource::Sirene)?;

    record.name = clean_value(unit.denomination_unite_legale.as_deref()).or_else(|| {
        person_name(
            unit.prenom1_unite_legale.as_deref(),
            unit.nom_unite_legale.as_deref(),
        )
    });
    record.address = compose_address(&[
        addr.numero_voie_etablissement.as_deref(),
        addr.type_voie_etablissement.as_deref(),
        addr.libelle_voie_etablissement.as_deref(),
        addr.code_postal_etablissement.as_deref(),
        addr.libelle_commune_etablissement.as_deref(),
    ]);
    record.city = clean_value(addr.libelle_commune_etablissement);
    record.postcode = clean_value(addr.code_postal_etablissement);
    record.sector_code = clean_value(unit.activite_principale_unite_legale);
    record.legal_form = clean_value(unit.categorie_juridique_unite_legale);
    record.employee_range = clean_value(etab.tranche_effectifs_etablissement);
    record.creation_date = parse_date(unit.date_creation_unite_legale.as_deref())
        .or_else(|| parse_date(etab.date_creation_etablissement.as_deref()));
    record.administrative_state = etab
        .periodes_etablissement
        .first()
        .and_then(|p| clean_value(p.etat_administratif_etablissement.as_deref()))
        .or_else(|| clean_value(unit.etat_administratif_unite_legale));

    Some(record)
}
