//! Client for the Pappers commercial registry (`api.pappers.fr/v2`).
//!
//! Search results carry no contact data, so each entity is re-fetched from
//! the detail endpoint while the request's [`DetailBudget`] lasts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use ttb_core::{clean_value, compose_address, CompanyRecord, Contact, RecordSource};

use crate::adapter::{DetailBudget, LocationFilter, RegistryAdapter};
use crate::error::RegistryError;
use crate::http::{build_client, parse_base_url, send_json};
use crate::normalize::{bounded_executives, executive, parse_coordinates, parse_date};

const DEFAULT_BASE_URL: &str = "https://api.pappers.fr/v2";
const REGISTRY: &str = "pappers";
const PER_PAGE: u32 = 100;

/// Tunables for [`PappersClient`].
#[derive(Debug, Clone, Copy)]
pub struct PappersLimits {
    pub max_pages: u32,
    /// Detail calls allowed per search, across all sub-queries.
    pub max_detail_calls: usize,
    pub detail_delay: Duration,
}

impl Default for PappersLimits {
    fn default() -> Self {
        Self {
            max_pages: 1,
            max_detail_calls: 50,
            detail_delay: Duration::from_millis(100),
        }
    }
}

pub struct PappersClient {
    client: Client,
    api_token: String,
    base_url: Url,
    limits: PappersLimits,
}

impl PappersClient {
    /// # Errors
    ///
    /// Returns [`RegistryError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        api_token: &str,
        timeout_secs: u64,
        user_agent: &str,
        limits: PappersLimits,
    ) -> Result<Self, RegistryError> {
        Self::with_base_url(api_token, timeout_secs, user_agent, limits, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`RegistryError::InvalidBaseUrl`] for a malformed `base_url`.
    pub fn with_base_url(
        api_token: &str,
        timeout_secs: u64,
        user_agent: &str,
        limits: PappersLimits,
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
            api_token: api_token.to_owned(),
            base_url,
            limits,
        })
    }

    /// Builds an endpoint URL. The token goes first so it never depends on
    /// caller-supplied ordering.
    fn build_url(&self, endpoint: &str, extra: &[(&str, &str)]) -> Result<Url, RegistryError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| RegistryError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api_token", &self.api_token);
            for (k, v) in extra {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn search_page(
        &self,
        postcode: &str,
        code: Option<&str>,
        page: u32,
    ) -> Result<SearchPage, RegistryError> {
        let page_str = page.to_string();
        let per_page = PER_PAGE.to_string();
        let mut params = vec![
            ("code_postal", postcode),
            ("par_page", per_page.as_str()),
            ("page", page_str.as_str()),
        ];
        if let Some(code) = code {
            params.push(("code_naf", code));
        }
        let url = self.build_url("recherche", &params)?;
        let context = format!("recherche(code_postal={postcode}, code={code:?}, page={page})");
        send_json(REGISTRY, self.client.get(url), &context).await
    }

    async fn fetch_detail(&self, siren: &str) -> Result<PappersCompany, RegistryError> {
        let url = self.build_url(
            "entreprise",
            &[("siren", siren), ("champs_supplementaires", "contacts")],
        )?;
        send_json(REGISTRY, self.client.get(url), &format!("entreprise(siren={siren})")).await
    }

    /// Upgrades summary records with detail data while the budget lasts.
    ///
    /// A failed detail call keeps the summary record. Auth and quota
    /// failures spend the rest of the budget so no further calls are made.
    async fn attach_details(
        &self,
        summaries: Vec<CompanyRecord>,
        budget: &DetailBudget,
    ) -> Vec<CompanyRecord> {
        let mut out = Vec::with_capacity(summaries.len());
        let mut first_call = true;
        for summary in summaries {
            if !budget.try_take() {
                out.push(summary);
                continue;
            }
            if !first_call && !self.limits.detail_delay.is_zero() {
                tokio::time::sleep(self.limits.detail_delay).await;
            }
            first_call = false;

            match self.fetch_detail(&summary.registry_id).await {
                Ok(mut detail) => {
                    detail
                        .siren
                        .get_or_insert_with(|| summary.registry_id.clone());
                    match normalize_company(detail) {
                        Some(mut record) => {
                            record.registry_id.clone_from(&summary.registry_id);
                            record.absorb(&summary);
                            out.push(record);
                        }
                        None => out.push(summary),
                    }
                }
                Err(e) => {
                    if e.exhausts_budget() {
                        budget.exhaust();
                    }
                    tracing::warn!(
                        source = REGISTRY,
                        siren = %summary.registry_id,
                        error = %e,
                        "detail lookup failed, keeping summary record"
                    );
                    out.push(summary);
                }
            }
        }
        out
    }
}

#[async_trait]
impl RegistryAdapter for PappersClient {
    fn source(&self) -> RecordSource {
        RecordSource::Pappers
    }

    fn detail_budget(&self) -> usize {
        self.limits.max_detail_calls
    }

    async fn query_code(
        &self,
        filter: &LocationFilter,
        code: Option<&str>,
        budget: &DetailBudget,
    ) -> Result<Vec<CompanyRecord>, RegistryError> {
        let postcode = filter.postcode.as_deref().ok_or(RegistryError::MissingLocation {
            registry: REGISTRY,
            field: "postcode",
        })?;

        let mut summaries = Vec::new();
        let mut page = 1;
        loop {
            let body = self.search_page(postcode, code, page).await?;
            let fetched = body.resultats.len();
            summaries.extend(body.resultats.into_iter().filter_map(normalize_company));

            let seen = u64::from(page) * u64::from(PER_PAGE);
            let more = body.total.is_some_and(|total| total > seen) && fetched > 0;
            if !more || page >= self.limits.max_pages {
                break;
            }
            page += 1;
        }

        let records = self.attach_details(summaries, budget).await;
        tracing::debug!(
            source = REGISTRY,
            code = ?code,
            count = records.len(),
            detail_budget_left = budget.remaining(),
            "pappers sub-query completed"
        );
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    resultats: Vec<PappersCompany>,
    total: Option<u64>,
}

/// Shape shared by search results and the detail endpoint; detail responses
/// simply fill more of it.
#[derive(Debug, Default, Deserialize)]
struct PappersCompany {
    siren: Option<String>,
    nom_entreprise: Option<String>,
    denomination: Option<String>,
    code_naf: Option<String>,
    libelle_code_naf: Option<String>,
    forme_juridique: Option<String>,
    date_creation: Option<String>,
    effectif: Option<String>,
    tranche_effectif: Option<String>,
    entreprise_cessee: Option<bool>,
    email: Option<String>,
    telephone: Option<String>,
    site_web: Option<String>,
    #[serde(default)]
    contacts: Vec<PappersContact>,
    #[serde(default)]
    representants: Vec<Representative>,
    #[serde(default)]
    siege: Option<PappersOffice>,
}

#[derive(Debug, Default, Deserialize)]
struct PappersOffice {
    siret: Option<String>,
    numero_voie: Option<Value>,
    type_voie: Option<String>,
    libelle_voie: Option<String>,
    adresse_ligne_1: Option<String>,
    code_postal: Option<String>,
    ville: Option<String>,
    latitude: Option<Value>,
    longitude: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PappersContact {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Representative {
    nom: Option<String>,
    prenom: Option<String>,
    prenom_usuel: Option<String>,
    qualite: Option<String>,
    denomination: Option<String>,
}

fn normalize_company(company: PappersCompany) -> Option<CompanyRecord> {
    let siege = company.siege.unwrap_or_default();
    let mut record = CompanyRecord::keyed(
        company.siren.as_deref(),
        siege.siret.as_deref(),
        RecordSource::Pappers,
    )?;

    let number = crate::normalize::scalar_to_string(siege.numero_voie.as_ref());
    let street = compose_address(&[
        number.as_deref(),
        siege.type_voie.as_deref(),
        siege.libelle_voie.as_deref(),
    ])
    .or_else(|| clean_value(siege.adresse_ligne_1.as_deref()));
    record.address = street.and_then(|street| {
        compose_address(&[
            Some(street.as_str()),
            siege.code_postal.as_deref(),
            siege.ville.as_deref(),
        ])
    });

    record.name = clean_value(company.nom_entreprise).or_else(|| clean_value(company.denomination));
    record.city = clean_value(siege.ville);
    record.postcode = clean_value(siege.code_postal);
    record.sector_code = clean_value(company.code_naf);
    record.sector_label = clean_value(company.libelle_code_naf);
    record.coordinates = parse_coordinates(siege.latitude.as_ref(), siege.longitude.as_ref(), None);
    record.legal_form = clean_value(company.forme_juridique);
    record.employee_range =
        clean_value(company.effectif).or_else(|| clean_value(company.tranche_effectif));
    record.creation_date = parse_date(company.date_creation.as_deref());
    record.administrative_state = company
        .entreprise_cessee
        .map(|closed| if closed { "C" } else { "A" }.to_owned());

    let email = clean_value(company.email).or_else(|| {
        company
            .contacts
            .iter()
            .find_map(|c| clean_value(c.email.as_deref()))
    });
    let contact = Contact {
        email: email.filter(|e| e.contains('@')),
        phone: clean_value(company.telephone),
        website: clean_value(company.site_web),
    };
    record.contact = (!contact.is_empty()).then_some(contact);

    record.executives = bounded_executives(company.representants.iter().filter_map(|r| {
        let last = r.nom.as_deref().or(r.denomination.as_deref());
        let first = r.prenom_usuel.as_deref().or(r.prenom.as_deref());
        executive(last, first, r.qualite.as_deref())
    }));

    Some(record)
}
