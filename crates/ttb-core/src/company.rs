//! Canonical company record shared by every registry adapter.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Upper bound on executives kept per record.
pub const MAX_EXECUTIVES: usize = 10;

/// Placeholder values registries (or older snapshots of this pipeline) emit
/// instead of leaving a field empty. They are never passed through.
const SENTINELS: &[&str] = &[
    "[ND]",
    "ND",
    "null",
    "Entreprise sans nom",
    "Adresse non disponible",
];

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Returns `None` unless both components are finite and within WGS84 range.
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        valid.then_some(Self { lat, lon })
    }

    /// Parses a pair of decimal strings as returned by most registries.
    #[must_use]
    pub fn parse(lat: &str, lon: &str) -> Option<Self> {
        let lat = lat.trim().parse::<f64>().ok()?;
        let lon = lon.trim().parse::<f64>().ok()?;
        Self::new(lat, lon)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

impl Contact {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none() && self.website.is_none()
    }

    /// Fills the fields missing on `self` from `other`.
    ///
    /// Returns the merged contact and whether any field was gained. Existing
    /// values are never overwritten.
    #[must_use]
    pub fn fill_missing(&self, other: &Contact) -> (Contact, bool) {
        let mut gained = false;
        let mut pick = |mine: &Option<String>, theirs: &Option<String>| match (mine, theirs) {
            (Some(v), _) => Some(v.clone()),
            (None, Some(v)) => {
                gained = true;
                Some(v.clone())
            }
            (None, None) => None,
        };
        let merged = Contact {
            email: pick(&self.email, &other.email),
            phone: pick(&self.phone, &other.phone),
            website: pick(&self.website, &other.website),
        };
        (merged, gained)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executive {
    pub last_name: String,
    pub first_names: Option<String>,
    pub role: Option<String>,
}

/// Which registry produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    RechercheEntreprises,
    Pappers,
    Sirene,
}

impl RecordSource {
    /// Short identifier used in logs and configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RechercheEntreprises => "recherche",
            Self::Pappers => "pappers",
            Self::Sirene => "sirene",
        }
    }

    /// Human-facing attribution for result sets.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::RechercheEntreprises => "API Recherche Entreprises (data.gouv.fr)",
            Self::Pappers => "Pappers",
            Self::Sirene => "INSEE Sirene",
        }
    }
}

/// Normalized business entity, independent of the registry it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// Stable per legal entity; primary dedup key. Never empty.
    pub registry_id: String,
    pub establishment_id: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub sector_code: Option<String>,
    pub sector_label: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub distance_km: Option<f64>,
    pub contact: Option<Contact>,
    pub legal_form: Option<String>,
    pub employee_range: Option<String>,
    pub creation_date: Option<NaiveDate>,
    pub administrative_state: Option<String>,
    pub executives: Vec<Executive>,
    pub source: RecordSource,
}

impl CompanyRecord {
    /// Starts a record keyed on the entity id, falling back to the
    /// establishment id. Returns `None` when neither is usable.
    #[must_use]
    pub fn keyed(
        entity_id: Option<&str>,
        establishment_id: Option<&str>,
        source: RecordSource,
    ) -> Option<Self> {
        let establishment_id = clean_value(establishment_id);
        let registry_id = clean_value(entity_id).or_else(|| establishment_id.clone())?;
        Some(Self {
            registry_id,
            establishment_id,
            name: None,
            address: None,
            city: None,
            postcode: None,
            sector_code: None,
            sector_label: None,
            coordinates: None,
            distance_km: None,
            contact: None,
            legal_form: None,
            employee_range: None,
            creation_date: None,
            administrative_state: None,
            executives: Vec::new(),
            source,
        })
    }

    /// A record is shown only when name, city and address all resolved.
    #[must_use]
    pub fn is_displayable(&self) -> bool {
        self.name.is_some() && self.city.is_some() && self.address.is_some()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.administrative_state.as_deref() == Some("A")
    }

    #[must_use]
    pub fn has_contact(&self) -> bool {
        self.contact.as_ref().is_some_and(|c| !c.is_empty())
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.contact.as_ref().and_then(|c| c.email.as_deref())
    }

    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.contact.as_ref().and_then(|c| c.phone.as_deref())
    }

    #[must_use]
    pub fn website(&self) -> Option<&str> {
        self.contact.as_ref().and_then(|c| c.website.as_deref())
    }

    /// Fills every absent field from `other`; values already present win.
    ///
    /// The registry id and source of `self` are kept as is.
    pub fn absorb(&mut self, other: &CompanyRecord) {
        fn fill<T: Clone>(mine: &mut Option<T>, theirs: &Option<T>) {
            if mine.is_none() {
                mine.clone_from(theirs);
            }
        }
        fill(&mut self.establishment_id, &other.establishment_id);
        fill(&mut self.name, &other.name);
        fill(&mut self.address, &other.address);
        fill(&mut self.city, &other.city);
        fill(&mut self.postcode, &other.postcode);
        fill(&mut self.sector_code, &other.sector_code);
        fill(&mut self.sector_label, &other.sector_label);
        fill(&mut self.coordinates, &other.coordinates);
        fill(&mut self.distance_km, &other.distance_km);
        fill(&mut self.legal_form, &other.legal_form);
        fill(&mut self.employee_range, &other.employee_range);
        fill(&mut self.creation_date, &other.creation_date);
        fill(&mut self.administrative_state, &other.administrative_state);
        if let Some(theirs) = &other.contact {
            let merged = match &self.contact {
                Some(mine) => mine.fill_missing(theirs).0,
                None => theirs.clone(),
            };
            self.contact = (!merged.is_empty()).then_some(merged);
        }
        if self.executives.is_empty() {
            self.executives.clone_from(&other.executives);
        }
    }

    /// Returns a new record with contact fields filled from `found`, or
    /// `None` when `found` adds nothing this record does not already have.
    #[must_use]
    pub fn with_contact(&self, found: &Contact) -> Option<Self> {
        let current = self.contact.clone().unwrap_or_default();
        let (merged, gained) = current.fill_missing(found);
        if !gained {
            return None;
        }
        let mut next = self.clone();
        next.contact = Some(merged);
        Some(next)
    }
}

/// Trims a raw registry value and drops empties and placeholder sentinels.
#[must_use]
pub fn clean_value<S: AsRef<str>>(value: Option<S>) -> Option<String> {
    let value = value?;
    let trimmed = value.as_ref().trim();
    if trimmed.is_empty() || SENTINELS.iter().any(|s| s.eq_ignore_ascii_case(trimmed)) {
        return None;
    }
    Some(trimmed.to_string())
}

/// Joins the usable parts of an address with single spaces.
#[must_use]
pub fn compose_address(parts: &[Option<&str>]) -> Option<String> {
    let joined = parts
        .iter()
        .filter_map(|p| clean_value(*p))
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then_some(joined)
}
