use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, REFERER, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use ttb_core::{CompanyRecord, Contact};

use crate::error::EnrichmentError;
use crate::extract::extract_contact;

pub const DEFAULT_DIRECTORY_URL: &str = "https://www.pagesjaunes.fr/";

/// The directory serves its result pages to browsers only.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Everything `encodeURIComponent` leaves intact stays unescaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Looks up contact details for one company.
///
/// Implementations return an empty [`Contact`] when nothing was found; an
/// `Err` is reserved for transport and access failures.
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    async fn lookup(&self, record: &CompanyRecord) -> Result<Contact, EnrichmentError>;
}

/// Fetches business-directory result pages keyed on `name + city`.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    client: Client,
    base_url: Url,
    host: String,
}

impl DirectoryClient {
    /// # Errors
    ///
    /// Returns [`EnrichmentError::Http`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: u64) -> Result<Self, EnrichmentError> {
        Self::with_base_url(timeout_secs, DEFAULT_DIRECTORY_URL)
    }

    /// Creates a client against an alternate directory host (tests, proxies).
    ///
    /// # Errors
    ///
    /// Returns [`EnrichmentError::InvalidBaseUrl`] for a URL without a host
    /// and [`EnrichmentError::Http`] if the HTTP client cannot be built.
    pub fn with_base_url(timeout_secs: u64, base_url: &str) -> Result<Self, EnrichmentError> {
        let mut normalized = base_url.trim().to_owned();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized).map_err(|e| EnrichmentError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        let host = base_url
            .host_str()
            .ok_or_else(|| EnrichmentError::InvalidBaseUrl {
                url: normalized.clone(),
                reason: "missing host".to_owned(),
            })?
            .to_owned();

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url,
            host,
        })
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Result page URL for a free-text query.
    #[must_use]
    pub fn search_url(&self, query: &str) -> String {
        let encoded = utf8_percent_encode(query.trim(), COMPONENT);
        format!("{}recherche/{encoded}", self.base_url)
    }

    /// Fetches the raw HTML of the result page for `query`.
    ///
    /// # Errors
    ///
    /// - [`EnrichmentError::Blocked`] on HTTP 403.
    /// - [`EnrichmentError::RateLimited`] on HTTP 429.
    /// - [`EnrichmentError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`EnrichmentError::Http`] on network failure or timeout.
    pub async fn fetch_page(&self, query: &str) -> Result<String, EnrichmentError> {
        let url = self.search_url(query);
        let response = self
            .client
            .get(&url)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "fr-FR,fr;q=0.9,en;q=0.8")
            .header(REFERER, self.base_url.as_str())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(EnrichmentError::Blocked { url });
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            return Err(EnrichmentError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            return Err(EnrichmentError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        Ok(response.text().await?)
    }
}

/// `"name city"`, or `None` when the record has no name to search on.
#[must_use]
pub fn lookup_query(record: &CompanyRecord) -> Option<String> {
    let name = record.name.as_deref()?.trim();
    if name.is_empty() {
        return None;
    }
    Some(match record.city.as_deref().map(str::trim) {
        Some(city) if !city.is_empty() => format!("{name} {city}"),
        _ => name.to_owned(),
    })
}

#[async_trait]
impl DirectoryLookup for DirectoryClient {
    async fn lookup(&self, record: &CompanyRecord) -> Result<Contact, EnrichmentError> {
        let Some(query) = lookup_query(record) else {
            return Ok(Contact::default());
        };
        let html = self.fetch_page(&query).await?;
        Ok(extract_contact(&html, &self.host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttb_core::RecordSource;

    #[test]
    fn search_url_encodes_like_a_uri_component() {
        let client = DirectoryClient::new(5).expect("client");
        assert_eq!(
            client.search_url("Boulangerie L'Épi d'Or Lyon"),
            "https://www.pagesjaunes.fr/recherche/Boulangerie%20L'%C3%89pi%20d'Or%20Lyon"
        );
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = DirectoryClient::with_base_url(5, "http://127.0.0.1:9000").expect("client");
        assert_eq!(client.search_url("a"), "http://127.0.0.1:9000/recherche/a");
        assert_eq!(client.host(), "127.0.0.1");
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let err = DirectoryClient::with_base_url(5, "not a url").expect_err("invalid");
        assert!(matches!(err, EnrichmentError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn lookup_query_needs_a_name() {
        let mut rec =
            CompanyRecord::keyed(Some("123456789"), None, RecordSource::Sirene).expect("keyed");
        assert_eq!(lookup_query(&rec), None);
        rec.name = Some("ACME".into());
        assert_eq!(lookup_query(&rec).as_deref(), Some("ACME"));
        rec.city = Some("LYON".into());
        assert_eq!(lookup_query(&rec).as_deref(), Some("ACME LYON"));
    }
}
