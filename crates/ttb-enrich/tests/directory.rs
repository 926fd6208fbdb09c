//! Integration tests for `DirectoryClient` and the enrichment pipeline
//! using wiremock HTTP mocks.

use std::sync::Arc;
use std::time::Duration;

use ttb_core::{CompanyRecord, ErrorKind, RecordSource};
use ttb_enrich::{
    DirectoryClient, DirectoryLookup, EnrichmentConfig, EnrichmentError, EnrichmentPipeline,
    ItemOutcome,
};
use wiremock::matchers::{header, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING: &str = r#"
<html><body>
  <div class="bloc-resultat">
    <a class="denomination" href="/pros/12345">Fiche</a>
    <div class="coordonnees"><span class="tel">04 72 10 20 30</span></div>
    <a href="mailto:contact@alpha-lyon.fr">Écrire</a>
    <div class="site-web"><a href="https://alpha-lyon.fr">alpha-lyon.fr</a></div>
  </div>
</body></html>
"#;

fn company(id: &str, name: &str) -> CompanyRecord {
    let mut rec = CompanyRecord::keyed(Some(id), None, RecordSource::RechercheEntreprises)
        .expect("keyed");
    rec.name = Some(name.to_string());
    rec.city = Some("LYON".into());
    rec.address = Some("1 RUE X".into());
    rec
}

fn instant(limit: usize) -> EnrichmentConfig {
    EnrichmentConfig {
        limit,
        delay: Duration::ZERO,
        rate_limit_pause: Duration::ZERO,
    }
}

#[tokio::test]
async fn lookup_extracts_contact_from_result_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/recherche/Alpha%20LYON$"))
        .and(header("accept-language", "fr-FR,fr;q=0.9,en;q=0.8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
        .expect(1)
        .mount(&server)
        .await;

    let client = DirectoryClient::with_base_url(5, &server.uri()).unwrap();
    let contact = client.lookup(&company("111111111", "Alpha")).await.unwrap();

    assert_eq!(contact.phone.as_deref(), Some("0472102030"));
    assert_eq!(contact.email.as_deref(), Some("contact@alpha-lyon.fr"));
    assert_eq!(contact.website.as_deref(), Some("https://alpha-lyon.fr/"));
}

#[tokio::test]
async fn forbidden_maps_to_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = DirectoryClient::with_base_url(5, &server.uri()).unwrap();
    let err = client
        .lookup(&company("111111111", "Alpha"))
        .await
        .unwrap_err();
    assert!(matches!(err, EnrichmentError::Blocked { .. }));
    assert_eq!(err.kind(), ErrorKind::EnrichmentBlocked);
}

#[tokio::test]
async fn too_many_requests_captures_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let client = DirectoryClient::with_base_url(5, &server.uri()).unwrap();
    let err = client.fetch_page("Alpha LYON").await.unwrap_err();
    assert!(matches!(
        err,
        EnrichmentError::RateLimited {
            retry_after_secs: Some(7)
        }
    ));
}

#[tokio::test]
async fn nameless_record_is_not_looked_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
        .expect(0)
        .mount(&server)
        .await;

    let client = DirectoryClient::with_base_url(5, &server.uri()).unwrap();
    let mut rec = company("111111111", "Alpha");
    rec.name = None;
    assert!(client.lookup(&rec).await.unwrap().is_empty());
}

#[tokio::test]
async fn pipeline_stops_at_block_and_never_requests_later_items() {
    let server = MockServer::start().await;
    for name in ["Alpha", "Bravo"] {
        Mock::given(method("GET"))
            .and(path_regex(format!("^/recherche/{name}%20LYON$")))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path_regex(r"^/recherche/Charlie%20LYON$"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    for name in ["Delta", "Echo"] {
        Mock::given(method("GET"))
            .and(path_regex(format!("^/recherche/{name}%20LYON$")))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .expect(0)
            .mount(&server)
            .await;
    }

    let client = DirectoryClient::with_base_url(5, &server.uri()).unwrap();
    let pipeline = EnrichmentPipeline::new(Arc::new(client), instant(20));
    let records = vec![
        company("000000001", "Alpha"),
        company("000000002", "Bravo"),
        company("000000003", "Charlie"),
        company("000000004", "Delta"),
        company("000000005", "Echo"),
    ];

    let report = pipeline.run(&records, None).await;

    assert!(report.blocked());
    assert_eq!(report.attempted(), 3);
    let ids: Vec<&str> = report.enriched.iter().map(|r| r.registry_id.as_str()).collect();
    assert_eq!(ids, vec!["000000001", "000000002"]);
    assert_eq!(report.trace[2].outcome, ItemOutcome::Blocked);
}

#[tokio::test]
async fn pipeline_retries_rate_limited_item_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
        .expect(1)
        .mount(&server)
        .await;

    let client = DirectoryClient::with_base_url(5, &server.uri()).unwrap();
    let pipeline = EnrichmentPipeline::new(Arc::new(client), instant(20));

    let report = pipeline.run(&[company("000000001", "Alpha")], None).await;

    assert_eq!(report.enriched.len(), 1);
    assert_eq!(report.trace[0].attempts, 2);
}
