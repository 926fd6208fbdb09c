//! Integration tests for `PappersClient` using wiremock HTTP mocks.

use std::time::Duration;

use ttb_core::ErrorKind;
use ttb_registry::{DetailBudget, LocationFilter, PappersClient, PappersLimits, RegistryAdapter};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn paris() -> LocationFilter {
    LocationFilter {
        postcode: Some("75011".into()),
        city: Some("Paris".into()),
        center: None,
    }
}

fn limits(max_detail_calls: usize) -> PappersLimits {
    PappersLimits {
        max_pages: 1,
        max_detail_calls,
        detail_delay: Duration::ZERO,
    }
}

fn summary(siren: &str) -> serde_json::Value {
    serde_json::json!({
        "siren": siren,
        "nom_entreprise": format!("SOCIETE {siren}"),
        "code_naf": "62.01Z",
        "siege": {
            "siret": format!("{siren}00015"),
            "adresse_ligne_1": "5 RUE OBERKAMPF",
            "code_postal": "75011",
            "ville": "PARIS"
        }
    })
}

async fn mount_search(server: &MockServer, sirens: &[&str]) {
    let results: Vec<_> = sirens.iter().map(|s| summary(s)).collect();
    Mock::given(method("GET"))
        .and(path("/recherche"))
        .and(query_param("api_token", "tok"))
        .and(query_param("code_postal", "75011"))
        .and(query_param("code_naf", "62.01Z"))
        .and(query_param("par_page", "100"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"resultats": results, "total": sirens.len()})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn details_fill_contact_fields() {
    let server = MockServer::start().await;
    mount_search(&server, &["111111111"]).await;

    Mock::given(method("GET"))
        .and(path("/entreprise"))
        .and(query_param("siren", "111111111"))
        .and(query_param("champs_supplementaires", "contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "siren": "111111111",
            "nom_entreprise": "SOCIETE 111111111",
            "telephone": "0143000000",
            "site_web": "https://societe.example",
            "contacts": [{"email": "bonjour@societe.example"}],
            "siege": {
                "code_postal": "75011",
                "ville": "PARIS",
                "latitude": 48.86,
                "longitude": 2.38
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = PappersClient::with_base_url("tok", 5, "test", limits(50), &server.uri()).unwrap();
    let budget = DetailBudget::new(client.detail_budget());
    let records = client.query_code(&paris(), Some("62.01Z"), &budget).await.unwrap();

    assert_eq!(records.len(), 1);
    let rec = &records[0];
    assert_eq!(rec.email(), Some("bonjour@societe.example"));
    assert_eq!(rec.phone(), Some("0143000000"));
    assert!(rec.coordinates.is_some());
    // filled from the summary
    assert_eq!(rec.establishment_id.as_deref(), Some("11111111100015"));
    assert_eq!(budget.remaining(), 49);
}

#[tokio::test]
async fn detail_budget_caps_detail_calls() {
    let server = MockServer::start().await;
    mount_search(&server, &["111111111", "222222222", "333333333"]).await;

    Mock::given(method("GET"))
        .and(path("/entreprise"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "siren": "111111111",
            "email": "a@b.fr"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = PappersClient::with_base_url("tok", 5, "test", limits(2), &server.uri()).unwrap();
    let budget = DetailBudget::new(client.detail_budget());
    let records = client.query_code(&paris(), Some("62.01Z"), &budget).await.unwrap();

    // every summary is kept, only the first two were detailed
    assert_eq!(records.len(), 3);
    assert!(records[2].contact.is_none());
}

#[tokio::test]
async fn quota_on_detail_keeps_summaries_and_stops_details() {
    let server = MockServer::start().await;
    mount_search(&server, &["111111111", "222222222"]).await;

    Mock::given(method("GET"))
        .and(path("/entreprise"))
        .respond_with(ResponseTemplate::new(402))
        .expect(1)
        .mount(&server)
        .await;

    let client = PappersClient::with_base_url("tok", 5, "test", limits(50), &server.uri()).unwrap();
    let budget = DetailBudget::new(client.detail_budget());
    let records = client.query_code(&paris(), Some("62.01Z"), &budget).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(budget.remaining(), 0);
}

#[tokio::test]
async fn search_status_codes_map_to_taxonomy() {
    for (status, kind) in [
        (401_u16, ErrorKind::RegistryAuthError),
        (402, ErrorKind::RegistryQuotaError),
        (429, ErrorKind::RegistryThrottled),
        (400, ErrorKind::RegistryBadRequest),
        (500, ErrorKind::RegistryUnavailable),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/recherche"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let client =
            PappersClient::with_base_url("tok", 5, "test", limits(0), &server.uri()).unwrap();
        let err = client
            .query_code(&paris(), None, &DetailBudget::new(0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), kind, "status {status}");
    }
}

#[tokio::test]
async fn missing_postcode_is_bad_request() {
    let client =
        PappersClient::with_base_url("tok", 5, "test", limits(0), "http://127.0.0.1:9").unwrap();
    let filter = LocationFilter {
        city: Some("Paris".into()),
        ..LocationFilter::default()
    };
    let err = client
        .query_code(&filter, None, &DetailBudget::new(0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RegistryBadRequest);
}
