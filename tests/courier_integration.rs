//! End-to-end cycles over scripted HTTP transports.
//!
//! These tests verify the whole path from a stored account config through
//! the adapter's request shaping to classified records, with the transport
//! as the only fake.

use przesylka_core::{CanonicalStatus, Classifier, Courier, HttpMethod, HttpResponse};
use przesylka_engine::{AccountConfig, AccountId, Reconciler};
use przesylka_tests::{Arc, ScriptedHttpClient};
use serde_json::json;

fn account(courier: Courier) -> AccountConfig {
    let mut config = AccountConfig::new(courier);
    config.access_token = Some(String::from("stored-access"));
    config.refresh_token = Some(String::from("stored-refresh"));
    config
}

fn reconciler_for(
    config: &AccountConfig,
    transport: Arc<ScriptedHttpClient>,
) -> Reconciler {
    let client = config.build_client(transport).expect("client builds");
    Reconciler::new(AccountId::new(), client, Arc::new(Classifier::new()))
}

// =============================================================================
// InPost
// =============================================================================

#[tokio::test]
async fn inpost_cycle_polls_the_parcel_endpoint_with_a_bearer_token() {
    // Given: A stored InPost account and a one-parcel response
    let transport = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(
        json!({"parcels": [{"shipmentNumber": "660123", "status": "READY_TO_PICKUP"}]})
            .to_string(),
    ))]));
    let mut reconciler = reconciler_for(&account(Courier::Inpost), Arc::clone(&transport));

    // When: One cycle runs
    let outcome = reconciler.run_cycle().await.expect("cycle succeeds");

    // Then: The adapter issued a single authenticated GET
    let request = transport.request(0);
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.url, "https://api-inpost.pl/v1/parcels");
    assert_eq!(
        request.headers.get("authorization").map(String::as_str),
        Some("Bearer stored-access")
    );

    // And: The parcel classifies off the catalogued code
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].tracking_id, "660123");
    assert_eq!(outcome.records[0].status, CanonicalStatus::WaitingForPickup);
}

#[tokio::test]
async fn inpost_rejection_refreshes_through_the_authenticate_endpoint() {
    // Given: A 401 on the first poll, a token grant, then a good poll
    let transport = Arc::new(ScriptedHttpClient::new(vec![
        Ok(HttpResponse::with_status(401, "")),
        Ok(HttpResponse::ok_json(
            json!({"authToken": "fresh-access", "refreshToken": "fresh-refresh"}).to_string(),
        )),
        Ok(HttpResponse::ok_json(json!({"parcels": []}).to_string())),
    ]));
    let mut reconciler = reconciler_for(&account(Courier::Inpost), Arc::clone(&transport));

    // When: One cycle runs
    let outcome = reconciler.run_cycle().await.expect("cycle succeeds");

    // Then: Refresh went to the authenticate endpoint with the stored token
    assert_eq!(transport.request_count(), 3);
    let refresh = transport.request(1);
    assert_eq!(refresh.url, "https://api-inpost.pl/v1/authenticate");
    assert!(refresh
        .body
        .as_deref()
        .is_some_and(|body| body.contains("stored-refresh")));

    // And: The retry carried the fresh token, which is handed out to persist
    let retry = transport.request(2);
    assert_eq!(
        retry.headers.get("authorization").map(String::as_str),
        Some("Bearer fresh-access")
    );
    let persisted = outcome.persist_session.expect("persistence requested");
    assert_eq!(persisted.access_token.as_deref(), Some("fresh-access"));
    assert_eq!(persisted.refresh_token.as_deref(), Some("fresh-refresh"));
}

// =============================================================================
// DPD
// =============================================================================

#[tokio::test]
async fn dpd_cycle_posts_the_receiver_package_query_with_mobile_headers() {
    // Given: A stored DPD account and a one-package response
    let transport = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(
        json!({"packages": [{"waybill": "D111", "main_status": {"status": "HANDED_OVER_FOR_DELIVERY"}}]})
            .to_string(),
    ))]));
    let mut reconciler = reconciler_for(&account(Courier::Dpd), Arc::clone(&transport));

    // When: One cycle runs
    let outcome = reconciler.run_cycle().await.expect("cycle succeeds");

    // Then: The request mirrors the mobile app's package query
    let request = transport.request(0);
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(
        request.url,
        "https://mobapp.dpd.com.pl/mdupackageservices/api/v1/packages?userContext=RECEIVER"
    );
    assert_eq!(
        request.headers.get("x-mobile-platform").map(String::as_str),
        Some("android")
    );
    assert_eq!(request.body.as_deref(), Some(r#"{"alias":null,"sent":null}"#));

    // And: The nested status classifies
    assert_eq!(
        outcome.records[0].status,
        CanonicalStatus::HandedOutForDelivery
    );
}

// =============================================================================
// DHL
// =============================================================================

#[tokio::test]
async fn dhl_cycle_sends_bearer_and_session_cookies_together() {
    // Given: A stored DHL account with session cookies
    let mut config = account(Courier::Dhl);
    config
        .cookies
        .insert(String::from("SESSION"), String::from("abc"));
    let transport = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(
        json!({"shipments": [{"shipmentNumber": "DH9", "status": "DELIVEREDTOLOCKER"}]})
            .to_string(),
    ))]));
    let mut reconciler = reconciler_for(&config, Arc::clone(&transport));

    // When: One cycle runs
    let outcome = reconciler.run_cycle().await.expect("cycle succeeds");

    // Then: Both credential channels travel on the same request
    let request = transport.request(0);
    assert_eq!(request.url, "https://moj.dhlparcel.pl/api/shipments");
    assert_eq!(
        request.headers.get("authorization").map(String::as_str),
        Some("Bearer stored-access")
    );
    assert_eq!(
        request.headers.get("cookie").map(String::as_str),
        Some("SESSION=abc")
    );

    // And: A locker delivery is waiting for pickup, not delivered
    assert_eq!(outcome.records[0].status, CanonicalStatus::WaitingForPickup);
}

// =============================================================================
// Pocztex
// =============================================================================

#[tokio::test]
async fn pocztex_cycle_enriches_each_summary_through_the_detail_endpoint() {
    // Given: A one-parcel list whose summary lacks the delivery phase
    let transport = Arc::new(ScriptedHttpClient::new(vec![
        Ok(HttpResponse::ok_json(
            json!([{"id": 42, "trackingId": "PX900", "status": "NADANA"}]).to_string(),
        )),
        Ok(HttpResponse::ok_json(
            json!({"id": 42, "status": "W DORĘCZENIU", "recipientName": "Jan"}).to_string(),
        )),
    ]));
    let mut reconciler = reconciler_for(&account(Courier::Pocztex), Arc::clone(&transport));

    // When: One cycle runs
    let outcome = reconciler.run_cycle().await.expect("cycle succeeds");

    // Then: The detail endpoint was keyed by the internal id
    assert_eq!(transport.request_count(), 2);
    assert_eq!(
        transport.request(0).url,
        "https://mobile-api.pocztex.pl/api/parcels"
    );
    assert_eq!(
        transport.request(1).url,
        "https://mobile-api.pocztex.pl/api/parcels/42"
    );

    // And: The record classifies off the enriched status but keeps the
    // tracking number as its identity
    let record = &outcome.records[0];
    assert_eq!(record.tracking_id, "PX900");
    assert_eq!(record.status, CanonicalStatus::HandedOutForDelivery);
    assert_eq!(
        record.detail.as_ref().and_then(|d| d.get("recipientName")),
        Some(&json!("Jan"))
    );
}
