//! Integration tests for the operational endpoints and the relay surface
//! reachable over plain HTTP.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use anyhow::Result;
use bytes::Bytes;
use facility_test_utils::{TestFacilityServer, TEST_RELAY_KEY};
use serde_json::Value;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../migrations")]
async fn test_health_returns_ok(pool: PgPool) -> Result<()> {
    let server = TestFacilityServer::spawn(pool).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_ready_with_database(pool: PgPool) -> Result<()> {
    let server = TestFacilityServer::spawn(pool).await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["database"], "healthy");
    assert!(body.get("error").is_none());

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_ready_without_database(pool: PgPool) -> Result<()> {
    let server = TestFacilityServer::spawn(pool.clone()).await?;
    pool.close().await;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;
    assert_eq!(response.status(), 503);

    let body: Value = response.json().await?;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["database"], "unhealthy");
    assert_eq!(body["error"], "Service dependencies unavailable");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_metrics_endpoint(pool: PgPool) -> Result<()> {
    let server = TestFacilityServer::spawn(pool).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_relay_health_reflects_hub(pool: PgPool) -> Result<()> {
    let server = TestFacilityServer::spawn(pool).await?;
    let url = format!("{}/relay/health", server.url());

    let body: Value = reqwest::get(&url).await?.json().await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["viewers"], 0);
    assert_eq!(body["relayConnected"], false);
    assert_eq!(body["hasFrame"], false);

    let viewer = server.relay().subscribe().await;
    let producer = server.relay().attach_producer().await;
    server
        .relay()
        .publish_frame(producer.id, Bytes::from_static(b"\xff\xd8jpeg"))
        .await;

    let body: Value = reqwest::get(&url).await?.json().await?;
    assert_eq!(body["viewers"], 1);
    assert_eq!(body["relayConnected"], true);
    assert_eq!(body["hasFrame"], true);

    server.relay().detach_producer(producer.id).await;
    server.relay().unsubscribe(viewer.id).await;

    let body: Value = reqwest::get(&url).await?.json().await?;
    assert_eq!(body["viewers"], 0);
    assert_eq!(body["relayConnected"], false);
    assert_eq!(body["hasFrame"], false);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_relay_producer_rejects_bad_key(pool: PgPool) -> Result<()> {
    let server = TestFacilityServer::spawn(pool).await?;
    let client = reqwest::Client::new();

    for query in ["", "?key=", "?key=wrong"] {
        let response = client
            .get(format!("{}/ws/relay{}", server.url(), query))
            .send()
            .await?;
        assert_eq!(response.status(), 401, "query {query:?}");
    }

    assert!(!server.relay().stats().await.relay_connected);

    // Right key, but no upgrade request
    let response = client
        .get(format!("{}/ws/relay?key={}", server.url(), TEST_RELAY_KEY))
        .send()
        .await?;
    assert_eq!(response.status(), 400);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_cors_preflight(pool: PgPool) -> Result<()> {
    let server = TestFacilityServer::spawn(pool).await?;

    let response = reqwest::Client::new()
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/api/bookings", server.url()),
        )
        .header("origin", "http://dashboard.local")
        .header("access-control-request-method", "DELETE")
        .send()
        .await?;

    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );

    Ok(())
}
