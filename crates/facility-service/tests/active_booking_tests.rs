//! Integration tests for GET /api/active-booking.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use anyhow::Result;
use facility_test_utils::{service_instant, TestFacilityServer};
use serde_json::{json, Value};
use sqlx::PgPool;

const DAY: &str = "2026-10-18";

async fn book(
    client: &reqwest::Client,
    server: &TestFacilityServer,
    start: &str,
    end: &str,
) -> Result<String> {
    let body: Value = client
        .post(format!("{}/api/bookings", server.url()))
        .json(&json!({
            "room": "Lab",
            "date": DAY,
            "startTime": start,
            "endTime": end,
            "bookerName": "Anan"
        }))
        .send()
        .await?
        .json()
        .await?;
    Ok(body["data"]["bookingId"].as_str().unwrap().to_string())
}

async fn active(
    client: &reqwest::Client,
    server: &TestFacilityServer,
    room: Option<&str>,
) -> Result<(u16, Value)> {
    let mut request = client.get(format!("{}/api/active-booking", server.url()));
    if let Some(room) = room {
        request = request.query(&[("room", room)]);
    }
    let response = request.send().await?;
    let status = response.status().as_u16();
    Ok((status, response.json().await?))
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_active_booking_within_window(pool: PgPool) -> Result<()> {
    let server = TestFacilityServer::spawn_at(pool, service_instant(DAY, "08:00")).await?;
    let client = reqwest::Client::new();
    let id = book(&client, &server, "09:00", "10:00").await?;

    // Early allowance counts as active
    server.clock().set(service_instant(DAY, "08:50"));
    let (status, body) = active(&client, &server, Some("Lab ▼")).await?;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["hasActiveBooking"], true);
    assert_eq!(body["isCheckedIn"], false);
    assert_eq!(body["remainingSeconds"], 70 * 60);
    assert_eq!(body["booking"]["bookingId"], id.as_str());

    client
        .post(format!("{}/api/verify", server.url()))
        .json(&json!({ "qrData": id }))
        .send()
        .await?;

    let (_, body) = active(&client, &server, Some("Lab")).await?;
    assert_eq!(body["isCheckedIn"], true);
    assert!(body["firstCheckIn"].is_string());

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_no_active_booking(pool: PgPool) -> Result<()> {
    let server = TestFacilityServer::spawn_at(pool, service_instant(DAY, "08:00")).await?;
    let client = reqwest::Client::new();
    book(&client, &server, "09:00", "10:00").await?;

    for time in ["08:40", "10:01"] {
        server.clock().set(service_instant(DAY, time));
        let (status, body) = active(&client, &server, Some("Lab")).await?;

        assert_eq!(status, 200);
        assert_eq!(body["hasActiveBooking"], false);
        assert_eq!(body["message"], "No active booking at this time");
        assert!(body.get("booking").is_none());
    }

    // Same time, different room
    server.clock().set(service_instant(DAY, "09:30"));
    let (_, body) = active(&client, &server, Some("Studio")).await?;
    assert_eq!(body["hasActiveBooking"], false);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_back_to_back_bookings_earliest_wins(pool: PgPool) -> Result<()> {
    let server = TestFacilityServer::spawn_at(pool, service_instant(DAY, "08:00")).await?;
    let client = reqwest::Client::new();
    let first = book(&client, &server, "09:00", "10:00").await?;
    book(&client, &server, "10:00", "11:00").await?;

    // 09:50 is inside the first booking and the second's early allowance
    server.clock().set(service_instant(DAY, "09:50"));
    let (_, body) = active(&client, &server, Some("Lab")).await?;
    assert_eq!(body["booking"]["bookingId"], first.as_str());

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_missing_room_returns_400(pool: PgPool) -> Result<()> {
    let server = TestFacilityServer::spawn(pool).await?;
    let client = reqwest::Client::new();

    for room in [None, Some(""), Some("▼")] {
        let (status, body) = active(&client, &server, room).await?;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "Missing room parameter");
    }

    Ok(())
}
