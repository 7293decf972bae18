use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use futures::future::join_all;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use gatepass_server::routes::{create_routes, AppState};
use gatepass_server::store::MemoryStore;

fn app() -> Router {
    create_routes(AppState::new(Arc::new(MemoryStore::new())), &[])
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    actor: (Uuid, &str),
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-actor-id", actor.0.to_string())
        .header("x-actor-role", actor.1);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

struct Fixture {
    app: Router,
    host: Uuid,
    staff: Uuid,
    event_id: String,
}

impl Fixture {
    /// A published event with capacity 100 and one assigned staff member.
    async fn new() -> Self {
        let app = app();
        let host = Uuid::new_v4();
        let staff = Uuid::new_v4();
        let start = Utc::now() + Duration::hours(2);

        let (status, created) = send(
            &app,
            "POST",
            "/api/events",
            (host, "host"),
            Some(json!({
                "title": "Harbour Lights",
                "location": "Pier 3",
                "startTime": start,
                "endTime": start + Duration::hours(3),
                "capacity": 100,
                "pricing": { "kind": "paid", "amount": "25.00", "currency": "EUR" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        assert_eq!(created["data"]["status"], "draft");
        let event_id = created["data"]["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/events/{event_id}/publish"),
            (host, "host"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, staffed) = send(
            &app,
            "PUT",
            &format!("/api/events/{event_id}/staff"),
            (host, "host"),
            Some(json!({ "staff": [staff] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(staffed["data"]["assignedStaff"][0], staff.to_string());

        Self {
            app,
            host,
            staff,
            event_id,
        }
    }

    async fn book(&self, attendee: Uuid) -> String {
        let (status, booked) = send(
            &self.app,
            "POST",
            &format!("/api/events/{}/tickets", self.event_id),
            (attendee, "attendee"),
            Some(json!({ "quantity": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{booked}");
        booked["data"][0]["ticketNumber"].as_str().unwrap().to_string()
    }

    async fn scan(&self, actor: (Uuid, &str), ticket_number: &str) -> (StatusCode, Value) {
        send(
            &self.app,
            "POST",
            "/api/scan",
            actor,
            Some(json!({ "eventId": self.event_id, "ticketNumber": ticket_number })),
        )
        .await
    }
}

#[tokio::test]
async fn test_staff_checks_in_once_then_sees_duplicate() {
    let fx = Fixture::new().await;
    let attendee = Uuid::new_v4();

    let (status, _) = send(
        &fx.app,
        "POST",
        "/api/users",
        (attendee, "attendee"),
        Some(json!({ "name": "Grace Hopper", "email": "grace@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let number = fx.book(attendee).await;

    let (status, body) = fx.scan((fx.staff, "staff"), &number).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["ticket"]["checkInStatus"]["isCheckedIn"], true);
    assert_eq!(
        body["data"]["ticket"]["checkInStatus"]["scannedBy"],
        fx.staff.to_string()
    );
    assert_eq!(body["data"]["attendee"]["name"], "Grace Hopper");
    let checked_in_at = body["data"]["ticket"]["checkInStatus"]["checkInTime"].clone();

    let (status, body) = fx.scan((fx.staff, "staff"), &number).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "ALREADY_CHECKED_IN");
    assert_eq!(body["error"]["details"]["checkedInAt"], checked_in_at);
}

#[tokio::test]
async fn test_rejections_are_distinguishable() {
    let fx = Fixture::new().await;
    let number = fx.book(Uuid::new_v4()).await;

    let (status, body) = fx.scan((Uuid::new_v4(), "staff"), &number).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "SCAN_UNAUTHORIZED");

    let (status, body) = fx.scan((Uuid::new_v4(), "attendee"), &number).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "SCAN_UNAUTHORIZED");

    let (status, body) = fx.scan((fx.staff, "staff"), "TCK-DOESNOTEXIST").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "TICKET_NOT_FOUND");

    // None of the rejections consumed the ticket.
    let (status, body) = fx.scan((fx.host, "host"), &number).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn test_ticket_for_another_event_is_wrong_event() {
    let fx = Fixture::new().await;
    let number = fx.book(Uuid::new_v4()).await;

    let start = Utc::now() + Duration::hours(5);
    let (_, second) = send(
        &fx.app,
        "POST",
        "/api/events",
        (fx.host, "host"),
        Some(json!({
            "title": "Second night",
            "location": "Pier 3",
            "startTime": start,
            "endTime": start + Duration::hours(2),
            "capacity": 10
        })),
    )
    .await;
    let second_id = second["data"]["id"].as_str().unwrap().to_string();
    send(
        &fx.app,
        "POST",
        &format!("/api/events/{second_id}/publish"),
        (fx.host, "host"),
        None,
    )
    .await;

    let (status, body) = send(
        &fx.app,
        "POST",
        "/api/scan",
        (fx.host, "host"),
        Some(json!({ "eventId": second_id, "ticketNumber": number })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "WRONG_EVENT");
    assert!(body.get("data").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_scans_admit_exactly_once() {
    let fx = Fixture::new().await;
    let number = fx.book(Uuid::new_v4()).await;

    let scans = (0..12).map(|i| {
        let app = fx.app.clone();
        let body = json!({ "eventId": fx.event_id, "ticketNumber": number });
        let actor = if i % 2 == 0 {
            (fx.staff, "staff")
        } else {
            (fx.host, "host")
        };
        tokio::spawn(async move { send(&app, "POST", "/api/scan", actor, Some(body)).await })
    });
    let results: Vec<(StatusCode, Value)> = join_all(scans)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let accepted = results.iter().filter(|(s, _)| *s == StatusCode::OK).count();
    let duplicates = results
        .iter()
        .filter(|(_, b)| b["error"]["code"] == "ALREADY_CHECKED_IN")
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(duplicates, 11);

    let (status, stats) = send(
        &fx.app,
        "GET",
        &format!("/api/events/{}/checkins", fx.event_id),
        (fx.staff, "staff"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["data"]["ticketsSold"], 1);
    assert_eq!(stats["data"]["checkedIn"], 1);
    assert_eq!(stats["data"]["scanOutcomes"]["accepted"], 1);
    assert_eq!(stats["data"]["scanOutcomes"]["rejected_already_used"], 11);

    let (status, log) = send(
        &fx.app,
        "GET",
        &format!("/api/events/{}/scans?limit=5", fx.event_id),
        (fx.host, "host"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(log["data"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_scanned_by_must_match_actor() {
    let fx = Fixture::new().await;
    let number = fx.book(Uuid::new_v4()).await;

    let (status, body) = send(
        &fx.app,
        "POST",
        "/api/scan",
        (fx.staff, "staff"),
        Some(json!({
            "eventId": fx.event_id,
            "ticketNumber": number,
            "scannedBy": fx.host
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_cancelled_ticket_scan_and_capacity_release() {
    let fx = Fixture::new().await;
    let attendee = Uuid::new_v4();
    let number = fx.book(attendee).await;

    let (status, _) = send(
        &fx.app,
        "POST",
        &format!("/api/tickets/{number}/cancel"),
        (attendee, "attendee"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = fx.scan((fx.staff, "staff"), &number).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"]["code"], "TICKET_CANCELLED");

    let (_, event) = send(
        &fx.app,
        "GET",
        &format!("/api/events/{}", fx.event_id),
        (attendee, "attendee"),
        None,
    )
    .await;
    assert_eq!(event["data"]["ticketsSold"], 0);
}
