//! HTTP attendance client against a local stub service

use pretty_assertions::assert_eq;
use scan_kiosk::{AttendanceApi, HttpAttendanceClient, KioskError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use warp::http::StatusCode;
use warp::{Filter, Reply};

fn record_json(user_id: i64, checked_out: bool) -> Value {
    json!({
        "attendanceId": 100 + user_id,
        "userId": user_id,
        "userName": "Ada",
        "checkInTime": "2024-05-01T07:30:00",
        "checkOutTime": if checked_out { json!("2024-05-01T09:00:00") } else { Value::Null },
        "timeSpentMinutes": if checked_out { json!(90) } else { Value::Null },
    })
}

/// Start the stub service and return its API base URL
fn spawn_service() -> String {
    let search = warp::path!("api" / "dashboard" / "users" / "search")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::header::optional::<String>("authorization"))
        .map(|query: HashMap<String, String>, auth: Option<String>| {
            let authorised = auth.as_deref() == Some("Bearer secret");
            let members = match query.get("query").map(String::as_str) {
                Some("42") if authorised => json!([{ "id": 42, "name": "Ada" }, { "id": 420, "name": "Bob" }]),
                _ => json!([]),
            };
            warp::reply::json(&members)
        });

    let record = warp::path!("api" / "attendance" / "record")
        .and(warp::post())
        .and(warp::body::json())
        .map(|body: Value| {
            let user_id = body["userId"].as_i64().unwrap_or_default();
            match user_id {
                42 => warp::reply::json(&record_json(42, false)).into_response(),
                43 => warp::reply::json(&record_json(43, true)).into_response(),
                400 => warp::reply::with_status(
                    warp::reply::json(&json!({ "message": "Membership expired" })),
                    StatusCode::BAD_REQUEST,
                )
                .into_response(),
                409 => warp::reply::with_status("Already processed", StatusCode::CONFLICT).into_response(),
                _ => warp::reply::with_status(
                    warp::reply::json(&json!({ "error": "Not Found" })),
                    StatusCode::NOT_FOUND,
                )
                .into_response(),
            }
        });

    let (addr, server) = warp::serve(search.or(record)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{addr}/api")
}

fn client(base_url: &str, token: Option<&str>) -> HttpAttendanceClient {
    HttpAttendanceClient::new(base_url, token.map(str::to_string), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_search_returns_first_match_with_token() {
    let base = spawn_service();

    let name = client(&base, Some("secret")).find_member_name(42).await.unwrap();
    assert_eq!(name.as_deref(), Some("Ada"));

    let name = client(&base, None).find_member_name(42).await.unwrap();
    assert_eq!(name, None);
}

#[tokio::test]
async fn test_record_check_in_and_out() {
    let base = spawn_service();
    let api = client(&base, None);

    let record = api.record_attendance(42, "Ada").await.unwrap();
    assert_eq!(record.attendance_id, 142);
    assert!(!record.is_check_out());

    let record = api.record_attendance(43, "Ada").await.unwrap();
    assert!(record.is_check_out());
    assert_eq!(record.time_spent_minutes, Some(90));
}

#[tokio::test]
async fn test_record_failures_use_service_wording() {
    let base = spawn_service();
    let api = client(&base, None);

    let err = api.record_attendance(400, "Ada").await.unwrap_err();
    assert_eq!(err.to_string(), "Membership expired");

    let err = api.record_attendance(409, "Ada").await.unwrap_err();
    assert_eq!(err.to_string(), "Already processed");

    let err = api.record_attendance(7, "User ID: 7").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Attendance failed: User not found. Please verify the ID."
    );
}

#[tokio::test]
async fn test_unreachable_service() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let api = client(&format!("http://{addr}/api"), None);

    let err = api.record_attendance(42, "Ada").await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to process attendance for Ada.");

    let err = api.find_member_name(42).await.unwrap_err();
    assert!(matches!(err, KioskError::Http(_)));
}
