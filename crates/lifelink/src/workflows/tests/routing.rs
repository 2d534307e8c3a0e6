use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::state::workflow_router;

fn request(method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, bearer);
    }
    match body {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&payload).expect("json encodes")))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("route executes");
    let status = response.status();
    let body = if status == StatusCode::NO_CONTENT {
        Value::Null
    } else {
        read_json_body(response).await
    };
    (status, body)
}

fn blood_request_body() -> Value {
    json!({
        "bloodGroup": "O+",
        "pints": 3,
        "preferredDate": "2025-06-01",
        "urgency": "high",
        "amount": "15,000"
    })
}

#[tokio::test]
async fn missing_or_bad_bearer_is_unauthorized() {
    let harness = Harness::new();
    let router = workflow_router(harness.state.clone());

    let (status, body) = send(
        &router,
        request(Method::GET, "/api/v1/notifications", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHENTICATED");

    let (status, _) = send(
        &router,
        request(
            Method::GET,
            "/api/v1/notifications",
            Some("Bearer not-a-token"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn blood_request_route_broadcasts_and_enforces_role() {
    let harness = Harness::new();
    let donor = harness.donor("Ada Obi", "ada@x.com", true).await;
    let hospital = harness.hospital("City Hospital", "city@h.com").await;
    let router = workflow_router(harness.state.clone());
    let hospital_bearer = harness.bearer(&hospital);
    let donor_bearer = harness.bearer(&donor);

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/blood-requests",
            Some(&donor_bearer),
            Some(blood_request_body()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/blood-requests",
            Some(&hospital_bearer),
            Some(blood_request_body()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["notified"], 1);
    assert_eq!(body["request"]["status"], "pending");
    assert_eq!(body["request"]["bloodGroup"], "O+");

    let (status, body) = send(
        &router,
        request(
            Method::GET,
            "/api/v1/notifications/unread",
            Some(&donor_bearer),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["notifications"][0]["from"], "City Hospital");

    let (status, body) = send(
        &router,
        request(
            Method::GET,
            "/api/v1/blood-requests/history",
            Some(&hospital_bearer),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn appointment_routes_map_errors_to_statuses() {
    let harness = Harness::new();
    let donor = harness.donor("Ada Obi", "ada@x.com", true).await;
    let hospital = harness.hospital("City Hospital", "city@h.com").await;
    let router = workflow_router(harness.state.clone());
    let donor_bearer = harness.bearer(&donor);
    let hospital_bearer = harness.bearer(&hospital);

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/appointments",
            Some(&donor_bearer),
            Some(json!({ "hospitalId": hospital.id, "date": "2020-01-01", "time": "09:00" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/appointments",
            Some(&donor_bearer),
            Some(json!({ "hospitalId": hospital.id, "date": "2099-01-01", "time": "09:00" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().expect("id present").to_string();

    let (status, _) = send(
        &router,
        request(
            Method::PUT,
            &format!("/api/v1/appointments/{id}/respond"),
            Some(&hospital_bearer),
            Some(json!({ "status": "rescheduled" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let cancel_uri = format!("/api/v1/appointments/{id}/cancel");
    let (status, body) = send(
        &router,
        request(Method::PATCH, &cancel_uri, Some(&donor_bearer), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, body) = send(
        &router,
        request(Method::PATCH, &cancel_uri, Some(&donor_bearer), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");

    let (status, body) = send(
        &router,
        request(
            Method::GET,
            "/api/v1/appointments/status/cancelled",
            Some(&hospital_bearer),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, _) = send(
        &router,
        request(
            Method::GET,
            "/api/v1/appointments/status/someday",
            Some(&hospital_bearer),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn verification_link_route_verifies_once() {
    let harness = Harness::new();
    let donor = harness.donor("Ada Obi", "ada@x.com", false).await;
    let router = workflow_router(harness.state.clone());
    let token = harness
        .state
        .identity
        .issue_verification_token(&donor.id, donor.role())
        .expect("token issues")
        .token;
    let uri = format!("/api/v1/auth/verify/{token}");

    let (status, body) = send(&router, request(Method::POST, &uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "verified");
    assert_eq!(body["account"]["isEmailVerified"], true);

    let (status, _) = send(&router, request(Method::POST, &uri, None, None)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &router,
        request(Method::POST, "/api/v1/auth/verify/garbage", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "TOKEN_INVALID");
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let harness = Harness::new();
    let donor = harness.donor("Ada Obi", "ada@x.com", true).await;
    let router = workflow_router(harness.state.clone());
    let bearer = harness.bearer(&donor);

    let (status, _) = send(
        &router,
        request(Method::POST, "/api/v1/auth/logout", Some(&bearer), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &router,
        request(Method::GET, "/api/v1/notifications", Some(&bearer), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "TOKEN_REVOKED");
}

#[tokio::test]
async fn registration_issues_a_working_session() {
    let harness = Harness::new();
    let router = workflow_router(harness.state.clone());

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "role": "donor",
                "fullName": "Ada Obi",
                "email": "ada@x.com",
                "bloodType": "O+",
                "location": "Lagos"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["account"]["email"], "ada@x.com");
    assert_eq!(body["account"]["role"], "donor");
    let token = body["token"].as_str().expect("token").to_string();
    assert!(harness
        .mailer
        .sent()
        .iter()
        .any(|mail| mail.to == "ada@x.com"));

    let (status, _) = send(
        &router,
        request(
            Method::GET,
            "/api/v1/notifications",
            Some(&format!("Bearer {token}")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "role": "hospital", "fullName": "Other", "email": "ada@x.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "role": "admin", "fullName": "Root", "email": "root@x.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}
