mod common;

use common::{setup, setup_with, Options};
use cv_manager::audit::AuditMode;
use rocket::http::{ContentType, Header, Status};
use serde_json::Value;

#[rocket::async_test]
async fn test_logs_api_request_with_metadata() {
    let app = setup().await;

    let response = app
        .client
        .get("/api/health")
        .header(Header::new("User-Agent", "audit-test/1.0"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().await.unwrap();

    let entries = app.entries().await;
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.method, "GET");
    assert_eq!(entry.path, "/api/health");
    assert_eq!(entry.query_string, "");
    assert_eq!(entry.status_code, Some(200));
    assert_eq!(entry.user_agent, "audit-test/1.0");
    assert_eq!(entry.user_id, None);
    assert_eq!(entry.username, None);
    assert_eq!(entry.content_type, "application/json");
    assert_eq!(entry.content_length, Some(body.len() as i64));
    assert!(entry.response_time_ms.unwrap() > 0.0);
}

#[rocket::async_test]
async fn test_excluded_paths_are_not_logged() {
    let app = setup().await;

    for path in ["/favicon.ico", "/robots.txt", "/static/css/style.css", "/media/a.png"] {
        app.client.get(path).dispatch().await;
    }
    assert!(app.entries().await.is_empty());

    app.client.get("/api/health").dispatch().await;
    assert_eq!(app.entries().await.len(), 1);
}

#[rocket::async_test]
async fn test_query_string_is_recorded() {
    let app = setup().await;

    app.client.get("/api/v1/cvs?page=1").dispatch().await;

    let entries = app.entries().await;
    assert_eq!(entries[0].path, "/api/v1/cvs");
    assert_eq!(entries[0].query_string, "page=1");
}

#[rocket::async_test]
async fn test_authenticated_user_is_attributed() {
    let app = setup().await;
    let (user_id, bearer) = app.login("testuser", false).await;

    let response = app
        .client
        .get("/api/v1/me")
        .header(Header::new("Authorization", bearer))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let entries = app.entries().await;
    assert_eq!(entries[0].user_id, Some(user_id));
    assert_eq!(entries[0].username.as_deref(), Some("testuser"));
}

#[rocket::async_test]
async fn test_invalid_token_is_logged_as_anonymous() {
    let app = setup().await;

    let response = app
        .client
        .get("/api/v1/me")
        .header(Header::new("Authorization", "Bearer not-a-token"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    let entries = app.entries().await;
    assert_eq!(entries[0].status_code, Some(401));
    assert_eq!(entries[0].user_id, None);
}

#[rocket::async_test]
async fn test_error_responses_are_logged() {
    let app = setup().await;

    app.client.get("/api/v1/cvs/999").dispatch().await;
    app.client.get("/no/such/page").dispatch().await;
    app.client
        .post("/api/v1/cvs")
        .header(ContentType::JSON)
        .body("{}")
        .dispatch()
        .await;

    let entries = app.entries().await;
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].method, "POST");
    assert_eq!(entries[0].status_code, Some(400));
    assert_eq!(entries[1].path, "/no/such/page");
    assert_eq!(entries[1].status_code, Some(404));
    assert_eq!(entries[2].status_code, Some(404));
}

#[rocket::async_test]
async fn test_failing_store_never_breaks_the_response() {
    let healthy = setup().await;
    let broken = setup_with(Options {
        failing_store: true,
        ..Default::default()
    })
    .await;

    let expected = healthy.client.get("/api/health").dispatch().await;
    let expected_body = expected.into_string().await.unwrap();

    let response = broken.client.get("/api/health").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.into_string().await.unwrap(), expected_body);

    let response = broken.client.get("/api/v1/cvs").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let json: Value = response.into_json().await.unwrap();
    assert_eq!(json["data"]["count"], 0);
}

#[rocket::async_test]
async fn test_background_mode_records_eventually() {
    let app = setup_with(Options {
        mode: AuditMode::Background,
        ..Default::default()
    })
    .await;

    let response = app.client.get("/api/health").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let entries = app.wait_for_entries(1).await;
    assert_eq!(entries[0].path, "/api/health");
    assert_eq!(entries[0].status_code, Some(200));
}

#[rocket::async_test]
async fn test_client_ip_precedence() {
    let app = setup().await;

    app.client
        .get("/api/health")
        .header(Header::new("X-Forwarded-For", "203.0.113.5, 10.0.0.1"))
        .header(Header::new("X-Real-IP", "198.51.100.7"))
        .dispatch()
        .await;
    app.client
        .get("/api/health")
        .header(Header::new("X-Real-IP", "198.51.100.7"))
        .dispatch()
        .await;
    app.client
        .get("/api/health")
        .remote("192.0.2.1:4000".parse().unwrap())
        .dispatch()
        .await;

    let ips: Vec<_> = app
        .entries()
        .await
        .into_iter()
        .map(|entry| entry.remote_ip)
        .collect();
    assert_eq!(
        ips,
        vec![
            Some("192.0.2.1".to_string()),
            Some("198.51.100.7".to_string()),
            Some("203.0.113.5".to_string()),
        ]
    );
}
