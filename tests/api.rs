use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use gradcheck::server::{router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const TOKEN: &str = "staff-secret";

fn test_app(token: Option<&str>) -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(dir.path().join("grad.db"), token.map(str::to_string));
    state.initialize().unwrap();
    (dir, router(Arc::new(state)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn staff(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn student(nisn: &str, class: &str, major: &str, status: &str) -> Value {
    json!({
        "nisn": nisn,
        "name": format!("Student {}", nisn),
        "class": class,
        "major": major,
        "score": 81.5,
        "status": status,
    })
}

async fn create(app: &Router, body: Value) -> Value {
    let (status, record) = send(app, staff("POST", "/students", Some(body))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", record);
    record
}

#[tokio::test]
async fn health_check_reports_ok() {
    let (_dir, app) = test_app(None);
    let (status, body) = send(&app, get("/health-check")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn lookup_on_empty_store_is_not_found() {
    let (_dir, app) = test_app(None);
    let (status, body) = send(&app, get("/?nisn=0000000000")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["searched"], true);
    assert!(body["student"].is_null());
    assert_eq!(body["stats"], json!({"total": 0, "passed": 0, "failed": 0}));

    let (_, stats) = send(&app, get("/announcements")).await;
    assert_eq!(stats["overall_stats"]["total"], 0);
    assert_eq!(stats["overall_stats"]["pass_percentage"], 0.0);
}

#[tokio::test]
async fn lookup_without_query_is_not_a_search() {
    let (_dir, app) = test_app(None);
    let (status, body) = send(&app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["searched"], false);
    assert_eq!(body["nisn"], "");
}

#[tokio::test]
async fn staff_routes_require_token() {
    let (_dir, app) = test_app(Some(TOKEN));

    let (status, _) = send(&app, get("/students")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/students")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, staff("GET", "/students", None)).await;
    assert_eq!(status, StatusCode::OK);

    // Public pages stay open
    let (status, _) = send(&app, get("/announcements")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn create_then_lookup_and_announce() {
    let (_dir, app) = test_app(Some(TOKEN));
    create(&app, student("0051234567", "XII IPA 1", "IPA", "passed")).await;
    create(&app, student("0051234568", "XII IPA 1", "IPA", "failed")).await;
    create(&app, student("0051234569", "XII IPS 1", "IPS", "passed")).await;

    let (_, body) = send(&app, get("/?nisn=0051234567")).await;
    assert_eq!(body["student"]["nisn"], "0051234567");
    assert_eq!(body["student"]["status"], "passed");
    assert_eq!(body["stats"], json!({"total": 3, "passed": 2, "failed": 1}));

    let (_, stats) = send(&app, get("/announcements")).await;
    assert_eq!(stats["overall_stats"]["pass_percentage"], 66.67);
    assert_eq!(stats["stats_by_class"]["XII IPA 1"], json!({"passed": 1, "failed": 1}));
    assert_eq!(stats["stats_by_class"]["XII IPS 1"], json!({"passed": 1}));
    assert_eq!(stats["stats_by_major"]["IPS"]["passed"], 1);

    let recent = stats["recent_graduates"].as_array().unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0]["nisn"], "0051234569");
}

#[tokio::test]
async fn duplicate_nisn_is_a_field_error() {
    let (_dir, app) = test_app(Some(TOKEN));
    create(&app, student("0051234567", "XII IPA 1", "IPA", "passed")).await;

    let (status, body) = send(
        &app,
        staff("POST", "/students", Some(student("0051234567", "XII IPS 2", "IPS", "failed"))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["nisn"].is_string());

    let (_, lookup) = send(&app, get("/?nisn=0051234567")).await;
    assert_eq!(lookup["stats"]["total"], 1);
}

#[tokio::test]
async fn invalid_writes_name_the_field() {
    let (_dir, app) = test_app(None);

    let mut bad_score = student("0051234567", "XII IPA 1", "IPA", "passed");
    bad_score["score"] = json!(100.5);
    let (status, body) = send(&app, staff("POST", "/students", Some(bad_score))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["score"].is_string());

    let bad_status = student("0051234567", "XII IPA 1", "IPA", "pending");
    let (_, body) = send(&app, staff("POST", "/students", Some(bad_status))).await;
    assert!(body["errors"]["status"].is_string());

    let short_nisn = student("12345", "XII IPA 1", "IPA", "passed");
    let (_, body) = send(&app, staff("POST", "/students", Some(short_nisn))).await;
    assert!(body["errors"]["nisn"].is_string());

    let (status, body) = send(
        &app,
        staff("POST", "/students", Some(json!({"nisn": "0051234567", "score": 70}))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["name"].is_string());
}

#[tokio::test]
async fn status_update_is_reflected_everywhere() {
    let (_dir, app) = test_app(Some(TOKEN));
    let record = create(&app, student("0051234567", "XII IPA 1", "IPA", "passed")).await;
    create(&app, student("0051234568", "XII IPA 1", "IPA", "failed")).await;

    let (_, before) = send(&app, get("/?nisn=0051234567")).await;

    let id = record["id"].as_i64().unwrap();
    let (status, updated) = send(
        &app,
        staff(
            "PUT",
            &format!("/students/{}", id),
            Some(student("0051234567", "XII IPA 1", "IPA", "failed")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "failed");

    let (_, after) = send(&app, get("/?nisn=0051234567")).await;
    assert_eq!(after["student"]["status"], "failed");
    assert_eq!(
        after["stats"]["passed"].as_u64().unwrap(),
        before["stats"]["passed"].as_u64().unwrap() - 1
    );
    assert_eq!(
        after["stats"]["failed"].as_u64().unwrap(),
        before["stats"]["failed"].as_u64().unwrap() + 1
    );
}

#[tokio::test]
async fn delete_is_hard() {
    let (_dir, app) = test_app(Some(TOKEN));
    let record = create(&app, student("0051234567", "XII IPA 1", "IPA", "passed")).await;
    let uri = format!("/students/{}", record["id"]);

    let (status, _) = send(&app, staff("DELETE", &uri, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, staff("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, staff("DELETE", &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, lookup) = send(&app, get("/?nisn=0051234567")).await;
    assert!(lookup["student"].is_null());
}

#[tokio::test]
async fn listing_filters_and_pages() {
    let (_dir, app) = test_app(Some(TOKEN));
    for i in 0..18 {
        let (class, status) = if i % 3 == 0 {
            ("XII IPS 1", "failed")
        } else {
            ("XII IPA 1", "passed")
        };
        create(&app, student(&format!("{:010}", i), class, "IPA", status)).await;
    }

    let (_, page) = send(&app, staff("GET", "/students?status=all&class=all", None)).await;
    assert_eq!(page["students"]["total"], 18);
    assert_eq!(page["students"]["per_page"], 15);
    assert_eq!(page["students"]["last_page"], 2);
    assert_eq!(page["students"]["data"].as_array().unwrap().len(), 15);
    assert_eq!(page["filters"]["status"], "all");
    assert_eq!(page["filter_options"]["classes"], json!(["XII IPA 1", "XII IPS 1"]));

    let (_, second) = send(&app, staff("GET", "/students?page=2", None)).await;
    assert_eq!(second["students"]["data"].as_array().unwrap().len(), 3);

    let (_, failed) = send(&app, staff("GET", "/students?status=failed", None)).await;
    assert_eq!(failed["students"]["total"], 6);

    let (_, by_class) = send(&app, staff("GET", "/students?class=XII%20IPS%201", None)).await;
    assert_eq!(by_class["students"]["total"], 6);

    let (_, searched) = send(&app, staff("GET", "/students?search=0000000017", None)).await;
    assert_eq!(searched["students"]["total"], 1);

    let (status, body) = send(&app, staff("GET", "/students?status=graduated", None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["status"].is_string());
}

#[tokio::test]
async fn text_score_is_accepted() {
    let (_dir, app) = test_app(Some(TOKEN));
    let mut body = student("0051234567", "XII IPA 1", "IPA", "passed");
    body["score"] = json!("85");

    let record = create(&app, body).await;
    assert_eq!(record["score"], 85.0);

    let mut body = student("0051234568", "XII IPA 1", "IPA", "passed");
    body["score"] = json!("eighty");
    let (status, body) = send(&app, staff("POST", "/students", Some(body))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["score"].is_string());
}

#[tokio::test]
async fn rejected_bodies_answer_in_json() {
    let (_dir, app) = test_app(Some(TOKEN));

    let mut wrong_type = student("0051234567", "XII IPA 1", "IPA", "passed");
    wrong_type["name"] = json!(5);
    let (status, body) = send(&app, staff("POST", "/students", Some(wrong_type))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["name"].is_string());

    let malformed = Request::builder()
        .method("POST")
        .uri("/students")
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"nisn\": "))
        .unwrap();
    let (status, body) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let no_content_type = Request::builder()
        .method("PUT")
        .uri("/students/1")
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::from(student("0051234567", "XII IPA 1", "IPA", "passed").to_string()))
        .unwrap();
    let (status, body) = send(&app, no_content_type).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["error"].is_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_all_succeed() {
    let (_dir, app) = test_app(Some(TOKEN));

    let handles: Vec<_> = (0..40)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let body = student(&format!("{:010}", i), "XII IPA 1", "IPA", "passed");
                send(&app, staff("POST", "/students", Some(body))).await
            })
        })
        .collect();
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }

    let (_, stats) = send(&app, get("/announcements")).await;
    assert_eq!(stats["overall_stats"]["total"], 40);
}
