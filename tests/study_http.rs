mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;

use common::app::spawn_test_app;
use common::auth::{auth_header, token_for, token_with_type};
use common::fixtures::{seed_new_card, seed_review_card, seed_subject, seed_topic};
use common::http::{assert_json_error, call, request, response_json};

#[tokio::test]
async fn it_study_routes_require_a_user_token() {
    let app = spawn_test_app().await;

    let resp = request(&app.app, Method::GET, "/api/study/queue", None, &[]).await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_json_error(&body, "AUTH_UNAUTHORIZED");

    let refresh = token_with_type("u1", &app.config.jwt_secret, "refresh");
    let (status, _) = call(&app.app, Method::GET, "/api/study/queue", &refresh, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = token_for("u1", "not-the-server-secret");
    let (status, _) = call(&app.app, Method::GET, "/api/study/queue", &forged, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn it_queue_lists_due_then_new_cards() {
    let app = spawn_test_app().await;
    let now = Utc::now();
    seed_subject(&app.store, "u1", "s1");
    let topic = seed_topic(&app.store, "s1", "t1");
    seed_new_card(&app.store, &topic, "fresh", now - Duration::minutes(5));
    seed_review_card(&app.store, &topic, "overdue", 3.0, now - Duration::days(2));
    seed_review_card(&app.store, &topic, "later", 3.0, now + Duration::days(2));

    let token = token_for("u1", &app.config.jwt_secret);
    let (status, body) = call(&app.app, Method::GET, "/api/study/queue?subjectId=s1", &token, None).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["overdue", "fresh"]);
}

#[tokio::test]
async fn it_review_updates_card_and_reports_outcome() {
    let app = spawn_test_app().await;
    seed_subject(&app.store, "u1", "s1");
    let topic = seed_topic(&app.store, "s1", "t1");
    seed_new_card(&app.store, &topic, "c1", Utc::now());
    let token = token_for("u1", &app.config.jwt_secret);

    let (status, body) = call(
        &app.app,
        Method::POST,
        "/api/study/review",
        &token,
        Some(json!({ "cardId": "c1", "rating": "good", "durationMs": 1500 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let data = &body["data"];
    assert_eq!(data["state"], "REVIEW");
    assert_eq!(data["reps"], 1);
    assert_eq!(data["stability"], 2.4);
    assert_eq!(data["streak"], 1);
    assert_eq!(data["reviewsToday"], 1);
    assert_eq!(data["rippled"], 0);

    let stored = app.store.get_card("c1").unwrap().unwrap();
    assert_eq!(stored.reps, 1);
}

#[tokio::test]
async fn it_review_accepts_numeric_rating() {
    let app = spawn_test_app().await;
    seed_subject(&app.store, "u1", "s1");
    let topic = seed_topic(&app.store, "s1", "t1");
    seed_new_card(&app.store, &topic, "c1", Utc::now());
    let token = token_for("u1", &app.config.jwt_secret);

    let (status, body) = call(
        &app.app,
        Method::POST,
        "/api/study/review",
        &token,
        Some(json!({ "cardId": "c1", "rating": 1 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["state"], "LEARNING");
}

#[tokio::test]
async fn it_review_rejections_leave_state_untouched() {
    let app = spawn_test_app().await;
    seed_subject(&app.store, "owner", "s1");
    let topic = seed_topic(&app.store, "s1", "t1");
    seed_new_card(&app.store, &topic, "c1", Utc::now());
    let owner = token_for("owner", &app.config.jwt_secret);
    let intruder = token_for("intruder", &app.config.jwt_secret);

    let (status, body) = call(
        &app.app,
        Method::POST,
        "/api/study/review",
        &owner,
        Some(json!({ "cardId": "c1", "rating": "PERFECT" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_GRADE");

    let (status, body) = call(
        &app.app,
        Method::POST,
        "/api/study/review",
        &intruder,
        Some(json!({ "cardId": "c1", "rating": "EASY" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_json_error(&body, "FORBIDDEN");

    let (status, body) = call(
        &app.app,
        Method::POST,
        "/api/study/review",
        &owner,
        Some(json!({ "cardId": "missing", "rating": "EASY" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "CARD_NOT_FOUND");

    let card = app.store.get_card("c1").unwrap().unwrap();
    assert_eq!(card.reps, 0);
    assert!(app.store.get_user_review_logs("owner", 10).unwrap().is_empty());
    assert!(app.store.get_activity_log("owner").unwrap().is_empty());
    assert!(app.store.get_user_profile("intruder").unwrap().is_none());
}

#[tokio::test]
async fn it_malformed_review_body_is_rejected() {
    let app = spawn_test_app().await;
    let token = token_for("u1", &app.config.jwt_secret);

    let resp = request(
        &app.app,
        Method::POST,
        "/api/study/review",
        None,
        &[
            ("authorization", auth_header(&token)),
            ("content-type", "application/json".to_string()),
        ],
    )
    .await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_REQUEST_BODY");
}

#[tokio::test]
async fn it_cram_queues_respect_limits_and_ownership() {
    let app = spawn_test_app().await;
    let now = Utc::now();
    seed_subject(&app.store, "u1", "s1");
    seed_subject(&app.store, "u2", "s2");
    let topic = seed_topic(&app.store, "s1", "t1");
    for i in 0..30 {
        seed_review_card(&app.store, &topic, &format!("c{i:02}"), 2.0, now + Duration::days(5));
    }
    let token = token_for("u1", &app.config.jwt_secret);

    let (status, body) = call(&app.app, Method::GET, "/api/study/cram/global", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 20);

    let (status, body) = call(&app.app, Method::GET, "/api/study/cram/s1", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 30);

    let (status, body) = call(&app.app, Method::GET, "/api/study/cram/s2", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn it_analytics_reports_chart_streak_and_heatmap() {
    let app = spawn_test_app().await;
    seed_subject(&app.store, "u1", "s1");
    let topic = seed_topic(&app.store, "s1", "t1");
    seed_new_card(&app.store, &topic, "c1", Utc::now());
    seed_new_card(&app.store, &topic, "c2", Utc::now());
    let token = token_for("u1", &app.config.jwt_secret);

    for card in ["c1", "c2"] {
        let (status, _) = call(
            &app.app,
            Method::POST,
            "/api/study/review",
            &token,
            Some(json!({ "cardId": card, "rating": "HARD" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(&app.app, Method::GET, "/api/study/analytics", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let data = &body["data"];
    assert_eq!(data["streak"], 1);
    assert_eq!(data["chartData"], json!([{ "date": today, "reviews": 2 }]));
    assert_eq!(data["heatmap"][&today], 2);
}

#[tokio::test]
async fn it_health_endpoints_answer() {
    let app = spawn_test_app().await;

    for path in ["/health/live", "/health/ready"] {
        let resp = request(&app.app, Method::GET, path, None, &[]).await;
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
    }

    let resp = request(&app.app, Method::GET, "/health/database", None, &[]).await;
    let (status, headers, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
    assert!(headers.contains_key("x-request-id"));

    let resp = request(&app.app, Method::GET, "/health", None, &[]).await;
    let (_, _, body) = response_json(resp).await;
    assert_eq!(body["status"], "ok");
}
