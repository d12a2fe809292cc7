use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::helpers::{as_user, TestServer, PROXY_SECRET};
use crate::config::{DEFAULT_USER_ID_HEADER, PROXY_SECRET_HEADER};

#[actix_web::test]
async fn health_needs_no_credentials() {
    let server = TestServer::new().await;
    let (status, body) = server.send(TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("👍️\n"));
}

#[actix_web::test]
async fn requests_without_the_proxy_secret_are_unauthenticated() {
    let server = TestServer::new().await;
    let req = TestRequest::get().uri("/api/notifications").insert_header((DEFAULT_USER_ID_HEADER, "user-alice"));
    let (status, body) = server.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
}

#[actix_web::test]
async fn requests_with_the_wrong_proxy_secret_are_unauthenticated() {
    let server = TestServer::new().await;
    let req = TestRequest::get()
        .uri("/api/notifications")
        .insert_header((PROXY_SECRET_HEADER, "not-the-secret"))
        .insert_header((DEFAULT_USER_ID_HEADER, "user-alice"));
    let (status, _) = server.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn requests_without_a_user_are_unauthenticated() {
    let server = TestServer::new().await;
    let req = TestRequest::get().uri("/api/notifications").insert_header((PROXY_SECRET_HEADER, PROXY_SECRET));
    let (status, _) = server.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn authenticated_users_get_their_notifications() {
    let server = TestServer::new().await;
    let (status, body) = server.send(as_user(TestRequest::get().uri("/api/notifications"), "user-alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_array());
}

#[actix_web::test]
async fn outsiders_cannot_see_a_chama() {
    let server = TestServer::new().await;
    let path = format!("/api/members/{}/me", server.chama_id());
    let (status, body) = server.get_as("user-stranger", &path).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], json!(false));
}

#[actix_web::test]
async fn audit_log_is_for_officers() {
    let server = TestServer::new().await;
    let path = format!("/api/audit/{}?limit=10", server.chama_id());
    let (status, _) = server.get_as("user-alice", &path).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server.get_as("user-admin", &path).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_array());
}

#[actix_web::test]
async fn bad_path_parameters_are_rejected() {
    let server = TestServer::new().await;
    let (status, body) = server.get_as("user-alice", "/api/members/not-a-number/me").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}
