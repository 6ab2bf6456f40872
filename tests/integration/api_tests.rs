//! Live-server API tests

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080";

/// Register a fresh account and return its session token
async fn register_and_login(client: &Client) -> String {
    let email = format!("reader-{}@books.test", uuid::Uuid::new_v4());

    let response = client
        .post(format!("{}/register", BASE_URL))
        .json(&json!({ "email": email, "password": "s3cret" }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(format!("{}/login", BASE_URL))
        .json(&json!({ "email": email, "password": "s3cret" }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["data"].as_str().expect("No token in response").to_string()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("strict-transport-security"));

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/login", BASE_URL))
        .json(&json!({ "email": "nobody@books.test", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
#[ignore]
async fn test_duplicate_registration_conflicts() {
    let client = Client::new();
    let email = format!("twice-{}@books.test", uuid::Uuid::new_v4());

    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let response = client
            .post(format!("{}/register", BASE_URL))
            .json(&json!({ "email": email, "password": "pw" }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
#[ignore]
async fn test_book_lifecycle_and_ownership() {
    let client = Client::new();
    let owner = register_and_login(&client).await;
    let stranger = register_and_login(&client).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&owner)
        .json(&json!({ "title": "Meditations", "author": "Marcus Aurelius", "pages": 254 }))
        .send()
        .await
        .expect("Failed to create book");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    let id = body["data"]["id"].as_i64().expect("No id in response");
    assert!(body["data"].get("owner_id").is_none());

    let update = json!({ "title": "Meditations", "author": "Marcus Aurelius", "pages": 300 });

    let response = client
        .put(format!("{}/books/{}", BASE_URL, id))
        .bearer_auth(&stranger)
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .put(format!("{}/books/{}", BASE_URL, id))
        .bearer_auth(&owner)
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["pages"], 300);

    // Deleting needs ownership and the admin role
    let response = client
        .delete(format!("{}/books/{}", BASE_URL, id))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_books_require_token() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
