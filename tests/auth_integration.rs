use chrono::Duration;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use tubely_auth::auth::{AccessTokenCodec, Clock, MockClock, PasswordHasher};
use tubely_auth::persistence::InMemoryAuthStore;
use tubely_auth::service::AuthenticationService;
use tubely_auth::startup::run;

const JWT_SECRET: &str = "integration-test-secret-at-least-32-chars";

pub struct TestApp {
    pub address: String,
    pub clock: MockClock,
    pub client: reqwest::Client,
}

impl TestApp {
    async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", &self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn post_with_bearer(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", &self.address, path))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn get_with_header(&self, path: &str, header: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(&format!("{}{}", &self.address, path));
        if let Some(value) = header {
            request = request.header("Authorization", value);
        }
        request.send().await.expect("Failed to execute request.")
    }

    /// Signs up and logs in, returning the login response body
    async fn login_new_user(&self, email: &str, password: &str) -> Value {
        let credentials = json!({ "email": email, "password": password });
        let signup = self.post_json("/api/users", &credentials).await;
        assert_eq!(201, signup.status().as_u16());

        let login = self.post_json("/api/login", &credentials).await;
        assert_eq!(200, login.status().as_u16());
        login.json().await.expect("Failed to parse response")
    }
}

fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let clock = MockClock::default();
    let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
    let codec = AccessTokenCodec::new(JWT_SECRET, "tubely", shared_clock.clone())
        .expect("Failed to build codec");
    let service = AuthenticationService::new(
        Arc::new(InMemoryAuthStore::new()),
        PasswordHasher::new(4),
        codec,
        shared_clock,
    )
    .expect("Failed to build service");

    let server = run(listener, service, None).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        clock,
        client: reqwest::Client::new(),
    }
}

// --- Signup Tests ---

#[tokio::test]
async fn signup_returns_201_with_public_user() {
    let app = spawn_app();

    let response = app
        .post_json("/api/users", &json!({ "email": "a@x.com", "password": "pw123" }))
        .await;

    assert_eq!(201, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["user"]["email"], "a@x.com");
    assert!(body["user"].get("id").is_some());
    assert!(body["user"].get("created_at").is_some());
    assert!(body["user"].get("hashed_password").is_none());
    assert!(body["user"].get("password").is_none());
}

#[tokio::test]
async fn signup_returns_409_for_duplicate_email() {
    let app = spawn_app();
    let body = json!({ "email": "a@x.com", "password": "pw123" });

    let first = app.post_json("/api/users", &body).await;
    assert_eq!(201, first.status().as_u16());

    let second = app.post_json("/api/users", &body).await;
    assert_eq!(409, second.status().as_u16(), "Should reject duplicate email with 409 Conflict");

    let response_body: Value = second.json().await.expect("Failed to parse response");
    assert_eq!(response_body["code"], "DUPLICATE_ACCOUNT");
}

#[tokio::test]
async fn signup_returns_400_for_empty_or_missing_fields() {
    let app = spawn_app();

    let test_cases = vec![
        (json!({ "email": "", "password": "pw123" }), "empty email"),
        (json!({ "email": "a@x.com", "password": "" }), "empty password"),
        (json!({ "password": "pw123" }), "missing email"),
        (json!({ "email": "a@x.com" }), "missing password"),
        (json!({}), "missing all fields"),
    ];

    for (body, reason) in test_cases {
        let response = app.post_json("/api/users", &body).await;

        assert_eq!(400, response.status().as_u16(), "Should reject request: {}", reason);
    }
}

#[tokio::test]
async fn signup_returns_400_for_unhashable_password() {
    let app = spawn_app();

    let response = app
        .post_json("/api/users", &json!({ "email": "a@x.com", "password": "p".repeat(73) }))
        .await;

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "PASSWORD_REJECTED");
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_user_and_tokens() {
    let app = spawn_app();

    let body = app.login_new_user("a@x.com", "pw123").await;

    assert_eq!(body["email"], "a@x.com");
    assert!(body.get("id").is_some());
    assert!(body.get("hashed_password").is_none());
    assert_eq!(body["token"].as_str().expect("No access token").split('.').count(), 3);
    assert_eq!(body["refresh_token"].as_str().expect("No refresh token").len(), 64);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app();
    app.login_new_user("a@x.com", "pw123").await;

    let wrong_password = app
        .post_json("/api/login", &json!({ "email": "a@x.com", "password": "wrong" }))
        .await;
    let unknown_email = app
        .post_json("/api/login", &json!({ "email": "nobody@x.com", "password": "pw123" }))
        .await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let wrong_password: Value = wrong_password.json().await.expect("Failed to parse response");
    let unknown_email: Value = unknown_email.json().await.expect("Failed to parse response");
    assert_eq!(wrong_password["code"], "INVALID_CREDENTIALS");
    assert_eq!(wrong_password["code"], unknown_email["code"]);
    assert_eq!(wrong_password["message"], unknown_email["message"]);
}

// --- Protected Route Tests ---

#[tokio::test]
async fn current_user_returns_200_with_valid_access_token() {
    let app = spawn_app();
    let login = app.login_new_user("a@x.com", "pw123").await;
    let access_token = login["token"].as_str().expect("No access token");

    let response = app
        .get_with_header("/api/users/me", Some(&format!("Bearer {}", access_token)))
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["id"], login["id"]);
}

#[tokio::test]
async fn current_user_returns_401_without_token() {
    let app = spawn_app();

    let response = app.get_with_header("/api/users/me", None).await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "MISSING_TOKEN");
}

#[tokio::test]
async fn current_user_rejects_invalid_and_malformed_headers() {
    let app = spawn_app();

    let invalid = app
        .get_with_header("/api/users/me", Some("Bearer invalid.token.here"))
        .await;
    assert_eq!(401, invalid.status().as_u16());
    let body: Value = invalid.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "TOKEN_INVALID");

    for header in ["Bearer", "Basic dXNlcjpwYXNz", "BearerToken"] {
        let response = app.get_with_header("/api/users/me", Some(header)).await;
        assert_eq!(401, response.status().as_u16(), "Should reject malformed header: {}", header);
    }
}

#[tokio::test]
async fn refresh_token_is_not_accepted_as_access_token() {
    let app = spawn_app();
    let login = app.login_new_user("a@x.com", "pw123").await;
    let refresh_token = login["refresh_token"].as_str().expect("No refresh token");

    let response = app
        .get_with_header("/api/users/me", Some(&format!("Bearer {}", refresh_token)))
        .await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn access_token_expires_after_two_hours() {
    let app = spawn_app();
    let login = app.login_new_user("a@x.com", "pw123").await;
    let access_token = login["token"].as_str().expect("No access token");

    app.clock.advance(Duration::hours(2));

    let response = app
        .get_with_header("/api/users/me", Some(&format!("Bearer {}", access_token)))
        .await;
    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "TOKEN_EXPIRED");
}

// --- Refresh / Revoke Tests ---

#[tokio::test]
async fn refresh_returns_new_access_token() {
    let app = spawn_app();
    let login = app.login_new_user("a@x.com", "pw123").await;
    let access_token = login["token"].as_str().expect("No access token");
    let refresh_token = login["refresh_token"].as_str().expect("No refresh token");

    let response = app.post_with_bearer("/api/refresh", refresh_token).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    let new_access_token = body["token"].as_str().expect("No new access token");
    assert_ne!(new_access_token, access_token);
    assert!(body.get("refresh_token").is_none());

    let me = app
        .get_with_header("/api/users/me", Some(&format!("Bearer {}", new_access_token)))
        .await;
    assert_eq!(200, me.status().as_u16());
}

#[tokio::test]
async fn refresh_returns_401_for_unknown_token() {
    let app = spawn_app();

    let response = app
        .post_with_bearer("/api/refresh", "definitely_not_a_valid_token_in_database")
        .await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "TOKEN_NOT_FOUND");
}

#[tokio::test]
async fn refresh_returns_401_without_token() {
    let app = spawn_app();

    let response = app
        .client
        .post(&format!("{}/api/refresh", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "MISSING_TOKEN");
}

#[tokio::test]
async fn refresh_returns_401_for_expired_token() {
    let app = spawn_app();
    let login = app.login_new_user("a@x.com", "pw123").await;
    let refresh_token = login["refresh_token"].as_str().expect("No refresh token");

    app.clock.advance(Duration::days(60));

    let response = app.post_with_bearer("/api/refresh", refresh_token).await;
    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn revoke_then_refresh_is_rejected() {
    let app = spawn_app();
    let login = app.login_new_user("a@x.com", "pw123").await;
    let refresh_token = login["refresh_token"].as_str().expect("No refresh token");

    let first = app.post_with_bearer("/api/revoke", refresh_token).await;
    assert_eq!(204, first.status().as_u16());

    let refresh = app.post_with_bearer("/api/refresh", refresh_token).await;
    assert_eq!(401, refresh.status().as_u16());
    let body: Value = refresh.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "TOKEN_REVOKED");

    let second = app.post_with_bearer("/api/revoke", refresh_token).await;
    assert_eq!(204, second.status().as_u16(), "Revoking twice should not fail");
}
