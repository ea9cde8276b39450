//! Integration tests for the server's liveness endpoint

use std::net::TcpListener;
use std::sync::Arc;
use tubely_auth::auth::{AccessTokenCodec, Clock, PasswordHasher, SystemClock};
use tubely_auth::persistence::InMemoryAuthStore;
use tubely_auth::service::AuthenticationService;
use tubely_auth::startup::run;

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let codec = AccessTokenCodec::new("health-check-secret", "tubely", clock.clone())
        .expect("Failed to build codec");
    let service = AuthenticationService::new(
        Arc::new(InMemoryAuthStore::new()),
        PasswordHasher::new(4),
        codec,
        clock,
    )
    .expect("Failed to build service");

    let server = run(listener, service, None).expect("Failed to create server");
    let _ = tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/does-not-exist", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, response.status().as_u16());
}
