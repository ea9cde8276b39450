use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use tubely_auth::auth::{AccessTokenCodec, Clock, PasswordHasher, SystemClock};
use tubely_auth::configuration::get_configuration;
use tubely_auth::persistence::PgAuthStore;
use tubely_auth::service::AuthenticationService;
use tubely_auth::startup::run;
use tubely_auth::telemetry::init_telemetry;

fn startup_error(kind: std::io::ErrorKind, message: &str) -> std::io::Error {
    std::io::Error::new(kind, message.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // 구조화된 로깅 초기화
    init_telemetry("info");

    tracing::info!("Starting application");

    // 설정 로드
    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(startup_error(std::io::ErrorKind::InvalidInput, "Configuration error"));
        }
    };

    // 서명 키는 시작 시 한 번만 만들고 이후 변경하지 않습니다
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let codec = AccessTokenCodec::new(
        &configuration.jwt.secret,
        &configuration.jwt.issuer,
        clock.clone(),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Invalid JWT settings");
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    // 데이터베이스 연결 풀 생성
    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            startup_error(std::io::ErrorKind::ConnectionRefused, "Database connection error")
        })?;

    let store = PgAuthStore::new(pool);
    store.migrate().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to run migrations");
        startup_error(std::io::ErrorKind::Other, "Migration error")
    })?;
    tracing::info!("Database ready");

    let service = AuthenticationService::new(
        Arc::new(store),
        PasswordHasher::new(configuration.password.bcrypt_cost),
        codec,
        clock,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to build authentication service");
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    // 서버 주소 설정
    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, service, configuration.application.file_path_root.clone())?;
    tracing::info!("Server started successfully");

    server.await
}
