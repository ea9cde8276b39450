use actix_files as fs;
use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{create_user, get_current_user, health_check, login, refresh, revoke};
use crate::service::AuthenticationService;

pub fn run(
    listener: TcpListener,
    service: AuthenticationService,
    file_path_root: Option<String>,
) -> Result<Server, std::io::Error> {
    let codec = service.access_tokens().clone();
    let service = web::Data::new(service);

    let server = HttpServer::new(move || {
        let app = App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)
            // Shared state
            .app_data(service.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/api/users", web::post().to(create_user))
            .route("/api/login", web::post().to(login))
            .route("/api/refresh", web::post().to(refresh))
            .route("/api/revoke", web::post().to(revoke))
            // Owner-only routes
            .service(
                web::resource("/api/users/me")
                    .wrap(JwtMiddleware::new(codec.clone()))
                    .route(web::get().to(get_current_user)),
            );

        // Static files last so they never shadow API routes
        match &file_path_root {
            Some(root) => app.service(fs::Files::new("/app", root).index_file("index.html")),
            None => app,
        }
    })
    .listen(listener)?
    .run();

    Ok(server)
}
