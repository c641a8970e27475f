use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use env_logger::Env;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use todo_be::gateway::{PgGateway, TaskGateway};
use todo_be::openapi::ApiDoc;
use todo_be::{handlers, AppConfig, AppState, Database};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("❌ Configuration error: {}", e);
        e
    })?;

    log::info!("🚀 Starting Todo Backend API on port {}", config.port);
    log::info!("🌍 Environment: {}", config.environment);
    log::info!("📋 Allowed frontend URLs: {:?}", config.frontend_urls);

    let database = Database::new(&config.database_url).await?;
    database.check_tables().await?;

    let gateway: Arc<dyn TaskGateway> = Arc::new(PgGateway::new(database.pool.clone()));
    let state = web::Data::new(AppState::new(gateway));
    let app_config = web::Data::new(config.clone());
    let openapi = ApiDoc::openapi();

    if config.is_development() {
        log::info!("📚 API docs at http://localhost:{}/swagger-ui/", config.port);
    }

    let allowed_origins = config.frontend_urls.clone();
    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::ORIGIN,
            ])
            .supports_credentials();

        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .app_data(app_config.clone())
            .configure(handlers::configure)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()))
    })
    .bind(("0.0.0.0", config.port))
    .with_context(|| format!("Failed to bind port {}", config.port))?
    .run()
    .await
    .context("Server terminated unexpectedly")
}
