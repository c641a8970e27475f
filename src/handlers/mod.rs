pub mod auth;
pub mod health;
pub mod tag;
pub mod todo;
pub mod view;

use actix_web::web;

use crate::utils::errors::ServiceError;

pub use health::health_config;
pub use tag::tag_config;
pub use todo::todo_config;
pub use view::view_config;

/// Registers every route of the API. Malformed JSON bodies are answered with
/// the usual error envelope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ServiceError::ValidationError(err.to_string()).into()),
    )
    .configure(health_config)
    .configure(todo_config)
    .configure(view_config)
    .configure(tag_config);
}
