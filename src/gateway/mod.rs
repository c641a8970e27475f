//! Persistence boundary. Every operation is scoped to the authenticated user
//! and returns the record as stored, so callers can reconcile their local
//! copy with it.

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::tag::{Category, CategoryPatch, NewCategory, NewTag, Tag, TagKind, TagPatch};
use crate::models::task::{NewTask, Task, TaskPatch};

pub use memory::InMemoryGateway;
pub use postgres::PgGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("Stored record is invalid: {0}")]
    Corrupt(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => GatewayError::NotFound("Record".to_string()),
            sqlx::Error::Database(db) if db.constraint().is_some() => {
                GatewayError::Constraint(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                GatewayError::Unavailable(err.to_string())
            }
            other => GatewayError::Database(other.to_string()),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[async_trait]
pub trait TaskGateway: Send + Sync {
    /// All of the user's tasks ordered by `position`.
    async fn list_tasks(&self, user_id: &str) -> GatewayResult<Vec<Task>>;
    async fn get_task(&self, user_id: &str, id: &str) -> GatewayResult<Task>;
    /// Assigns id, timestamps and (when absent) the next free position.
    async fn create_task(&self, user_id: &str, new: &NewTask) -> GatewayResult<Task>;
    async fn update_task(&self, user_id: &str, id: &str, patch: &TaskPatch) -> GatewayResult<Task>;
    async fn delete_task(&self, user_id: &str, id: &str) -> GatewayResult<()>;
    /// Flips `completed` in a single atomic write.
    async fn toggle_task(&self, user_id: &str, id: &str) -> GatewayResult<Task>;
    async fn set_positions(&self, user_id: &str, positions: &[(String, i32)]) -> GatewayResult<()>;

    async fn list_tags(&self, user_id: &str, kind: TagKind) -> GatewayResult<Vec<Tag>>;
    async fn create_tag(&self, user_id: &str, kind: TagKind, new: &NewTag) -> GatewayResult<Tag>;
    /// Renaming rewrites the name on every task that references the tag.
    async fn update_tag(&self, user_id: &str, kind: TagKind, id: &str, patch: &TagPatch) -> GatewayResult<Tag>;
    /// Clears the reference on tasks; tasks themselves are kept.
    async fn delete_tag(&self, user_id: &str, kind: TagKind, id: &str) -> GatewayResult<Tag>;

    async fn list_categories(&self, user_id: &str) -> GatewayResult<Vec<Category>>;
    async fn create_category(&self, user_id: &str, new: &NewCategory) -> GatewayResult<Category>;
    async fn update_category(&self, user_id: &str, id: &str, patch: &CategoryPatch) -> GatewayResult<Category>;
    /// Clears `category_id` on tasks; tasks themselves are kept.
    async fn delete_category(&self, user_id: &str, id: &str) -> GatewayResult<Category>;

    /// Record counts for the health endpoint.
    async fn stats(&self) -> GatewayResult<StoreStats>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct StoreStats {
    pub todos: i64,
    pub projects: i64,
    pub areas: i64,
    pub categories: i64,
}
