use actix_web::{web, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use chrono::Utc;
use tokio::sync::Mutex;
use validator::Validate;

use crate::config::AppConfig;
use crate::gateway::GatewayResult;
use crate::handlers::auth::authenticate;
use crate::models::response::ApiResponse;
use crate::models::task::{NewTask, ReorderRequest, Task, TaskPatch};
use crate::session::AppState;
use crate::utils::errors::ServiceError;
use crate::workspace::{Ticket, Workspace};

/// Confirms or undoes an optimistic change once the store has answered.
async fn settle(workspace: &Mutex<Workspace>, ticket: Ticket, outcome: GatewayResult<Task>) -> Result<Task, ServiceError> {
    let mut ws = workspace.lock().await;
    match outcome {
        Ok(task) => {
            ws.commit(ticket, Some(task.clone()));
            Ok(task)
        }
        Err(err) => {
            log::warn!("↩️  Rolling back change to todo {}: {}", ticket.task_id(), err);
            ws.rollback(ticket);
            Err(err.into())
        }
    }
}

/// Makes sure the workspace holds `id`, pulling it from the store when it
/// was created elsewhere after the session was opened.
async fn ensure_loaded(state: &AppState, user_id: &str, workspace: &Mutex<Workspace>, id: &str) -> Result<(), ServiceError> {
    if workspace.lock().await.task(id).is_some() {
        return Ok(());
    }
    let stored = state.gateway.get_task(user_id, id).await?;
    workspace.lock().await.adopt(stored);
    Ok(())
}

/// List the user's todos
#[utoipa::path(
    get,
    path = "/api/todos",
    tag = "todos",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Todos retrieved successfully", body = ApiResponse<Vec<Task>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_todos(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/todos - Fetching todos");

    let user = authenticate(auth.as_ref(), &config)?;
    let workspace = state.workspace(&user.id).await?;
    let stored = state.gateway.list_tasks(&user.id).await?;

    let mut ws = workspace.lock().await;
    ws.refresh(stored);
    let todos: Vec<Task> = ws.tasks().cloned().collect();

    log::info!("✅ Retrieved {} todos for user {}", todos.len(), user.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Todos retrieved successfully", todos)))
}

/// Get a single todo
#[utoipa::path(
    get,
    path = "/api/todos/{id}",
    tag = "todos",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = String, Path, description = "Todo ID")
    ),
    responses(
        (status = 200, description = "Todo retrieved successfully", body = ApiResponse<Task>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError),
        (status = 404, description = "Todo not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_todo(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    log::info!("GET /api/todos/{} - Fetching todo", id);

    let user = authenticate(auth.as_ref(), &config)?;
    let workspace = state.workspace(&user.id).await?;
    ensure_loaded(&state, &user.id, &workspace, &id).await?;

    let todo = workspace
        .lock()
        .await
        .task(&id)
        .cloned()
        .ok_or_else(|| ServiceError::NotFound(format!("Todo {} not found", id)))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Todo retrieved successfully", todo)))
}

/// Create a new todo
#[utoipa::path(
    post,
    path = "/api/todos",
    tag = "todos",
    security(
        ("bearer_auth" = [])
    ),
    request_body = NewTask,
    responses(
        (status = 201, description = "Todo created successfully", body = ApiResponse<Task>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_todo(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    body: web::Json<NewTask>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/todos - Creating todo: {}", body.title);

    let user = authenticate(auth.as_ref(), &config)?;
    let new = body.into_inner();
    new.validate()?;
    new.check().map_err(ServiceError::ValidationError)?;

    let workspace = state.workspace(&user.id).await?;
    let ticket = workspace.lock().await.begin_create(&user.id, &new, Utc::now());
    let outcome = state.gateway.create_task(&user.id, &new).await;
    let todo = settle(&workspace, ticket, outcome).await?;

    log::info!("✅ Todo created: {} ({})", todo.title, todo.id);
    Ok(HttpResponse::Created().json(ApiResponse::success("Todo created successfully", todo)))
}

/// Update a todo. Fields absent from the body are left unchanged; `null`
/// clears an optional field.
#[utoipa::path(
    put,
    path = "/api/todos/{id}",
    tag = "todos",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = String, Path, description = "Todo ID")
    ),
    request_body = TaskPatch,
    responses(
        (status = 200, description = "Todo updated successfully", body = ApiResponse<Task>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError),
        (status = 404, description = "Todo not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn update_todo(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
    body: web::Json<TaskPatch>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    log::info!("PUT /api/todos/{} - Updating todo", id);

    let user = authenticate(auth.as_ref(), &config)?;
    let patch = body.into_inner();
    if patch.is_empty() {
        return Err(ServiceError::ValidationError("No fields to update".to_string()));
    }
    patch.validate()?;
    patch.check().map_err(ServiceError::ValidationError)?;

    let workspace = state.workspace(&user.id).await?;
    ensure_loaded(&state, &user.id, &workspace, &id).await?;
    let ticket = {
        let mut ws = workspace.lock().await;
        if let Some(current) = ws.task(&id) {
            patch.check_against(current).map_err(ServiceError::ValidationError)?;
        }
        ws.begin_update(&id, &patch, Utc::now())?
    };
    let outcome = state.gateway.update_task(&user.id, &id, &patch).await;
    let todo = settle(&workspace, ticket, outcome).await?;

    log::info!("✅ Todo updated: {}", todo.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Todo updated successfully", todo)))
}

/// Toggle a todo's completion
#[utoipa::path(
    post,
    path = "/api/todos/{id}/toggle",
    tag = "todos",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = String, Path, description = "Todo ID")
    ),
    responses(
        (status = 200, description = "Todo toggled successfully", body = ApiResponse<Task>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError),
        (status = 404, description = "Todo not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn toggle_todo(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    log::info!("POST /api/todos/{}/toggle - Toggling todo", id);

    let user = authenticate(auth.as_ref(), &config)?;
    let workspace = state.workspace(&user.id).await?;
    ensure_loaded(&state, &user.id, &workspace, &id).await?;
    let ticket = workspace.lock().await.begin_toggle(&id, Utc::now())?;
    let outcome = state.gateway.toggle_task(&user.id, &id).await;
    let todo = settle(&workspace, ticket, outcome).await?;

    log::info!("✅ Todo {} is now {}", todo.id, if todo.completed { "completed" } else { "open" });
    Ok(HttpResponse::Ok().json(ApiResponse::success("Todo toggled successfully", todo)))
}

/// Delete a todo
#[utoipa::path(
    delete,
    path = "/api/todos/{id}",
    tag = "todos",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = String, Path, description = "Todo ID")
    ),
    responses(
        (status = 200, description = "Todo deleted successfully"),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError),
        (status = 404, description = "Todo not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn delete_todo(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    log::info!("DELETE /api/todos/{} - Deleting todo", id);

    let user = authenticate(auth.as_ref(), &config)?;
    let workspace = state.workspace(&user.id).await?;
    ensure_loaded(&state, &user.id, &workspace, &id).await?;
    let ticket = workspace.lock().await.begin_delete(&id)?;

    match state.gateway.delete_task(&user.id, &id).await {
        Ok(()) => workspace.lock().await.commit(ticket, None),
        Err(err) => {
            log::warn!("↩️  Restoring todo {}: {}", id, err);
            workspace.lock().await.rollback(ticket);
            return Err(err.into());
        }
    }

    log::info!("✅ Todo deleted: {}", id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Todo deleted successfully", serde_json::json!({ "id": id }))))
}

/// Move a todo within the manual order
#[utoipa::path(
    post,
    path = "/api/todos/reorder",
    tag = "todos",
    security(
        ("bearer_auth" = [])
    ),
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Todos reordered successfully", body = ApiResponse<Vec<Task>>),
        (status = 400, description = "Index out of range", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn reorder_todos(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    body: web::Json<ReorderRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!(
        "POST /api/todos/reorder - Moving todo from {} to {}",
        body.from_index,
        body.to_index
    );

    let user = authenticate(auth.as_ref(), &config)?;
    let workspace = state.workspace(&user.id).await?;
    let positions = workspace.lock().await.plan_reorder(body.from_index, body.to_index)?;

    if !positions.is_empty() {
        state.gateway.set_positions(&user.id, &positions).await?;
    }

    let mut ws = workspace.lock().await;
    ws.apply_positions(&positions, Utc::now());
    let mut todos: Vec<Task> = ws.tasks().cloned().collect();
    todos.sort_by_key(|todo| todo.position);

    log::info!("✅ Updated {} positions for user {}", positions.len(), user.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Todos reordered successfully", todos)))
}

pub fn todo_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/todos")
            .route("", web::get().to(get_todos))
            .route("", web::post().to(create_todo))
            .route("/reorder", web::post().to(reorder_todos))
            .route("/{id}", web::get().to(get_todo))
            .route("/{id}", web::put().to(update_todo))
            .route("/{id}", web::delete().to(delete_todo))
            .route("/{id}/toggle", web::post().to(toggle_todo)),
    );
}
