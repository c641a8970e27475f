use actix_web::{web, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use chrono::Utc;
use validator::Validate;

use crate::config::AppConfig;
use crate::handlers::auth::authenticate;
use crate::models::response::ApiResponse;
use crate::models::tag::{Category, CategoryPatch, NewCategory, NewTag, Tag, TagKind, TagPatch};
use crate::session::AppState;
use crate::utils::errors::ServiceError;

fn require_name(name: Option<&str>) -> Result<(), ServiceError> {
    match name {
        Some(name) if name.trim().is_empty() => Err(ServiceError::ValidationError("Name is required".to_string())),
        _ => Ok(()),
    }
}

async fn list_tags_of(
    kind: TagKind,
    auth: Option<BearerAuth>,
    state: &AppState,
    config: &AppConfig,
) -> Result<HttpResponse, ServiceError> {
    let user = authenticate(auth.as_ref(), config)?;
    let tags = state.gateway.list_tags(&user.id, kind).await?;

    log::info!("✅ Retrieved {} {}s for user {}", tags.len(), kind.label(), user.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Tags retrieved successfully", tags)))
}

async fn create_tag_of(
    kind: TagKind,
    auth: Option<BearerAuth>,
    state: &AppState,
    config: &AppConfig,
    new: NewTag,
) -> Result<HttpResponse, ServiceError> {
    let user = authenticate(auth.as_ref(), config)?;
    new.validate()?;
    require_name(Some(new.name.as_str()))?;

    let tag = state.gateway.create_tag(&user.id, kind, &new).await?;

    log::info!("✅ Created {} '{}' ({})", kind.label(), tag.name, tag.id);
    Ok(HttpResponse::Created().json(ApiResponse::success("Tag created successfully", tag)))
}

async fn update_tag_of(
    kind: TagKind,
    auth: Option<BearerAuth>,
    state: &AppState,
    config: &AppConfig,
    id: String,
    patch: TagPatch,
) -> Result<HttpResponse, ServiceError> {
    let user = authenticate(auth.as_ref(), config)?;
    patch.validate()?;
    require_name(patch.name.as_deref())?;

    let previous = state
        .gateway
        .list_tags(&user.id, kind)
        .await?
        .into_iter()
        .find(|tag| tag.id == id)
        .ok_or_else(|| ServiceError::NotFound(format!("{} {} not found", kind.label(), id)))?;

    let tag = state.gateway.update_tag(&user.id, kind, &id, &patch).await?;

    if tag.name != previous.name {
        // The store has already rewritten the references; mirror that locally.
        let workspace = state.workspace(&user.id).await?;
        workspace
            .lock()
            .await
            .rename_tag(kind, &previous.name, Some(tag.name.as_str()), Utc::now());
        log::info!("🏷️  Renamed {} '{}' to '{}'", kind.label(), previous.name, tag.name);
    }

    log::info!("✅ Updated {} {}", kind.label(), tag.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Tag updated successfully", tag)))
}

async fn delete_tag_of(
    kind: TagKind,
    auth: Option<BearerAuth>,
    state: &AppState,
    config: &AppConfig,
    id: String,
) -> Result<HttpResponse, ServiceError> {
    let user = authenticate(auth.as_ref(), config)?;
    let removed = state.gateway.delete_tag(&user.id, kind, &id).await?;

    let workspace = state.workspace(&user.id).await?;
    workspace.lock().await.detach_tag(kind, &removed.name, Utc::now());

    log::info!("✅ Deleted {} '{}' ({})", kind.label(), removed.name, removed.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Tag deleted successfully", removed)))
}

/// List the user's projects
#[utoipa::path(
    get,
    path = "/api/projects",
    tag = "tags",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Projects retrieved successfully", body = ApiResponse<Vec<Tag>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_projects(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/projects - Fetching projects");
    list_tags_of(TagKind::Project, auth, &state, &config).await
}

#[utoipa::path(
    post,
    path = "/api/projects",
    tag = "tags",
    security(
        ("bearer_auth" = [])
    ),
    request_body = NewTag,
    responses(
        (status = 201, description = "Project created successfully", body = ApiResponse<Tag>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 409, description = "A project with this name exists", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_project(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    body: web::Json<NewTag>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/projects - Creating project: {}", body.name);
    create_tag_of(TagKind::Project, auth, &state, &config, body.into_inner()).await
}

/// Update a project. Renaming rewrites the project on every todo that uses it.
#[utoipa::path(
    put,
    path = "/api/projects/{id}",
    tag = "tags",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = String, Path, description = "Project ID")
    ),
    request_body = TagPatch,
    responses(
        (status = 200, description = "Project updated successfully", body = ApiResponse<Tag>),
        (status = 404, description = "Project not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn update_project(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
    body: web::Json<TagPatch>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    log::info!("PUT /api/projects/{} - Updating project", id);
    update_tag_of(TagKind::Project, auth, &state, &config, id, body.into_inner()).await
}

/// Delete a project. Todos are kept; their project is cleared.
#[utoipa::path(
    delete,
    path = "/api/projects/{id}",
    tag = "tags",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = String, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Project deleted successfully", body = ApiResponse<Tag>),
        (status = 404, description = "Project not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn delete_project(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    log::info!("DELETE /api/projects/{} - Deleting project", id);
    delete_tag_of(TagKind::Project, auth, &state, &config, id).await
}

/// List the user's areas
#[utoipa::path(
    get,
    path = "/api/areas",
    tag = "tags",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Areas retrieved successfully", body = ApiResponse<Vec<Tag>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_areas(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/areas - Fetching areas");
    list_tags_of(TagKind::Area, auth, &state, &config).await
}

#[utoipa::path(
    post,
    path = "/api/areas",
    tag = "tags",
    security(
        ("bearer_auth" = [])
    ),
    request_body = NewTag,
    responses(
        (status = 201, description = "Area created successfully", body = ApiResponse<Tag>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 409, description = "An area with this name exists", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_area(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    body: web::Json<NewTag>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/areas - Creating area: {}", body.name);
    create_tag_of(TagKind::Area, auth, &state, &config, body.into_inner()).await
}

#[utoipa::path(
    put,
    path = "/api/areas/{id}",
    tag = "tags",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = String, Path, description = "Area ID")
    ),
    request_body = TagPatch,
    responses(
        (status = 200, description = "Area updated successfully", body = ApiResponse<Tag>),
        (status = 404, description = "Area not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn update_area(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
    body: web::Json<TagPatch>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    log::info!("PUT /api/areas/{} - Updating area", id);
    update_tag_of(TagKind::Area, auth, &state, &config, id, body.into_inner()).await
}

#[utoipa::path(
    delete,
    path = "/api/areas/{id}",
    tag = "tags",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = String, Path, description = "Area ID")
    ),
    responses(
        (status = 200, description = "Area deleted successfully", body = ApiResponse<Tag>),
        (status = 404, description = "Area not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn delete_area(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    log::info!("DELETE /api/areas/{} - Deleting area", id);
    delete_tag_of(TagKind::Area, auth, &state, &config, id).await
}

/// List the user's categories, ordered by position
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "tags",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Categories retrieved successfully", body = ApiResponse<Vec<Category>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_categories(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/categories - Fetching categories");

    let user = authenticate(auth.as_ref(), &config)?;
    let categories = state.gateway.list_categories(&user.id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Categories retrieved successfully", categories)))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "tags",
    security(
        ("bearer_auth" = [])
    ),
    request_body = NewCategory,
    responses(
        (status = 201, description = "Category created successfully", body = ApiResponse<Category>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_category(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    body: web::Json<NewCategory>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/categories - Creating category: {}", body.name);

    let user = authenticate(auth.as_ref(), &config)?;
    let new = body.into_inner();
    new.validate()?;
    require_name(Some(new.name.as_str()))?;

    let category = state.gateway.create_category(&user.id, &new).await?;

    log::info!("✅ Category created: {} ({})", category.name, category.id);
    Ok(HttpResponse::Created().json(ApiResponse::success("Category created successfully", category)))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    tag = "tags",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = String, Path, description = "Category ID")
    ),
    request_body = CategoryPatch,
    responses(
        (status = 200, description = "Category updated successfully", body = ApiResponse<Category>),
        (status = 404, description = "Category not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn update_category(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
    body: web::Json<CategoryPatch>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    log::info!("PUT /api/categories/{} - Updating category", id);

    let user = authenticate(auth.as_ref(), &config)?;
    let patch = body.into_inner();
    patch.validate()?;
    require_name(patch.name.as_deref())?;

    let category = state.gateway.update_category(&user.id, &id, &patch).await?;

    log::info!("✅ Category updated: {}", category.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Category updated successfully", category)))
}

/// Delete a category. Todos are kept; their category is cleared.
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "tags",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = String, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category deleted successfully", body = ApiResponse<Category>),
        (status = 404, description = "Category not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn delete_category(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    log::info!("DELETE /api/categories/{} - Deleting category", id);

    let user = authenticate(auth.as_ref(), &config)?;
    let removed = state.gateway.delete_category(&user.id, &id).await?;

    let workspace = state.workspace(&user.id).await?;
    workspace.lock().await.detach_category(&removed.id, Utc::now());

    log::info!("✅ Category deleted: {}", removed.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Category deleted successfully", removed)))
}

pub fn tag_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/projects")
            .route("", web::get().to(get_projects))
            .route("", web::post().to(create_project))
            .route("/{id}", web::put().to(update_project))
            .route("/{id}", web::delete().to(delete_project)),
    )
    .service(
        web::scope("/api/areas")
            .route("", web::get().to(get_areas))
            .route("", web::post().to(create_area))
            .route("/{id}", web::put().to(update_area))
            .route("/{id}", web::delete().to(delete_area)),
    )
    .service(
        web::scope("/api/categories")
            .route("", web::get().to(get_categories))
            .route("", web::post().to(create_category))
            .route("/{id}", web::put().to(update_category))
            .route("/{id}", web::delete().to(delete_category)),
    );
}
