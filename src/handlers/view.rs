use actix_web::{web, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use chrono::Utc;

use crate::config::AppConfig;
use crate::handlers::auth::authenticate;
use crate::models::response::{ApiResponse, ViewResponse};
use crate::models::settings::{FilterPatch, GroupPatch, SortPatch, ViewSettings};
use crate::session::AppState;
use crate::utils::errors::ServiceError;
use crate::workspace::Workspace;

/// Runs `change` against the caller's workspace and answers with the view
/// derived afterwards.
async fn respond_with_view<F>(
    auth: Option<BearerAuth>,
    state: &AppState,
    config: &AppConfig,
    message: &str,
    change: F,
) -> Result<HttpResponse, ServiceError>
where
    F: FnOnce(&mut Workspace),
{
    let user = authenticate(auth.as_ref(), config)?;
    let workspace = state.workspace(&user.id).await?;
    let mut ws = workspace.lock().await;
    change(&mut *ws);

    let calendar = config.calendar(Utc::now());
    let view = ws.view(&calendar);
    let response = ViewResponse::new(&view, ws.settings(), ws.pending_ids());

    log::info!(
        "✅ View for user {}: {} todos in {} groups",
        user.id,
        response.total,
        response.groups.len()
    );
    Ok(HttpResponse::Ok().json(ApiResponse::success(message, response)))
}

/// Derived view: the user's todos filtered, sorted and grouped by the
/// session's view settings
#[utoipa::path(
    get,
    path = "/api/view",
    tag = "view",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "View derived successfully", body = ApiResponse<ViewResponse>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_view(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/view - Deriving view");
    respond_with_view(auth, &state, &config, "View derived successfully", |_| {}).await
}

#[utoipa::path(
    get,
    path = "/api/view/settings",
    tag = "view",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Settings retrieved successfully", body = ApiResponse<ViewSettings>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_settings(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/view/settings - Fetching view settings");

    let user = authenticate(auth.as_ref(), &config)?;
    let workspace = state.workspace(&user.id).await?;
    let settings = workspace.lock().await.settings().clone();

    Ok(HttpResponse::Ok().json(ApiResponse::success("Settings retrieved successfully", settings)))
}

/// Merge into the active filters; only supplied fields change
#[utoipa::path(
    patch,
    path = "/api/view/filters",
    tag = "view",
    security(
        ("bearer_auth" = [])
    ),
    request_body = FilterPatch,
    responses(
        (status = 200, description = "Filters updated", body = ApiResponse<ViewResponse>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn set_filters(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    body: web::Json<FilterPatch>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("PATCH /api/view/filters - Updating filters");
    let patch = body.into_inner();
    respond_with_view(auth, &state, &config, "Filters updated", move |ws| ws.set_filters(patch)).await
}

/// Reset every filter to its default; sort and group are kept
#[utoipa::path(
    delete,
    path = "/api/view/filters",
    tag = "view",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Filters cleared", body = ApiResponse<ViewResponse>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn clear_filters(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("DELETE /api/view/filters - Clearing filters");
    respond_with_view(auth, &state, &config, "Filters cleared", |ws| ws.clear_filters()).await
}

#[utoipa::path(
    patch,
    path = "/api/view/sort",
    tag = "view",
    security(
        ("bearer_auth" = [])
    ),
    request_body = SortPatch,
    responses(
        (status = 200, description = "Sort updated", body = ApiResponse<ViewResponse>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn set_sort(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    body: web::Json<SortPatch>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("PATCH /api/view/sort - Updating sort");
    let patch = body.into_inner();
    respond_with_view(auth, &state, &config, "Sort updated", move |ws| ws.set_sort(patch)).await
}

/// Change the grouping; unknown keys fall back to no grouping
#[utoipa::path(
    patch,
    path = "/api/view/group",
    tag = "view",
    security(
        ("bearer_auth" = [])
    ),
    request_body = GroupPatch,
    responses(
        (status = 200, description = "Grouping updated", body = ApiResponse<ViewResponse>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn set_group(
    auth: Option<BearerAuth>,
    state: web::Data<AppState>,
    config: web::Data<AppConfig>,
    body: web::Json<GroupPatch>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("PATCH /api/view/group - Updating grouping");
    let patch = body.into_inner();
    respond_with_view(auth, &state, &config, "Grouping updated", move |ws| ws.set_group(patch)).await
}

pub fn view_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/view")
            .route("", web::get().to(get_view))
            .route("/settings", web::get().to(get_settings))
            .route("/filters", web::patch().to(set_filters))
            .route("/filters", web::delete().to(clear_filters))
            .route("/sort", web::patch().to(set_sort))
            .route("/group", web::patch().to(set_group)),
    );
}
