use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::{health, tag, todo, view};
use crate::models::response::{ErrorResponse, GroupResponse, ViewResponse};
use crate::models::settings::{
    FilterPatch, FilterSet, GroupField, GroupPatch, GroupSpec, SortDirection, SortField, SortPatch, SortSpec,
    StatusFilter, ViewSettings,
};
use crate::models::tag::{Category, CategoryPatch, NewCategory, NewTag, Tag, TagKind, TagPatch};
use crate::models::task::{NewTask, ReorderRequest, Task, TaskPatch};
use crate::utils::errors::ServiceError;

#[derive(OpenApi)]
#[openapi(
    info(title = "Todo Backend API", description = "Todos, their tags and the derived view"),
    paths(
        health::service_info,
        health::health_check,
        todo::get_todos,
        todo::get_todo,
        todo::create_todo,
        todo::update_todo,
        todo::toggle_todo,
        todo::delete_todo,
        todo::reorder_todos,
        view::get_view,
        view::get_settings,
        view::set_filters,
        view::clear_filters,
        view::set_sort,
        view::set_group,
        tag::get_projects,
        tag::create_project,
        tag::update_project,
        tag::delete_project,
        tag::get_areas,
        tag::create_area,
        tag::update_area,
        tag::delete_area,
        tag::get_categories,
        tag::create_category,
        tag::update_category,
        tag::delete_category,
    ),
    components(schemas(
        Task, NewTask, TaskPatch, ReorderRequest,
        Tag, TagKind, NewTag, TagPatch, Category, NewCategory, CategoryPatch,
        ViewSettings, FilterSet, FilterPatch, StatusFilter, SortSpec, SortPatch, SortField, SortDirection,
        GroupSpec, GroupPatch, GroupField, ViewResponse, GroupResponse,
        ErrorResponse, ServiceError,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Service status"),
        (name = "todos", description = "Todo records"),
        (name = "view", description = "Derived view and view settings"),
        (name = "tags", description = "Projects, areas and categories"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
