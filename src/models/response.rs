use serde::Serialize;
use utoipa::ToSchema;

use crate::models::settings::ViewSettings;
use crate::models::task::Task;
use crate::view::TaskView;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// One group of the derived view, with the tasks in display order.
#[derive(Debug, Serialize, ToSchema)]
pub struct GroupResponse {
    pub label: Option<String>,
    pub count: usize,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ViewResponse {
    pub settings: ViewSettings,
    pub total: usize,
    pub groups: Vec<GroupResponse>,
    /// Ids of records whose last change has not been confirmed by the store yet.
    pub pending: Vec<String>,
}

impl ViewResponse {
    pub fn new(view: &TaskView<'_>, settings: &ViewSettings, pending: Vec<String>) -> Self {
        ViewResponse {
            settings: settings.clone(),
            total: view.total(),
            groups: view
                .groups
                .iter()
                .map(|group| GroupResponse {
                    label: group.label.clone(),
                    count: group.tasks.len(),
                    tasks: group.tasks.iter().map(|task| (*task).clone()).collect(),
                })
                .collect(),
            pending,
        }
    }
}
