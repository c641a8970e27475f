use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::nullable;

/// Projects and areas are both referenced from tasks by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    Project,
    Area,
}

impl TagKind {
    pub fn label(self) -> &'static str {
        match self {
            TagKind::Project => "project",
            TagKind::Area => "area",
        }
    }
}

/// Descriptive metadata attached to tasks. `allowed_assignees` is only kept
/// for projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Tag {
    pub id: String,
    pub user_id: String,
    pub kind: TagKind,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_assignees: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    pub fn apply(&mut self, patch: &TagPatch, now: DateTime<Utc>) {
        if let Some(ref name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(ref color) = patch.color {
            self.color = color.clone();
        }
        if self.kind == TagKind::Project {
            if let Some(ref allowed) = patch.allowed_assignees {
                self.allowed_assignees = allowed.clone();
            }
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewTag {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 64, message = "Color must be between 1 and 64 characters"))]
    pub color: String,
    #[serde(default)]
    pub allowed_assignees: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct TagPatch {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64, message = "Color must be between 1 and 64 characters"))]
    pub color: Option<String>,
    pub allowed_assignees: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub icon: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn apply(&mut self, patch: &CategoryPatch, now: DateTime<Utc>) {
        if let Some(ref name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(ref color) = patch.color {
            self.color = color.clone();
        }
        if let Some(ref icon) = patch.icon {
            self.icon = icon.clone();
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewCategory {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 64, message = "Color must be between 1 and 64 characters"))]
    pub color: String,
    pub icon: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CategoryPatch {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64, message = "Color must be between 1 and 64 characters"))]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub icon: Option<Option<String>>,
    pub position: Option<i32>,
}
