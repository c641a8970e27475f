//! View settings: which tasks are shown, in which order, and how they are
//! bucketed. Every mutation is a shallow merge; nothing here is validated
//! beyond what the types already guarantee.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::task::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

/// Set-valued fields are OR within the field and AND across fields. An empty
/// set (or empty search) does not filter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct FilterSet {
    pub status: StatusFilter,
    #[schema(value_type = Vec<i16>)]
    pub priorities: Vec<Priority>,
    pub due_dates: Vec<NaiveDate>,
    pub assignees: Vec<String>,
    pub start_dates: Vec<NaiveDate>,
    pub areas: Vec<String>,
    pub projects: Vec<String>,
    pub search: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FilterPatch {
    pub status: Option<StatusFilter>,
    #[schema(value_type = Option<Vec<i16>>)]
    pub priorities: Option<Vec<Priority>>,
    pub due_dates: Option<Vec<NaiveDate>>,
    pub assignees: Option<Vec<String>>,
    pub start_dates: Option<Vec<NaiveDate>>,
    pub areas: Option<Vec<String>>,
    pub projects: Option<Vec<String>>,
    pub search: Option<String>,
}

impl FilterSet {
    pub fn merge(&mut self, patch: FilterPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priorities) = patch.priorities {
            self.priorities = priorities;
        }
        if let Some(due_dates) = patch.due_dates {
            self.due_dates = due_dates;
        }
        if let Some(assignees) = patch.assignees {
            self.assignees = assignees;
        }
        if let Some(start_dates) = patch.start_dates {
            self.start_dates = start_dates;
        }
        if let Some(areas) = patch.areas {
            self.areas = areas;
        }
        if let Some(projects) = patch.projects {
            self.projects = projects;
        }
        if let Some(search) = patch.search {
            self.search = search;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CreatedAt,
    DueDate,
    Priority,
    Title,
    Position,
    StartDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SortPatch {
    pub field: Option<SortField>,
    pub direction: Option<SortDirection>,
}

impl SortSpec {
    pub fn merge(&mut self, patch: SortPatch) {
        if let Some(field) = patch.field {
            self.field = field;
        }
        if let Some(direction) = patch.direction {
            self.direction = direction;
        }
    }
}

/// Unrecognised keys deserialize to `None` instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum GroupField {
    #[default]
    None,
    Priority,
    DueDate,
    Assignees,
    StartDate,
    Area,
    Project,
}

impl From<String> for GroupField {
    fn from(key: String) -> Self {
        match key.as_str() {
            "priority" => GroupField::Priority,
            "due_date" => GroupField::DueDate,
            "assignees" => GroupField::Assignees,
            "start_date" => GroupField::StartDate,
            "area" => GroupField::Area,
            "project" => GroupField::Project,
            _ => GroupField::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct GroupSpec {
    pub field: GroupField,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct GroupPatch {
    pub field: Option<GroupField>,
}

impl GroupSpec {
    pub fn merge(&mut self, patch: GroupPatch) {
        if let Some(field) = patch.field {
            self.field = field;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct ViewSettings {
    pub filters: FilterSet,
    pub sort: SortSpec,
    pub group: GroupSpec,
}

impl ViewSettings {
    pub fn clear_filters(&mut self) {
        self.filters = FilterSet::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_group_key_falls_back_to_none() {
        let spec: GroupSpec = serde_json::from_str(r#"{"field": "color"}"#).unwrap();
        assert_eq!(spec.field, GroupField::None);

        let spec: GroupSpec = serde_json::from_str(r#"{"field": "due_date"}"#).unwrap();
        assert_eq!(spec.field, GroupField::DueDate);
        assert_eq!(serde_json::to_string(&spec).unwrap(), r#"{"field":"due_date"}"#);
    }

    #[test]
    fn filter_merge_only_touches_supplied_fields() {
        let mut filters = FilterSet {
            areas: vec!["Business".to_string()],
            ..Default::default()
        };
        let patch: FilterPatch = serde_json::from_str(r#"{"status": "pending", "search": "mail"}"#).unwrap();
        filters.merge(patch);

        assert_eq!(filters.status, StatusFilter::Pending);
        assert_eq!(filters.search, "mail");
        assert_eq!(filters.areas, vec!["Business".to_string()]);
    }

    #[test]
    fn clear_filters_restores_defaults_and_keeps_sort_and_group() {
        let mut settings = ViewSettings::default();
        settings.filters.merge(FilterPatch {
            status: Some(StatusFilter::Completed),
            priorities: Some(vec![Priority::High]),
            assignees: Some(vec!["Anna Lutz".to_string()]),
            search: Some("report".to_string()),
            ..Default::default()
        });
        settings.sort.merge(SortPatch { field: Some(SortField::Title), direction: None });
        settings.group.merge(GroupPatch { field: Some(GroupField::Area) });

        settings.clear_filters();

        assert_eq!(settings.filters.status, StatusFilter::All);
        assert_eq!(settings.filters.search, "");
        assert!(settings.filters.priorities.is_empty());
        assert!(settings.filters.assignees.is_empty());
        assert_eq!(settings.sort.field, SortField::Title);
        assert_eq!(settings.sort.direction, SortDirection::Desc);
        assert_eq!(settings.group.field, GroupField::Area);
    }
}
