use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::nullable;

/// Task urgency, stored and serialized as its ordinal (1 = low, 4 = urgent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum Priority {
    Low = 1,
    #[default]
    Medium = 2,
    High = 3,
    Urgent = 4,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }
}

impl TryFrom<i16> for Priority {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            4 => Ok(Priority::Urgent),
            other => Err(format!("priority must be between 1 and 4, got {}", other)),
        }
    }
}

impl From<Priority> for i16 {
    fn from(priority: Priority) -> Self {
        priority as i16
    }
}

/// A single todo item. Field names double as the storage column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    #[schema(value_type = i16, minimum = 1, maximum = 4)]
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub due_time: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub start_time: Option<String>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignees: Vec<String>,
    pub area: Option<String>,
    pub project: Option<String>,
    pub category_id: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds a record from a create payload. `id`, `position` and the
    /// timestamps are assigned by whoever owns the record.
    pub fn from_new(id: String, user_id: &str, new: &NewTask, position: i32, now: DateTime<Utc>) -> Self {
        Task {
            id,
            user_id: user_id.to_string(),
            title: new.title.trim().to_string(),
            description: new.description.clone(),
            completed: false,
            completed_at: None,
            priority: new.priority,
            due_date: new.due_date,
            due_time: new.due_time.clone(),
            start_date: new.start_date,
            start_time: new.start_time.clone(),
            end_date: new.end_date,
            assignees: new.assignees.clone(),
            area: new.area.clone(),
            project: new.project.clone(),
            category_id: new.category_id.clone(),
            position,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges a partial update into the record and refreshes `updated_at`.
    pub fn apply(&mut self, patch: &TaskPatch, now: DateTime<Utc>) {
        if let Some(ref title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(ref description) = patch.description {
            self.description = description.clone();
        }
        if let Some(completed) = patch.completed {
            self.set_completed(completed, now);
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(ref due_time) = patch.due_time {
            self.due_time = due_time.clone();
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(ref start_time) = patch.start_time {
            self.start_time = start_time.clone();
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
        if let Some(ref assignees) = patch.assignees {
            self.assignees = assignees.clone();
        }
        if let Some(ref area) = patch.area {
            self.area = area.clone();
        }
        if let Some(ref project) = patch.project {
            self.project = project.clone();
        }
        if let Some(ref category_id) = patch.category_id {
            self.category_id = category_id.clone();
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        self.updated_at = now;
    }

    /// `completed_at` keeps the first completion instant and is cleared on reopen.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        if completed {
            self.completed_at.get_or_insert(now);
        } else {
            self.completed_at = None;
        }
        self.completed = completed;
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct NewTask {
    #[validate(length(min = 1, max = 500, message = "Title must be between 1 and 500 characters"))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    #[schema(value_type = i16, minimum = 1, maximum = 4)]
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub due_time: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub start_time: Option<String>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignees: Vec<String>,
    pub area: Option<String>,
    pub project: Option<String>,
    pub category_id: Option<String>,
    pub position: Option<i32>,
}

impl NewTask {
    /// Checks the rules the `Validate` derive cannot express.
    pub fn check(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Task title is required".to_string());
        }
        check_clock_time("due_time", self.due_time.as_deref())?;
        check_clock_time("start_time", self.start_time.as_deref())?;
        check_date_range(self.start_date, self.end_date)
    }
}

/// Partial update. For nullable fields `None` leaves the value untouched and
/// `Some(None)` (JSON `null`) clears it.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct TaskPatch {
    #[validate(length(min = 1, max = 500, message = "Title must be between 1 and 500 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    #[schema(value_type = Option<i16>, minimum = 1, maximum = 4)]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub due_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub start_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub assignees: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub area: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub project: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub category_id: Option<Option<String>>,
    pub position: Option<i32>,
}

impl TaskPatch {
    pub fn check(&self) -> Result<(), String> {
        if let Some(ref title) = self.title {
            if title.trim().is_empty() {
                return Err("Task title cannot be blank".to_string());
            }
        }
        check_clock_time("due_time", self.due_time.as_ref().and_then(|t| t.as_deref()))?;
        check_clock_time("start_time", self.start_time.as_ref().and_then(|t| t.as_deref()))?;
        check_date_range(self.start_date.flatten(), self.end_date.flatten())
    }

    /// Checks the date range the record would end up with once patched.
    pub fn check_against(&self, current: &Task) -> Result<(), String> {
        let start = self.start_date.unwrap_or(current.start_date);
        let end = self.end_date.unwrap_or(current.end_date);
        check_date_range(start, end)
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.due_time.is_none()
            && self.start_date.is_none()
            && self.start_time.is_none()
            && self.end_date.is_none()
            && self.assignees.is_none()
            && self.area.is_none()
            && self.project.is_none()
            && self.category_id.is_none()
            && self.position.is_none()
    }
}

fn check_clock_time(field: &str, value: Option<&str>) -> Result<(), String> {
    match value {
        Some(time) if NaiveTime::parse_from_str(time, "%H:%M").is_err() => {
            Err(format!("{} must be formatted as HH:MM", field))
        }
        _ => Ok(()),
    }
}

fn check_date_range(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<(), String> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err("end_date must not be before start_date".to_string()),
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderRequest {
    pub from_index: usize,
    pub to_index: usize,
}
