use chrono::{DateTime, NaiveDate, Utc};

use crate::models::settings::{FilterSet, StatusFilter};
use crate::models::task::Task;
use crate::view::Calendar;

/// Keeps the tasks that pass every active filter field, in input order.
pub fn filter_tasks<'a, I>(tasks: I, filters: &FilterSet, calendar: &Calendar) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    let needle = filters.search.to_lowercase();
    tasks
        .into_iter()
        .filter(|task| passes(task, filters, &needle, calendar))
        .collect()
}

fn passes(task: &Task, filters: &FilterSet, needle: &str, calendar: &Calendar) -> bool {
    status_matches(task, filters.status)
        && (filters.priorities.is_empty() || filters.priorities.contains(&task.priority))
        && day_matches(task.due_date.as_ref(), &filters.due_dates, calendar)
        && day_matches(task.start_date.as_ref(), &filters.start_dates, calendar)
        && assignees_match(&task.assignees, &filters.assignees)
        && tag_matches(task.area.as_deref(), &filters.areas)
        && tag_matches(task.project.as_deref(), &filters.projects)
        && search_matches(task, needle)
}

fn status_matches(task: &Task, status: StatusFilter) -> bool {
    match status {
        StatusFilter::All => true,
        StatusFilter::Pending => !task.completed,
        StatusFilter::Completed => task.completed,
    }
}

// A task without the date never matches an active date filter.
fn day_matches(date: Option<&DateTime<Utc>>, accepted: &[NaiveDate], calendar: &Calendar) -> bool {
    if accepted.is_empty() {
        return true;
    }
    date.map(|at| accepted.contains(&calendar.day_of(at)))
        .unwrap_or(false)
}

fn assignees_match(assignees: &[String], accepted: &[String]) -> bool {
    accepted.is_empty() || assignees.iter().any(|name| accepted.contains(name))
}

fn tag_matches(tag: Option<&str>, accepted: &[String]) -> bool {
    accepted.is_empty() || tag.is_some_and(|tag| accepted.iter().any(|a| a == tag))
}

fn search_matches(task: &Task, needle: &str) -> bool {
    needle.is_empty()
        || task.title.to_lowercase().contains(needle)
        || task
            .description
            .as_deref()
            .is_some_and(|description| description.to_lowercase().contains(needle))
}
