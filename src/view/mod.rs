//! The filter → sort → group derivation that turns a flat task list plus the
//! session's view settings into the grouped, ordered view model.
//!
//! Everything here is pure and synchronous: the same tasks, settings and
//! calendar always produce the same view, and nothing performs I/O.

mod filter;
mod group;
mod sort;

#[cfg(test)]
pub(crate) mod fixtures;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::models::settings::ViewSettings;
use crate::models::task::Task;

pub use filter::filter_tasks;
pub use group::{group_tasks, DueBucket, GroupKey, TaskGroup};
pub use sort::{compare_tasks, locale_cmp, sort_tasks};

/// Decides which calendar day an instant falls on and how days are labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
    today: NaiveDate,
    date_format: String,
}

impl Calendar {
    pub fn new(offset: FixedOffset, today: NaiveDate, date_format: impl Into<String>) -> Self {
        Calendar {
            offset,
            today,
            date_format: date_format.into(),
        }
    }

    /// Calendar whose "today" is the day `now` falls on at `offset`.
    pub fn at(now: DateTime<Utc>, offset: FixedOffset, date_format: impl Into<String>) -> Self {
        let today = now.with_timezone(&offset).date_naive();
        Calendar::new(offset, today, date_format)
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn tomorrow(&self) -> NaiveDate {
        self.today.succ_opt().unwrap_or(self.today)
    }

    pub fn day_of(&self, instant: &DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn format_day(&self, day: NaiveDate) -> String {
        day.format(&self.date_format).to_string()
    }
}

/// Grouped, ordered result of one derivation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskView<'a> {
    pub groups: Vec<TaskGroup<'a>>,
}

impl<'a> TaskView<'a> {
    pub fn total(&self) -> usize {
        self.groups.iter().map(|group| group.tasks.len()).sum()
    }

    /// All tasks in display order, group by group.
    pub fn tasks(&self) -> impl Iterator<Item = &'a Task> + '_ {
        self.groups.iter().flat_map(|group| group.tasks.iter().copied())
    }
}

pub fn derive_view<'a, I>(tasks: I, settings: &ViewSettings, calendar: &Calendar) -> TaskView<'a>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut visible = filter_tasks(tasks, &settings.filters, calendar);
    sort_tasks(&mut visible, settings.sort);
    TaskView {
        groups: group_tasks(visible, settings.group.field, calendar),
    }
}
