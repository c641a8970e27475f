use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};

use crate::models::task::{Priority, Task};
use crate::view::Calendar;

pub(crate) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

pub(crate) fn calendar() -> Calendar {
    Calendar::new(FixedOffset::east_opt(0).unwrap(), today(), "%d.%m.%Y")
}

/// Noon UTC, `days` away from the fixture's today.
pub(crate) fn days_from_today(days: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap() + Duration::days(days)
}

pub(crate) fn task(id: &str, title: &str) -> Task {
    let created = Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap();
    Task {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        title: title.to_string(),
        description: None,
        completed: false,
        completed_at: None,
        priority: Priority::Medium,
        due_date: None,
        due_time: None,
        start_date: None,
        start_time: None,
        end_date: None,
        assignees: Vec::new(),
        area: None,
        project: None,
        category_id: None,
        position: 0,
        created_at: created,
        updated_at: created,
    }
}
