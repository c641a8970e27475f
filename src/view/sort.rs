use std::cmp::Ordering;

use crate::models::settings::{SortDirection, SortField, SortSpec};
use crate::models::task::Task;

/// Stable sort: tasks with equal keys keep their incoming order.
pub fn sort_tasks(tasks: &mut [&Task], spec: SortSpec) {
    tasks.sort_by(|a, b| compare_tasks(a, b, spec));
}

pub fn compare_tasks(a: &Task, b: &Task, spec: SortSpec) -> Ordering {
    let direction = spec.direction;
    match spec.field {
        SortField::CreatedAt => directed(a.created_at.cmp(&b.created_at), direction),
        SortField::DueDate => missing_last(a.due_date, b.due_date, direction),
        SortField::StartDate => missing_last(a.start_date, b.start_date, direction),
        SortField::Priority => directed(a.priority.cmp(&b.priority), direction),
        SortField::Title => directed(locale_cmp(&a.title, &b.title), direction),
        SortField::Position => directed(a.position.cmp(&b.position), direction),
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

// Missing values go last in both directions.
fn missing_last<T: Ord>(a: Option<T>, b: Option<T>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(&b), direction),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Case-folded comparison; strings that differ only in case put lowercase first.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| b.cmp(a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::Priority;
    use crate::view::fixtures::{days_from_today, task};

    fn spec(field: SortField, direction: SortDirection) -> SortSpec {
        SortSpec { field, direction }
    }

    fn titles(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn titles_sort_alphabetically() {
        let tasks = vec![task("1", "Banana"), task("2", "Apple")];
        let mut refs: Vec<&Task> = tasks.iter().collect();
        sort_tasks(&mut refs, spec(SortField::Title, SortDirection::Asc));
        assert_eq!(titles(&refs), vec!["Apple", "Banana"]);
    }

    #[test]
    fn title_comparison_ignores_case_first() {
        assert_eq!(locale_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_cmp("Zebra", "apple"), Ordering::Greater);
        assert_eq!(locale_cmp("a", "A"), Ordering::Less);
        assert_eq!(locale_cmp("same", "same"), Ordering::Equal);
    }

    #[test]
    fn missing_dates_go_last_in_both_directions() {
        let mut early = task("early", "Early");
        early.due_date = Some(days_from_today(-2));
        let undated = task("undated", "Undated");
        let mut late = task("late", "Late");
        late.due_date = Some(days_from_today(5));
        let tasks = vec![undated, late, early];

        for (direction, expected) in [
            (SortDirection::Asc, vec!["early", "late", "undated"]),
            (SortDirection::Desc, vec!["late", "early", "undated"]),
        ] {
            let mut refs: Vec<&Task> = tasks.iter().collect();
            sort_tasks(&mut refs, spec(SortField::DueDate, direction));
            let ids: Vec<&str> = refs.iter().map(|t| t.id.as_str()).collect();
            assert_eq!(ids, expected);
        }
    }

    #[test]
    fn equal_keys_keep_incoming_order_in_both_directions() {
        let mut tasks = Vec::new();
        for (id, priority) in [("a", Priority::High), ("b", Priority::Low), ("c", Priority::High), ("d", Priority::Low)] {
            let mut t = task(id, id);
            t.priority = priority;
            tasks.push(t);
        }

        let mut asc: Vec<&Task> = tasks.iter().collect();
        sort_tasks(&mut asc, spec(SortField::Priority, SortDirection::Asc));
        let ids: Vec<&str> = asc.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a", "c"]);

        let mut desc: Vec<&Task> = tasks.iter().collect();
        sort_tasks(&mut desc, spec(SortField::Priority, SortDirection::Desc));
        let ids: Vec<&str> = desc.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn sorting_is_idempotent() {
        let mut tasks = Vec::new();
        for (i, start) in [Some(3), None, Some(-1), Some(3), None].into_iter().enumerate() {
            let mut t = task(&i.to_string(), &format!("T{}", i));
            t.start_date = start.map(days_from_today);
            t.position = (5 - i) as i32;
            tasks.push(t);
        }

        for field in [SortField::StartDate, SortField::Position, SortField::CreatedAt, SortField::Title] {
            for direction in [SortDirection::Asc, SortDirection::Desc] {
                let mut once: Vec<&Task> = tasks.iter().collect();
                sort_tasks(&mut once, spec(field, direction));
                let mut twice = once.clone();
                sort_tasks(&mut twice, spec(field, direction));
                assert_eq!(once, twice);
            }
        }
    }
}
