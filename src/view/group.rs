use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::settings::GroupField;
use crate::models::task::{Priority, Task};
use crate::view::{locale_cmp, Calendar};

/// Due-date bucket. The derived order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DueBucket {
    Overdue,
    Today,
    Tomorrow,
    On(NaiveDate),
    Unscheduled,
}

/// Identity of a group. Two tasks land in the same group iff their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    All,
    Priority(Priority),
    Due(DueBucket),
    Label(String),
}

impl GroupKey {
    fn of(task: &Task, field: GroupField, calendar: &Calendar) -> GroupKey {
        match field {
            GroupField::None => GroupKey::All,
            GroupField::Priority => GroupKey::Priority(task.priority),
            GroupField::DueDate => GroupKey::Due(due_bucket(task, calendar)),
            GroupField::Assignees => GroupKey::Label(
                task.assignees
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "Unassigned".to_string()),
            ),
            GroupField::StartDate => GroupKey::Label(
                task.start_date
                    .map(|start| calendar.format_day(calendar.day_of(&start)))
                    .unwrap_or_else(|| "No date".to_string()),
            ),
            GroupField::Area => GroupKey::Label(task.area.clone().unwrap_or_else(|| "No area".to_string())),
            GroupField::Project => {
                GroupKey::Label(task.project.clone().unwrap_or_else(|| "No project".to_string()))
            }
        }
    }

    /// Heading shown above the group; the implicit single group has none.
    pub fn label(&self, calendar: &Calendar) -> Option<String> {
        let label = match self {
            GroupKey::All => return None,
            GroupKey::Priority(priority) => priority.label().to_string(),
            GroupKey::Due(DueBucket::Overdue) => "Overdue".to_string(),
            GroupKey::Due(DueBucket::Today) => "Today".to_string(),
            GroupKey::Due(DueBucket::Tomorrow) => "Tomorrow".to_string(),
            GroupKey::Due(DueBucket::On(day)) => calendar.format_day(*day),
            GroupKey::Due(DueBucket::Unscheduled) => "No due date".to_string(),
            GroupKey::Label(label) => label.clone(),
        };
        Some(label)
    }

    // Priority: Urgent first. Due date: bucket order. Everything else: by label.
    fn rank(&self, other: &GroupKey) -> Ordering {
        match (self, other) {
            (GroupKey::Priority(a), GroupKey::Priority(b)) => b.cmp(a),
            (GroupKey::Due(a), GroupKey::Due(b)) => a.cmp(b),
            (GroupKey::Label(a), GroupKey::Label(b)) => locale_cmp(a, b),
            _ => Ordering::Equal,
        }
    }
}

fn due_bucket(task: &Task, calendar: &Calendar) -> DueBucket {
    let Some(due) = task.due_date else {
        return DueBucket::Unscheduled;
    };
    let day = calendar.day_of(&due);
    if day == calendar.today() {
        DueBucket::Today
    } else if day == calendar.tomorrow() {
        DueBucket::Tomorrow
    } else if day < calendar.today() {
        DueBucket::Overdue
    } else {
        DueBucket::On(day)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskGroup<'a> {
    pub key: GroupKey,
    pub label: Option<String>,
    pub tasks: Vec<&'a Task>,
}

/// Buckets already sorted tasks; each group keeps the incoming task order.
pub fn group_tasks<'a>(tasks: Vec<&'a Task>, field: GroupField, calendar: &Calendar) -> Vec<TaskGroup<'a>> {
    if field == GroupField::None {
        return vec![TaskGroup {
            key: GroupKey::All,
            label: None,
            tasks,
        }];
    }

    let mut groups: Vec<TaskGroup<'a>> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    for task in tasks {
        let key = GroupKey::of(task, field, calendar);
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(TaskGroup {
                    label: key.label(calendar),
                    key,
                    tasks: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[slot].tasks.push(task);
    }

    groups.sort_by(|a, b| a.key.rank(&b.key));
    groups
}
