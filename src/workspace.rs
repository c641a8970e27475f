//! Per-user state container: the task records the view is derived from plus
//! the session's view settings.
//!
//! Mutations are optimistic. `begin_*` applies the change locally, marks the
//! record pending and hands back a [`Ticket`]; once the gateway answers the
//! caller either [`commit`](Workspace::commit)s the returned record or
//! [`rollback`](Workspace::rollback)s.
//!
//! Conflicts resolve last-write-wins: the gateway's answer to the newest
//! mutation of a record replaces the local copy. An answer to an older
//! mutation only advances the committed baseline, and a failed mutation puts
//! the record back to its last committed state.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::settings::{FilterPatch, GroupPatch, SortPatch, ViewSettings};
use crate::models::tag::TagKind;
use crate::models::task::{NewTask, Task, TaskPatch};
use crate::view::{derive_view, Calendar, TaskView};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("Task {0} not found")]
    UnknownTask(String),
    #[error("Index {index} is out of range for {len} tasks")]
    InvalidIndex { index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq)]
enum SyncState {
    Committed,
    /// `baseline` is the last record the gateway confirmed, `None` when the
    /// record has never been stored.
    Pending { revision: u64, baseline: Option<Task> },
}

#[derive(Debug, Clone)]
struct Entry {
    task: Task,
    hidden: bool,
    sync: SyncState,
    /// Revision of the newest mutation the gateway has answered for.
    confirmed: u64,
}

impl Entry {
    fn committed(task: Task, confirmed: u64) -> Self {
        Entry {
            task,
            hidden: false,
            sync: SyncState::Committed,
            confirmed,
        }
    }

    fn is_pending(&self) -> bool {
        matches!(self.sync, SyncState::Pending { .. })
    }

    /// Never stored: the record still carries its temporary id.
    fn is_provisional(&self) -> bool {
        matches!(self.sync, SyncState::Pending { baseline: None, .. })
    }

    fn revision(&self) -> Option<u64> {
        match self.sync {
            SyncState::Pending { revision, .. } => Some(revision),
            SyncState::Committed => None,
        }
    }
}

/// Receipt for an optimistic mutation; spent by `commit` or `rollback`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Ticket {
    id: String,
    revision: u64,
}

impl Ticket {
    pub fn task_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default)]
pub struct Workspace {
    entries: Vec<Entry>,
    settings: ViewSettings,
    revision: u64,
}

impl Workspace {
    pub fn new(tasks: Vec<Task>) -> Self {
        Workspace {
            entries: tasks.into_iter().map(|task| Entry::committed(task, 0)).collect(),
            ..Default::default()
        }
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Visible records in storage order (pending deletions excluded).
    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.entries.iter().filter(|entry| !entry.hidden).map(|entry| &entry.task)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.entries
            .iter()
            .find(|entry| !entry.hidden && entry.task.id == id)
            .map(|entry| &entry.task)
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.is_pending())
            .map(|entry| entry.task.id.clone())
            .collect()
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn view(&self, calendar: &Calendar) -> TaskView<'_> {
        derive_view(self.tasks(), &self.settings, calendar)
    }

    // ---------------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------------

    pub fn set_filters(&mut self, patch: FilterPatch) {
        self.settings.filters.merge(patch);
    }

    pub fn set_sort(&mut self, patch: SortPatch) {
        self.settings.sort.merge(patch);
    }

    pub fn set_group(&mut self, patch: GroupPatch) {
        self.settings.group.merge(patch);
    }

    pub fn clear_filters(&mut self) {
        self.settings.clear_filters();
    }

    // ---------------------------------------------------------------------
    // Optimistic mutations
    // ---------------------------------------------------------------------

    /// Inserts a provisional record under a temporary id until the gateway
    /// assigns the real one.
    pub fn begin_create(&mut self, user_id: &str, new: &NewTask, now: DateTime<Utc>) -> Ticket {
        let position = new.position.unwrap_or_else(|| self.next_position());
        let temp_id = format!("pending-{}", Uuid::new_v4());
        let task = Task::from_new(temp_id.clone(), user_id, new, position, now);
        let revision = self.next_revision();
        self.entries.push(Entry {
            task,
            hidden: false,
            sync: SyncState::Pending { revision, baseline: None },
            confirmed: 0,
        });
        Ticket { id: temp_id, revision }
    }

    pub fn begin_update(&mut self, id: &str, patch: &TaskPatch, now: DateTime<Utc>) -> Result<Ticket, WorkspaceError> {
        self.begin(id, |task| task.apply(patch, now))
    }

    pub fn begin_toggle(&mut self, id: &str, now: DateTime<Utc>) -> Result<Ticket, WorkspaceError> {
        self.begin(id, |task| {
            let completed = !task.completed;
            task.set_completed(completed, now);
            task.updated_at = now;
        })
    }

    /// Hides the record until the deletion is confirmed.
    pub fn begin_delete(&mut self, id: &str) -> Result<Ticket, WorkspaceError> {
        let revision = self.next_revision();
        let entry = self.entry_mut(id)?;
        entry.sync = pending(&entry.sync, &entry.task, revision);
        entry.hidden = true;
        Ok(Ticket { id: id.to_string(), revision })
    }

    fn begin<F>(&mut self, id: &str, change: F) -> Result<Ticket, WorkspaceError>
    where
        F: FnOnce(&mut Task),
    {
        let revision = self.next_revision();
        let entry = self.entry_mut(id)?;
        entry.sync = pending(&entry.sync, &entry.task, revision);
        change(&mut entry.task);
        Ok(Ticket { id: id.to_string(), revision })
    }

    /// Applies the gateway's copy of the record. `None` confirms a deletion.
    /// Answers older than one already applied are dropped.
    pub fn commit(&mut self, ticket: Ticket, stored: Option<Task>) {
        let Some(index) = self.position_of(&ticket.id) else {
            return;
        };
        let entry = &mut self.entries[index];
        if ticket.revision <= entry.confirmed {
            return;
        }
        match (entry.revision(), stored) {
            (Some(revision), Some(task)) if revision == ticket.revision => {
                *entry = Entry::committed(task, ticket.revision);
            }
            (Some(revision), None) if revision == ticket.revision => {
                self.entries.remove(index);
            }
            (Some(_), stored) => {
                // A newer mutation is still in flight; keep showing it.
                if let SyncState::Pending { ref mut baseline, .. } = entry.sync {
                    *baseline = stored;
                }
                entry.confirmed = ticket.revision;
            }
            (None, Some(task)) => *entry = Entry::committed(task, ticket.revision),
            (None, None) => {}
        }
    }

    /// Undoes a failed mutation. Stale tickets are ignored: the newer
    /// mutation's baseline already reflects the last confirmed state.
    pub fn rollback(&mut self, ticket: Ticket) {
        let Some(index) = self.position_of(&ticket.id) else {
            return;
        };
        if self.entries[index].revision() != Some(ticket.revision) {
            return;
        }
        let baseline = match self.entries[index].sync {
            SyncState::Pending { ref baseline, .. } => baseline.clone(),
            SyncState::Committed => return,
        };
        let confirmed = self.entries[index].confirmed;
        match baseline {
            Some(task) => self.entries[index] = Entry::committed(task, confirmed),
            None => {
                self.entries.remove(index);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Reconciliation
    // ---------------------------------------------------------------------

    /// Replaces committed records with a fresh listing from the gateway.
    /// Records with a mutation in flight keep their local state.
    pub fn refresh(&mut self, stored: Vec<Task>) {
        let (mut pending, settled): (Vec<Entry>, Vec<Entry>) = self.entries.drain(..).partition(Entry::is_pending);
        let mut entries = Vec::with_capacity(stored.len() + pending.len());
        for task in stored {
            match pending.iter().position(|entry| entry.task.id == task.id) {
                Some(i) => entries.push(pending.remove(i)),
                None => {
                    let confirmed = settled
                        .iter()
                        .find(|entry| entry.task.id == task.id)
                        .map_or(0, |entry| entry.confirmed);
                    entries.push(Entry::committed(task, confirmed));
                }
            }
        }
        entries.extend(pending);
        self.entries = entries;
    }

    /// Takes in a stored record this workspace has not seen yet, for example
    /// one created from another client since the session was opened.
    pub fn adopt(&mut self, stored: Task) {
        match self.position_of(&stored.id) {
            Some(index) if !self.entries[index].is_pending() => {
                let confirmed = self.entries[index].confirmed;
                self.entries[index] = Entry::committed(stored, confirmed);
            }
            Some(_) => {}
            None => self.entries.push(Entry::committed(stored, 0)),
        }
    }

    /// Plans a manual move within the position-ordered list. Returns the
    /// `(id, position)` pairs that change; nothing is applied yet. Records
    /// whose creation is still in flight are left out.
    pub fn plan_reorder(&self, from: usize, to: usize) -> Result<Vec<(String, i32)>, WorkspaceError> {
        let mut ordered: Vec<&Task> = self
            .entries
            .iter()
            .filter(|entry| !entry.hidden && !entry.is_provisional())
            .map(|entry| &entry.task)
            .collect();
        ordered.sort_by_key(|task| task.position);
        let len = ordered.len();
        for index in [from, to] {
            if index >= len {
                return Err(WorkspaceError::InvalidIndex { index, len });
            }
        }
        let moved = ordered.remove(from);
        ordered.insert(to, moved);

        Ok(ordered
            .iter()
            .enumerate()
            .filter(|(position, task)| task.position != *position as i32)
            .map(|(position, task)| (task.id.clone(), position as i32))
            .collect())
    }

    pub fn apply_positions(&mut self, positions: &[(String, i32)], now: DateTime<Utc>) {
        for (id, position) in positions {
            if let Ok(entry) = self.entry_mut(id) {
                entry.task.position = *position;
                entry.task.updated_at = now;
            }
        }
    }

    /// Clears references to a deleted project or area. Tasks are kept.
    pub fn detach_tag(&mut self, kind: TagKind, name: &str, now: DateTime<Utc>) {
        self.rename_tag(kind, name, None, now);
    }

    /// Rewrites the reference on the visible record and on the committed
    /// baseline of a pending one, so a later rollback keeps the store's naming.
    pub fn rename_tag(&mut self, kind: TagKind, from: &str, to: Option<&str>, now: DateTime<Utc>) {
        self.rewrite_references(now, |task| {
            let slot = match kind {
                TagKind::Project => &mut task.project,
                TagKind::Area => &mut task.area,
            };
            if slot.as_deref() != Some(from) {
                return false;
            }
            *slot = to.map(str::to_string);
            true
        });
    }

    pub fn detach_category(&mut self, category_id: &str, now: DateTime<Utc>) {
        self.rewrite_references(now, |task| {
            if task.category_id.as_deref() != Some(category_id) {
                return false;
            }
            task.category_id = None;
            true
        });
    }

    fn rewrite_references<F>(&mut self, now: DateTime<Utc>, rewrite: F)
    where
        F: Fn(&mut Task) -> bool,
    {
        for entry in &mut self.entries {
            let copies = match entry.sync {
                SyncState::Pending { baseline: Some(ref mut baseline), .. } => vec![&mut entry.task, baseline],
                _ => vec![&mut entry.task],
            };
            for task in copies {
                if rewrite(task) {
                    task.updated_at = now;
                }
            }
        }
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut Entry, WorkspaceError> {
        self.entries
            .iter_mut()
            .find(|entry| !entry.hidden && entry.task.id == id)
            .ok_or_else(|| WorkspaceError::UnknownTask(id.to_string()))
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.task.id == id)
    }

    fn next_position(&self) -> i32 {
        self.entries
            .iter()
            .map(|entry| entry.task.position + 1)
            .max()
            .unwrap_or(0)
    }

    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

fn pending(current: &SyncState, task: &Task, revision: u64) -> SyncState {
    let baseline = match current {
        SyncState::Committed => Some(task.clone()),
        SyncState::Pending { baseline, .. } => baseline.clone(),
    };
    SyncState::Pending { revision, baseline }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::fixtures::{days_from_today, task};

    fn now() -> DateTime<Utc> {
        days_from_today(0)
    }

    fn workspace() -> Workspace {
        let mut a = task("a", "Alpha");
        a.position = 0;
        let mut b = task("b", "Beta");
        b.position = 1;
        let mut c = task("c", "Gamma");
        c.position = 2;
        Workspace::new(vec![a, b, c])
    }

    fn rename(title: &str) -> TaskPatch {
        TaskPatch {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn commit_replaces_the_optimistic_copy() {
        let mut ws = workspace();
        let ticket = ws.begin_update("a", &rename("Local"), now()).unwrap();
        assert_eq!(ws.task("a").unwrap().title, "Local");
        assert_eq!(ws.pending_ids(), vec!["a".to_string()]);

        let mut stored = task("a", "Stored");
        stored.position = 0;
        ws.commit(ticket, Some(stored));

        assert_eq!(ws.task("a").unwrap().title, "Stored");
        assert!(ws.pending_ids().is_empty());
    }

    #[test]
    fn rollback_restores_the_committed_record() {
        let mut ws = workspace();
        let ticket = ws.begin_toggle("b", now()).unwrap();
        assert!(ws.task("b").unwrap().completed);

        ws.rollback(ticket);

        let b = ws.task("b").unwrap();
        assert!(!b.completed);
        assert_eq!(b.completed_at, None);
        assert!(ws.pending_ids().is_empty());
    }

    #[test]
    fn failed_create_disappears_and_confirmed_create_takes_the_server_id() {
        let mut ws = workspace();
        let new = NewTask { title: "Fresh".to_string(), ..Default::default() };

        let failed = ws.begin_create("user-1", &new, now());
        assert_eq!(ws.tasks().count(), 4);
        ws.rollback(failed);
        assert_eq!(ws.tasks().count(), 3);

        let ticket = ws.begin_create("user-1", &new, now());
        assert_eq!(ws.task(ticket.task_id()).unwrap().position, 3);
        ws.commit(ticket, Some(task("server-id", "Fresh")));
        assert!(ws.task("server-id").is_some());
        assert!(ws.pending_ids().is_empty());
    }

    #[test]
    fn pending_delete_is_hidden_and_restored_on_failure() {
        let mut ws = workspace();
        let ticket = ws.begin_delete("c").unwrap();
        assert!(ws.task("c").is_none());
        assert_eq!(ws.begin_update("c", &rename("x"), now()), Err(WorkspaceError::UnknownTask("c".to_string())));

        ws.rollback(ticket);
        assert_eq!(ws.task("c").unwrap().title, "Gamma");

        let ticket = ws.begin_delete("c").unwrap();
        ws.commit(ticket, None);
        assert!(ws.task("c").is_none());
        assert_eq!(ws.tasks().count(), 2);
    }

    #[test]
    fn newest_mutation_wins_over_an_older_response() {
        let mut ws = workspace();
        let first = ws.begin_update("a", &rename("First"), now()).unwrap();
        let second = ws.begin_update("a", &rename("Second"), now()).unwrap();

        // The older request answers first: the newer optimistic state stays.
        ws.commit(first, Some(task("a", "First")));
        assert_eq!(ws.task("a").unwrap().title, "Second");

        // The newer request fails: fall back to what the store confirmed.
        ws.rollback(second);
        assert_eq!(ws.task("a").unwrap().title, "First");
        assert!(ws.pending_ids().is_empty());
    }

    #[test]
    fn late_answer_to_an_older_mutation_is_dropped() {
        let mut ws = workspace();
        let first = ws.begin_update("a", &rename("First"), now()).unwrap();
        let second = ws.begin_update("a", &rename("Second"), now()).unwrap();

        ws.commit(second, Some(task("a", "Second")));
        ws.commit(first, Some(task("a", "First")));

        assert_eq!(ws.task("a").unwrap().title, "Second");
        assert!(ws.pending_ids().is_empty());
    }

    #[test]
    fn older_answer_still_lands_when_the_newer_mutation_failed() {
        let mut ws = workspace();
        let first = ws.begin_toggle("b", now()).unwrap();
        let second = ws.begin_update("b", &rename("Second"), now()).unwrap();

        ws.rollback(second);
        assert_eq!(ws.task("b").unwrap().title, "Beta");

        let mut stored = task("b", "Beta");
        stored.completed = true;
        ws.commit(first, Some(stored));
        assert!(ws.task("b").unwrap().completed);
    }

    #[test]
    fn stale_rollback_does_not_clobber_a_newer_mutation() {
        let mut ws = workspace();
        let first = ws.begin_update("a", &rename("First"), now()).unwrap();
        let second = ws.begin_update("a", &rename("Second"), now()).unwrap();

        ws.rollback(first);
        assert_eq!(ws.task("a").unwrap().title, "Second");

        ws.rollback(second);
        assert_eq!(ws.task("a").unwrap().title, "Alpha");
    }

    #[test]
    fn refresh_keeps_records_with_mutations_in_flight() {
        let mut ws = workspace();
        let _ticket = ws.begin_update("b", &rename("Editing"), now()).unwrap();

        ws.refresh(vec![task("a", "Alpha v2"), task("b", "Beta v2")]);

        assert_eq!(ws.task("a").unwrap().title, "Alpha v2");
        assert_eq!(ws.task("b").unwrap().title, "Editing");
        assert!(ws.task("c").is_none());
    }

    #[test]
    fn reorder_moves_one_task_and_reports_changed_positions() {
        let mut ws = workspace();
        let plan = ws.plan_reorder(2, 0).unwrap();
        assert_eq!(
            plan,
            vec![("c".to_string(), 0), ("a".to_string(), 1), ("b".to_string(), 2)]
        );

        ws.apply_positions(&plan, now());
        let mut order: Vec<&Task> = ws.tasks().collect();
        order.sort_by_key(|t| t.position);
        let ids: Vec<&str> = order.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        assert_eq!(ws.plan_reorder(0, 7), Err(WorkspaceError::InvalidIndex { index: 7, len: 3 }));
    }

    #[test]
    fn tag_operations_only_touch_references() {
        let mut ws = workspace();
        let _ = ws.begin_update(
            "a",
            &TaskPatch {
                project: Some(Some("Website".to_string())),
                area: Some(Some("Business".to_string())),
                category_id: Some(Some("cat-1".to_string())),
                ..Default::default()
            },
            now(),
        );

        ws.rename_tag(TagKind::Project, "Website", Some("Web"), now());
        assert_eq!(ws.task("a").unwrap().project.as_deref(), Some("Web"));

        ws.detach_tag(TagKind::Area, "Business", now());
        ws.detach_category("cat-1", now());
        let a = ws.task("a").unwrap();
        assert_eq!(a.area, None);
        assert_eq!(a.category_id, None);
        assert_eq!(ws.tasks().count(), 3);
    }

    #[test]
    fn tag_rewrites_survive_a_rollback_of_a_pending_update() {
        let mut a = task("a", "Alpha");
        a.project = Some("Website".to_string());
        a.category_id = Some("cat-1".to_string());
        let mut ws = Workspace::new(vec![a]);

        let ticket = ws.begin_update("a", &rename("Local"), now()).unwrap();
        ws.rename_tag(TagKind::Project, "Website", Some("Web"), now());
        ws.detach_category("cat-1", now());
        ws.rollback(ticket);

        let a = ws.task("a").unwrap();
        assert_eq!(a.title, "Alpha");
        assert_eq!(a.project.as_deref(), Some("Web"));
        assert_eq!(a.category_id, None);
    }

    #[test]
    fn reorder_skips_records_still_being_created() {
        let mut ws = workspace();
        let new = NewTask { title: "Fresh".to_string(), ..Default::default() };
        let ticket = ws.begin_create("user-1", &new, now());

        let plan = ws.plan_reorder(0, 2).unwrap();
        assert!(plan.iter().all(|(id, _)| id != ticket.task_id()));
        assert_eq!(
            plan,
            vec![("b".to_string(), 0), ("c".to_string(), 1), ("a".to_string(), 2)]
        );
        assert_eq!(ws.plan_reorder(0, 3), Err(WorkspaceError::InvalidIndex { index: 3, len: 3 }));
        ws.rollback(ticket);
    }

    #[test]
    fn settings_mutations_merge_and_clear() {
        let mut ws = workspace();
        ws.set_filters(FilterPatch {
            search: Some("alp".to_string()),
            ..Default::default()
        });
        let cal = crate::view::fixtures::calendar();
        assert_eq!(ws.view(&cal).total(), 1);

        ws.clear_filters();
        assert_eq!(ws.settings().filters.search, "");
        assert_eq!(ws.view(&cal).total(), 3);
    }

    #[test]
    fn adopt_adds_unknown_records_and_leaves_pending_ones_alone() {
        let mut ws = workspace();
        ws.adopt(task("d", "Delta"));
        assert_eq!(ws.task("d").unwrap().title, "Delta");

        let _ticket = ws.begin_update("a", &rename("Local"), now()).unwrap();
        ws.adopt(task("a", "Remote"));
        assert_eq!(ws.task("a").unwrap().title, "Local");
    }
}
