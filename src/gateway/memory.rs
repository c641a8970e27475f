use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{GatewayError, GatewayResult, StoreStats, TaskGateway};
use crate::models::tag::{Category, CategoryPatch, NewCategory, NewTag, Tag, TagKind, TagPatch};
use crate::models::task::{NewTask, Task, TaskPatch};

#[derive(Debug, Default)]
struct Tables {
    tasks: Vec<Task>,
    tags: Vec<Tag>,
    categories: Vec<Category>,
}

/// Process-local gateway. Used by the test suite and for running the API
/// without a database. `fail_writes` makes every mutating call fail, which is
/// how callers exercise their rollback paths.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        InMemoryGateway {
            tables: RwLock::new(Tables {
                tasks,
                ..Default::default()
            }),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> GatewayResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(GatewayError::Unavailable("writes are disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

fn not_found(what: &str, id: &str) -> GatewayError {
    GatewayError::NotFound(format!("{} {}", what, id))
}

#[async_trait]
impl TaskGateway for InMemoryGateway {
    async fn list_tasks(&self, user_id: &str) -> GatewayResult<Vec<Task>> {
        let tables = self.tables.read().await;
        let mut tasks: Vec<Task> = tables
            .tasks
            .iter()
            .filter(|task| task.user_id == user_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|task| task.position);
        Ok(tasks)
    }

    async fn get_task(&self, user_id: &str, id: &str) -> GatewayResult<Task> {
        let tables = self.tables.read().await;
        tables
            .tasks
            .iter()
            .find(|task| task.user_id == user_id && task.id == id)
            .cloned()
            .ok_or_else(|| not_found("Task", id))
    }

    async fn create_task(&self, user_id: &str, new: &NewTask) -> GatewayResult<Task> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let position = new.position.unwrap_or_else(|| {
            tables
                .tasks
                .iter()
                .filter(|task| task.user_id == user_id)
                .map(|task| task.position + 1)
                .max()
                .unwrap_or(0)
        });
        let task = Task::from_new(Uuid::new_v4().to_string(), user_id, new, position, Utc::now());
        tables.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, user_id: &str, id: &str, patch: &TaskPatch) -> GatewayResult<Task> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let task = tables
            .tasks
            .iter_mut()
            .find(|task| task.user_id == user_id && task.id == id)
            .ok_or_else(|| not_found("Task", id))?;
        task.apply(patch, Utc::now());
        Ok(task.clone())
    }

    async fn delete_task(&self, user_id: &str, id: &str) -> GatewayResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let before = tables.tasks.len();
        tables.tasks.retain(|task| !(task.user_id == user_id && task.id == id));
        if tables.tasks.len() == before {
            return Err(not_found("Task", id));
        }
        Ok(())
    }

    async fn toggle_task(&self, user_id: &str, id: &str) -> GatewayResult<Task> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let task = tables
            .tasks
            .iter_mut()
            .find(|task| task.user_id == user_id && task.id == id)
            .ok_or_else(|| not_found("Task", id))?;
        let now = Utc::now();
        let completed = !task.completed;
        task.set_completed(completed, now);
        task.updated_at = now;
        Ok(task.clone())
    }

    async fn set_positions(&self, user_id: &str, positions: &[(String, i32)]) -> GatewayResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        // Validate everything first so a bad id leaves nothing half-applied.
        for (id, _) in positions {
            if !tables.tasks.iter().any(|task| task.user_id == user_id && &task.id == id) {
                return Err(not_found("Task", id));
            }
        }
        let now = Utc::now();
        for (id, position) in positions {
            if let Some(task) = tables
                .tasks
                .iter_mut()
                .find(|task| task.user_id == user_id && &task.id == id)
            {
                task.position = *position;
                task.updated_at = now;
            }
        }
        Ok(())
    }

    async fn list_tags(&self, user_id: &str, kind: TagKind) -> GatewayResult<Vec<Tag>> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables
            .tags
            .iter()
            .filter(|tag| tag.user_id == user_id && tag.kind == kind)
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn create_tag(&self, user_id: &str, kind: TagKind, new: &NewTag) -> GatewayResult<Tag> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let name = new.name.trim().to_string();
        if tables
            .tags
            .iter()
            .any(|tag| tag.user_id == user_id && tag.kind == kind && tag.name == name)
        {
            return Err(GatewayError::Constraint(format!("{} '{}' already exists", kind.label(), name)));
        }
        let now = Utc::now();
        let tag = Tag {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind,
            name,
            color: new.color.clone(),
            allowed_assignees: match kind {
                TagKind::Project => new.allowed_assignees.clone(),
                TagKind::Area => Vec::new(),
            },
            created_at: now,
            updated_at: now,
        };
        tables.tags.push(tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, user_id: &str, kind: TagKind, id: &str, patch: &TagPatch) -> GatewayResult<Tag> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let tag = tables
            .tags
            .iter_mut()
            .find(|tag| tag.user_id == user_id && tag.kind == kind && tag.id == id)
            .ok_or_else(|| not_found(kind.label(), id))?;
        let old_name = tag.name.clone();
        tag.apply(patch, now);
        let updated = tag.clone();

        if updated.name != old_name {
            for task in tables.tasks.iter_mut().filter(|task| task.user_id == user_id) {
                let slot = match kind {
                    TagKind::Project => &mut task.project,
                    TagKind::Area => &mut task.area,
                };
                if slot.as_deref() == Some(old_name.as_str()) {
                    *slot = Some(updated.name.clone());
                    task.updated_at = now;
                }
            }
        }
        Ok(updated)
    }

    async fn delete_tag(&self, user_id: &str, kind: TagKind, id: &str) -> GatewayResult<Tag> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let index = tables
            .tags
            .iter()
            .position(|tag| tag.user_id == user_id && tag.kind == kind && tag.id == id)
            .ok_or_else(|| not_found(kind.label(), id))?;
        let removed = tables.tags.remove(index);

        let now = Utc::now();
        for task in tables.tasks.iter_mut().filter(|task| task.user_id == user_id) {
            let slot = match kind {
                TagKind::Project => &mut task.project,
                TagKind::Area => &mut task.area,
            };
            if slot.as_deref() == Some(removed.name.as_str()) {
                *slot = None;
                task.updated_at = now;
            }
        }
        Ok(removed)
    }

    async fn list_categories(&self, user_id: &str) -> GatewayResult<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables
            .categories
            .iter()
            .filter(|category| category.user_id == user_id)
            .cloned()
            .collect();
        categories.sort_by_key(|category| category.position);
        Ok(categories)
    }

    async fn create_category(&self, user_id: &str, new: &NewCategory) -> GatewayResult<Category> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let position = new.position.unwrap_or_else(|| {
            tables
                .categories
                .iter()
                .filter(|category| category.user_id == user_id)
                .map(|category| category.position + 1)
                .max()
                .unwrap_or(0)
        });
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: new.name.trim().to_string(),
            color: new.color.clone(),
            icon: new.icon.clone(),
            position,
            created_at: now,
            updated_at: now,
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(&self, user_id: &str, id: &str, patch: &CategoryPatch) -> GatewayResult<Category> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let category = tables
            .categories
            .iter_mut()
            .find(|category| category.user_id == user_id && category.id == id)
            .ok_or_else(|| not_found("Category", id))?;
        category.apply(patch, Utc::now());
        Ok(category.clone())
    }

    async fn delete_category(&self, user_id: &str, id: &str) -> GatewayResult<Category> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let index = tables
            .categories
            .iter()
            .position(|category| category.user_id == user_id && category.id == id)
            .ok_or_else(|| not_found("Category", id))?;
        let removed = tables.categories.remove(index);

        let now = Utc::now();
        for task in tables.tasks.iter_mut() {
            if task.user_id == user_id && task.category_id.as_deref() == Some(id) {
                task.category_id = None;
                task.updated_at = now;
            }
        }
        Ok(removed)
    }

    async fn stats(&self) -> GatewayResult<StoreStats> {
        let tables = self.tables.read().await;
        let count_tags = |kind: TagKind| tables.tags.iter().filter(|tag| tag.kind == kind).count() as i64;
        Ok(StoreStats {
            todos: tables.tasks.len() as i64,
            projects: count_tags(TagKind::Project),
            areas: count_tags(TagKind::Area),
            categories: tables.categories.len() as i64,
        })
    }
}
