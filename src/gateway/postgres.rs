use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::{GatewayError, GatewayResult, StoreStats, TaskGateway};
use crate::models::tag::{Category, CategoryPatch, NewCategory, NewTag, Tag, TagKind, TagPatch};
use crate::models::task::{NewTask, Priority, Task, TaskPatch};

const TODO_COLUMNS: &str = "id, user_id, title, description, completed, completed_at, priority, \
     due_date, due_time, start_date, start_time, end_date, assignees, area, project, category_id, \
     position, created_at, updated_at";

const CATEGORY_COLUMNS: &str = "id, user_id, name, color, icon, position, created_at, updated_at";

#[derive(Debug, FromRow)]
struct TodoRow {
    id: String,
    user_id: String,
    title: String,
    description: Option<String>,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    priority: i16,
    due_date: Option<DateTime<Utc>>,
    due_time: Option<String>,
    start_date: Option<DateTime<Utc>>,
    start_time: Option<String>,
    end_date: Option<DateTime<Utc>>,
    assignees: Option<Vec<String>>,
    area: Option<String>,
    project: Option<String>,
    category_id: Option<String>,
    position: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TodoRow> for Task {
    type Error = GatewayError;

    fn try_from(row: TodoRow) -> Result<Self, Self::Error> {
        let priority = Priority::try_from(row.priority)
            .map_err(|e| GatewayError::Corrupt(format!("todo {}: {}", row.id, e)))?;
        Ok(Task {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            completed: row.completed,
            completed_at: row.completed_at,
            priority,
            due_date: row.due_date,
            due_time: row.due_time,
            start_date: row.start_date,
            start_time: row.start_time,
            end_date: row.end_date,
            assignees: row.assignees.unwrap_or_default(),
            area: row.area,
            project: row.project,
            category_id: row.category_id,
            position: row.position,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TagRow {
    id: String,
    user_id: String,
    name: String,
    color: String,
    allowed_assignees: Option<Vec<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TagRow {
    fn into_tag(self, kind: TagKind) -> Tag {
        Tag {
            id: self.id,
            user_id: self.user_id,
            kind,
            name: self.name,
            color: self.color,
            allowed_assignees: self.allowed_assignees.unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: String,
    user_id: String,
    name: String,
    color: String,
    icon: Option<String>,
    position: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            color: row.color,
            icon: row.icon,
            position: row.position,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Table holding each tag kind, plus the select list. Areas carry no
/// assignee allow-list, so the column is synthesized.
fn tag_table(kind: TagKind) -> (&'static str, &'static str) {
    match kind {
        TagKind::Project => (
            "projects",
            "id, user_id, name, color, allowed_assignees, created_at, updated_at",
        ),
        TagKind::Area => (
            "areas",
            "id, user_id, name, color, NULL::TEXT[] AS allowed_assignees, created_at, updated_at",
        ),
    }
}

/// Column on `todos` that references a tag by name.
fn tag_column(kind: TagKind) -> &'static str {
    match kind {
        TagKind::Project => "project",
        TagKind::Area => "area",
    }
}

fn missing(what: &str, id: &str) -> GatewayError {
    GatewayError::NotFound(format!("{} {}", what, id))
}

/// Gateway over the hosted Postgres store.
#[derive(Debug, Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        PgGateway { pool }
    }
}

#[async_trait]
impl TaskGateway for PgGateway {
    async fn list_tasks(&self, user_id: &str) -> GatewayResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TodoRow>(&format!(
            "SELECT {} FROM todos WHERE user_id = $1 ORDER BY position ASC",
            TODO_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Task::try_from).collect()
    }

    async fn get_task(&self, user_id: &str, id: &str) -> GatewayResult<Task> {
        let row = sqlx::query_as::<_, TodoRow>(&format!(
            "SELECT {} FROM todos WHERE id = $1 AND user_id = $2",
            TODO_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| missing("Task", id))?;

        Task::try_from(row)
    }

    async fn create_task(&self, user_id: &str, new: &NewTask) -> GatewayResult<Task> {
        let row = sqlx::query_as::<_, TodoRow>(&format!(
            "INSERT INTO todos (id, user_id, title, description, priority, due_date, due_time, \
                 start_date, start_time, end_date, assignees, area, project, category_id, position) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
                 COALESCE($15, (SELECT COALESCE(MAX(position) + 1, 0) FROM todos WHERE user_id = $2))) \
             RETURNING {}",
            TODO_COLUMNS
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(new.title.trim())
        .bind(&new.description)
        .bind(i16::from(new.priority))
        .bind(new.due_date)
        .bind(&new.due_time)
        .bind(new.start_date)
        .bind(&new.start_time)
        .bind(new.end_date)
        .bind(&new.assignees)
        .bind(&new.area)
        .bind(&new.project)
        .bind(&new.category_id)
        .bind(new.position)
        .fetch_one(&self.pool)
        .await?;

        Task::try_from(row)
    }

    async fn update_task(&self, user_id: &str, id: &str, patch: &TaskPatch) -> GatewayResult<Task> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE todos SET updated_at = NOW()");

        if let Some(ref title) = patch.title {
            query.push(", title = ").push_bind(title.trim().to_string());
        }
        if let Some(ref description) = patch.description {
            query.push(", description = ").push_bind(description.clone());
        }
        if let Some(completed) = patch.completed {
            query.push(", completed = ").push_bind(completed);
            query
                .push(", completed_at = CASE WHEN ")
                .push_bind(completed)
                .push(" THEN COALESCE(completed_at, NOW()) ELSE NULL END");
        }
        if let Some(priority) = patch.priority {
            query.push(", priority = ").push_bind(i16::from(priority));
        }
        if let Some(due_date) = patch.due_date {
            query.push(", due_date = ").push_bind(due_date);
        }
        if let Some(ref due_time) = patch.due_time {
            query.push(", due_time = ").push_bind(due_time.clone());
        }
        if let Some(start_date) = patch.start_date {
            query.push(", start_date = ").push_bind(start_date);
        }
        if let Some(ref start_time) = patch.start_time {
            query.push(", start_time = ").push_bind(start_time.clone());
        }
        if let Some(end_date) = patch.end_date {
            query.push(", end_date = ").push_bind(end_date);
        }
        if let Some(ref assignees) = patch.assignees {
            query.push(", assignees = ").push_bind(assignees.clone());
        }
        if let Some(ref area) = patch.area {
            query.push(", area = ").push_bind(area.clone());
        }
        if let Some(ref project) = patch.project {
            query.push(", project = ").push_bind(project.clone());
        }
        if let Some(ref category_id) = patch.category_id {
            query.push(", category_id = ").push_bind(category_id.clone());
        }
        if let Some(position) = patch.position {
            query.push(", position = ").push_bind(position);
        }

        query.push(" WHERE id = ").push_bind(id.to_string());
        query.push(" AND user_id = ").push_bind(user_id.to_string());
        query.push(" RETURNING ").push(TODO_COLUMNS);

        let row = query
            .build_query_as::<TodoRow>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| missing("Task", id))?;

        Task::try_from(row)
    }

    async fn delete_task(&self, user_id: &str, id: &str) -> GatewayResult<()> {
        let result = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(missing("Task", id));
        }
        Ok(())
    }

    async fn toggle_task(&self, user_id: &str, id: &str) -> GatewayResult<Task> {
        // Every SET expression sees the pre-update row, so this flips atomically.
        let row = sqlx::query_as::<_, TodoRow>(&format!(
            "UPDATE todos SET completed = NOT completed, \
                 completed_at = CASE WHEN completed THEN NULL ELSE NOW() END, \
                 updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {}",
            TODO_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| missing("Task", id))?;

        Task::try_from(row)
    }

    async fn set_positions(&self, user_id: &str, positions: &[(String, i32)]) -> GatewayResult<()> {
        let mut tx = self.pool.begin().await?;
        for (id, position) in positions {
            let result = sqlx::query(
                "UPDATE todos SET position = $1, updated_at = NOW() WHERE id = $2 AND user_id = $3",
            )
            .bind(position)
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // Dropping the transaction rolls it back.
                return Err(missing("Task", id));
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_tags(&self, user_id: &str, kind: TagKind) -> GatewayResult<Vec<Tag>> {
        let (table, columns) = tag_table(kind);
        let rows = sqlx::query_as::<_, TagRow>(&format!(
            "SELECT {} FROM {} WHERE user_id = $1 ORDER BY name ASC",
            columns, table
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.into_tag(kind)).collect())
    }

    async fn create_tag(&self, user_id: &str, kind: TagKind, new: &NewTag) -> GatewayResult<Tag> {
        let (table, columns) = tag_table(kind);
        let row = match kind {
            TagKind::Project => {
                sqlx::query_as::<_, TagRow>(&format!(
                    "INSERT INTO {} (id, user_id, name, color, allowed_assignees) \
                     VALUES ($1, $2, $3, $4, $5) RETURNING {}",
                    table, columns
                ))
                .bind(Uuid::new_v4().to_string())
                .bind(user_id)
                .bind(new.name.trim())
                .bind(&new.color)
                .bind(&new.allowed_assignees)
                .fetch_one(&self.pool)
                .await?
            }
            TagKind::Area => {
                sqlx::query_as::<_, TagRow>(&format!(
                    "INSERT INTO {} (id, user_id, name, color) VALUES ($1, $2, $3, $4) RETURNING {}",
                    table, columns
                ))
                .bind(Uuid::new_v4().to_string())
                .bind(user_id)
                .bind(new.name.trim())
                .bind(&new.color)
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(row.into_tag(kind))
    }

    async fn update_tag(&self, user_id: &str, kind: TagKind, id: &str, patch: &TagPatch) -> GatewayResult<Tag> {
        let (table, columns) = tag_table(kind);
        let mut tx = self.pool.begin().await?;

        let old_name: String = sqlx::query(&format!(
            "SELECT name FROM {} WHERE id = $1 AND user_id = $2 FOR UPDATE",
            table
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| missing(kind.label(), id))?
        .get("name");

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!("UPDATE {} SET updated_at = NOW()", table));
        if let Some(ref name) = patch.name {
            query.push(", name = ").push_bind(name.trim().to_string());
        }
        if let Some(ref color) = patch.color {
            query.push(", color = ").push_bind(color.clone());
        }
        if kind == TagKind::Project {
            if let Some(ref allowed) = patch.allowed_assignees {
                query.push(", allowed_assignees = ").push_bind(allowed.clone());
            }
        }
        query.push(" WHERE id = ").push_bind(id.to_string());
        query.push(" AND user_id = ").push_bind(user_id.to_string());
        query.push(" RETURNING ").push(columns);

        let tag = query
            .build_query_as::<TagRow>()
            .fetch_one(&mut *tx)
            .await?
            .into_tag(kind);

        if tag.name != old_name {
            sqlx::query(&format!(
                "UPDATE todos SET {column} = $1, updated_at = NOW() WHERE user_id = $2 AND {column} = $3",
                column = tag_column(kind)
            ))
            .bind(&tag.name)
            .bind(user_id)
            .bind(&old_name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(tag)
    }

    async fn delete_tag(&self, user_id: &str, kind: TagKind, id: &str) -> GatewayResult<Tag> {
        let (table, columns) = tag_table(kind);
        let mut tx = self.pool.begin().await?;

        let tag = sqlx::query_as::<_, TagRow>(&format!(
            "DELETE FROM {} WHERE id = $1 AND user_id = $2 RETURNING {}",
            table, columns
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| missing(kind.label(), id))?
        .into_tag(kind);

        sqlx::query(&format!(
            "UPDATE todos SET {column} = NULL, updated_at = NOW() WHERE user_id = $1 AND {column} = $2",
            column = tag_column(kind)
        ))
        .bind(user_id)
        .bind(&tag.name)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(tag)
    }

    async fn list_categories(&self, user_id: &str) -> GatewayResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {} FROM categories WHERE user_id = $1 ORDER BY position ASC",
            CATEGORY_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn create_category(&self, user_id: &str, new: &NewCategory) -> GatewayResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "INSERT INTO categories (id, user_id, name, color, icon, position) \
             VALUES ($1, $2, $3, $4, $5, \
                 COALESCE($6, (SELECT COALESCE(MAX(position) + 1, 0) FROM categories WHERE user_id = $2))) \
             RETURNING {}",
            CATEGORY_COLUMNS
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(new.name.trim())
        .bind(&new.color)
        .bind(&new.icon)
        .bind(new.position)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update_category(&self, user_id: &str, id: &str, patch: &CategoryPatch) -> GatewayResult<Category> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE categories SET updated_at = NOW()");
        if let Some(ref name) = patch.name {
            query.push(", name = ").push_bind(name.trim().to_string());
        }
        if let Some(ref color) = patch.color {
            query.push(", color = ").push_bind(color.clone());
        }
        if let Some(ref icon) = patch.icon {
            query.push(", icon = ").push_bind(icon.clone());
        }
        if let Some(position) = patch.position {
            query.push(", position = ").push_bind(position);
        }
        query.push(" WHERE id = ").push_bind(id.to_string());
        query.push(" AND user_id = ").push_bind(user_id.to_string());
        query.push(" RETURNING ").push(CATEGORY_COLUMNS);

        let row = query
            .build_query_as::<CategoryRow>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| missing("Category", id))?;

        Ok(row.into())
    }

    async fn delete_category(&self, user_id: &str, id: &str) -> GatewayResult<Category> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "DELETE FROM categories WHERE id = $1 AND user_id = $2 RETURNING {}",
            CATEGORY_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| missing("Category", id))?;

        sqlx::query("UPDATE todos SET category_id = NULL, updated_at = NOW() WHERE user_id = $1 AND category_id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn stats(&self) -> GatewayResult<StoreStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM todos) as todo_count,
                (SELECT COUNT(*) FROM projects) as project_count,
                (SELECT COUNT(*) FROM areas) as area_count,
                (SELECT COUNT(*) FROM categories) as category_count
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            todos: row.get::<i64, _>("todo_count"),
            projects: row.get::<i64, _>("project_count"),
            areas: row.get::<i64, _>("area_count"),
            categories: row.get::<i64, _>("category_count"),
        })
    }
}
