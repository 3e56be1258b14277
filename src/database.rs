use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::config::describe_key;
use crate::error::StoreError;
use crate::models::{ConfigItem, NewTask, Task, TaskId, TaskUpdate, User, UserId};
use crate::store::TaskStore;

const DATE_FORMAT: &str = "%Y-%m-%d";

const TASK_COLUMNS: &str = "id, owner_id, title, description, priority, category, status, \
                            due_date, archived, created_at, updated_at";

fn now() -> DateTime<Utc> {
    Utc::now()
}

fn timestamp_to_sql(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn timestamp_from_sql(column: &'static str, value: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt { column, value })
}

fn parse_column<T: std::str::FromStr>(column: &'static str, value: String) -> Result<T, StoreError> {
    value.parse().map_err(|_| StoreError::Corrupt { column, value })
}

/// Raw task columns as stored; enum and date parsing happens afterwards so
/// a bad value surfaces as `StoreError::Corrupt` instead of a SQL error.
struct TaskRow {
    id: i64,
    owner_id: i64,
    title: String,
    description: String,
    priority: String,
    category: String,
    status: String,
    due_date: Option<String>,
    archived: bool,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(TaskRow {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            priority: row.get(4)?,
            category: row.get(5)?,
            status: row.get(6)?,
            due_date: row.get(7)?,
            archived: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_task(self) -> Result<Task, StoreError> {
        let due_date = match self.due_date {
            Some(value) => Some(
                NaiveDate::parse_from_str(&value, DATE_FORMAT)
                    .map_err(|_| StoreError::Corrupt { column: "due_date", value })?,
            ),
            None => None,
        };
        Ok(Task {
            id: TaskId(self.id),
            owner: UserId(self.owner_id),
            title: self.title,
            description: self.description,
            priority: parse_column("priority", self.priority)?,
            category: parse_column("category", self.category)?,
            status: parse_column("status", self.status)?,
            due_date,
            archived: self.archived,
            created_at: timestamp_from_sql("created_at", self.created_at)?,
            updated_at: timestamp_from_sql("updated_at", self.updated_at)?,
        })
    }
}

fn require_title(title: &str) -> Result<String, StoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::invalid("title", "must not be empty"));
    }
    Ok(title.to_string())
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        log::debug!("opening task database at {}", path.display());
        Self::init(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                login_id TEXT UNIQUE NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY,
                owner_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                priority TEXT NOT NULL DEFAULT 'Medium',
                category TEXT NOT NULL DEFAULT 'Work',
                status TEXT NOT NULL DEFAULT 'To Do',
                due_date TEXT,
                archived INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks (owner_id)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS configs (
                key_name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                description TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        Ok(Database { conn })
    }

    // Users

    pub fn register_user(&mut self, login_id: &str) -> Result<User, StoreError> {
        let login_id = login_id.trim();
        if login_id.is_empty() {
            return Err(StoreError::invalid("login id", "must not be empty"));
        }
        let created_at = now();

        match self.conn.execute(
            "INSERT INTO users (login_id, created_at) VALUES (?1, ?2)",
            params![login_id, timestamp_to_sql(&created_at)],
        ) {
            Ok(_) => {
                log::info!("registered user '{}'", login_id);
                Ok(User {
                    id: UserId(self.conn.last_insert_rowid()),
                    login_id: login_id.to_string(),
                    created_at,
                })
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::UserExists(login_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_user(&self, login_id: &str) -> Result<User, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, login_id, created_at FROM users WHERE login_id = ?1",
                [login_id.trim()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
            )
            .optional()?;

        match row {
            Some((id, login_id, created_at)) => Ok(User {
                id: UserId(id),
                login_id,
                created_at: timestamp_from_sql("created_at", created_at)?,
            }),
            None => Err(StoreError::UserNotFound(login_id.to_string())),
        }
    }

    pub fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, login_id, created_at FROM users ORDER BY login_id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?;

        let mut users = Vec::new();
        for row in rows {
            let (id, login_id, created_at) = row?;
            users.push(User {
                id: UserId(id),
                login_id,
                created_at: timestamp_from_sql("created_at", created_at)?,
            });
        }
        Ok(users)
    }

    // Configs

    pub fn set_config(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO configs (key_name, value, description) VALUES (?1, ?2, ?3)
             ON CONFLICT (key_name) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP",
            params![key, value, describe_key(key)],
        )?;
        log::debug!("config '{}' set", key);
        Ok(())
    }

    pub fn get_config(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM configs WHERE key_name = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn list_configs(&self) -> Result<Vec<ConfigItem>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT key_name, value, description, created_at, updated_at
             FROM configs ORDER BY key_name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ConfigItem {
                key_name: row.get(0)?,
                value: row.get(1)?,
                description: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })?;

        let mut configs = Vec::new();
        for row in rows {
            configs.push(row?);
        }
        Ok(configs)
    }

    /// Returns whether a value was actually removed.
    pub fn delete_config(&self, key: &str) -> Result<bool, StoreError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM configs WHERE key_name = ?1", [key])?;
        Ok(rows_affected > 0)
    }

    fn write_task(&self, task: &Task) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE tasks SET title = ?1, description = ?2, priority = ?3, category = ?4,
                status = ?5, due_date = ?6, archived = ?7, updated_at = ?8
             WHERE id = ?9 AND owner_id = ?10",
            params![
                task.title,
                task.description,
                task.priority.label(),
                task.category.label(),
                task.status.label(),
                task.due_date.map(|d| d.format(DATE_FORMAT).to_string()),
                task.archived,
                timestamp_to_sql(&task.updated_at),
                task.id.0,
                task.owner.0,
            ],
        )?;
        Ok(())
    }
}

impl TaskStore for Database {
    fn list_tasks(&self, owner: UserId) -> Result<Vec<Task>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map([owner.0], TaskRow::from_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.into_task()?);
        }
        Ok(tasks)
    }

    fn get_task(&self, owner: UserId, id: TaskId) -> Result<Task, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND owner_id = ?2"),
                params![id.0, owner.0],
                TaskRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => row.into_task(),
            None => Err(StoreError::not_found(id)),
        }
    }

    fn create_task(&mut self, owner: UserId, fields: NewTask) -> Result<Task, StoreError> {
        let title = require_title(&fields.title)?;
        let stamp = timestamp_to_sql(&now());

        self.conn.execute(
            "INSERT INTO tasks (owner_id, title, description, priority, category, status,
                due_date, archived, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)",
            params![
                owner.0,
                title,
                fields.description.unwrap_or_default(),
                fields.priority.unwrap_or_default().label(),
                fields.category.unwrap_or_default().label(),
                fields.status.unwrap_or_default().label(),
                fields.due_date.map(|d| d.format(DATE_FORMAT).to_string()),
                stamp,
            ],
        )?;

        let id = TaskId(self.conn.last_insert_rowid());
        log::debug!("created task {} for owner {}", id, owner.0);
        self.get_task(owner, id)
    }

    fn update_task(&mut self, owner: UserId, id: TaskId, update: TaskUpdate) -> Result<Task, StoreError> {
        let mut task = self.get_task(owner, id)?;
        if update.is_empty() {
            return Ok(task);
        }

        if let Some(title) = update.title {
            task.title = require_title(&title)?;
        }
        if let Some(description) = update.description {
            task.description = description;
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if let Some(category) = update.category {
            task.category = category;
        }
        if let Some(status) = update.status {
            task.status = status;
        }
        if let Some(due_date) = update.due_date {
            task.due_date = due_date;
        }
        if let Some(archived) = update.archived {
            task.archived = archived;
        }
        task.updated_at = now();

        self.write_task(&task)?;
        log::debug!("updated task {}", id);
        self.get_task(owner, id)
    }

    fn delete_task(&mut self, owner: UserId, id: TaskId) -> Result<(), StoreError> {
        let rows_affected = self.conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
            params![id.0, owner.0],
        )?;

        if rows_affected == 0 {
            return Err(StoreError::not_found(id));
        }
        log::debug!("deleted task {}", id);
        Ok(())
    }
}
