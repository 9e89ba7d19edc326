//! Task snapshot codec backed by a single-file SQLite database.
//!
//! # Responsibility
//! - Write the whole task collection (with subtasks and id watermarks) to a
//!   path so that readers only ever see a complete file.
//! - Rebuild the collection from that file, rejecting damaged content.
//!
//! # Invariants
//! - `save` writes a sibling temp file and renames it over the target.
//! - `load` on a missing file returns an empty snapshot; every other failure
//!   is surfaced as `PersistenceError`.
//! - Loaded rows go through `TryFrom<TaskData>`, so invalid persisted state
//!   is rejected instead of masked.

use crate::db::{open_db, open_db_read_only, DbError};
use crate::model::ids::{IdWatermarks, SubtaskId, TaskId};
use crate::model::subtask::SubtaskData;
use crate::model::tag::{Tag, TagData};
use crate::model::task::{Task, TaskData};
use log::{error, info};
use rusqlite::{params, Connection, Row};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

const META_LAST_TASK_ID: &str = "last_task_id";
const META_LAST_SUBTASK_ID: &str = "last_subtask_id";

pub type PersistResult<T> = Result<T, PersistenceError>;

/// Failure to read or write a task snapshot.
#[derive(Debug)]
pub enum PersistenceError {
    Io { path: PathBuf, source: io::Error },
    Db(DbError),
    InvalidPath(PathBuf),
    InvalidData(String),
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at `{}`: {source}", path.display()),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidPath(path) => {
                write!(f, "`{}` is not a usable snapshot file path", path.display())
            }
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            Self::InvalidPath(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for PersistenceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Immutable copy of the store contents handed to persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub tasks: Vec<Task>,
    pub watermarks: IdWatermarks,
}

/// Storage backend for whole-collection snapshots.
pub trait TaskPersistence {
    fn load(&self) -> PersistResult<TaskSnapshot>;
    fn save(&self, snapshot: &TaskSnapshot) -> PersistResult<()>;
}

/// Snapshot file at a fixed path.
#[derive(Debug, Clone)]
pub struct SqliteFilePersistence {
    path: PathBuf,
}

impl SqliteFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskPersistence for SqliteFilePersistence {
    fn load(&self) -> PersistResult<TaskSnapshot> {
        load(&self.path)
    }

    fn save(&self, snapshot: &TaskSnapshot) -> PersistResult<()> {
        save(&self.path, snapshot)
    }
}

/// Writes `snapshot` to `path`, replacing any previous file atomically.
///
/// # Side effects
/// - Creates missing parent directories.
/// - Emits `snapshot_save` logging events with task count and duration.
pub fn save(path: &Path, snapshot: &TaskSnapshot) -> PersistResult<()> {
    let started_at = Instant::now();
    let temp_path = temp_path_for(path)?;

    let result = ensure_parent_dir(path)
        .and_then(|()| write_snapshot_file(&temp_path, snapshot))
        .and_then(|()| {
            fs::rename(&temp_path, path).map_err(|source| PersistenceError::Io {
                path: path.to_path_buf(),
                source,
            })
        });

    match &result {
        Ok(()) => info!(
            "event=snapshot_save module=repo status=ok tasks={} duration_ms={}",
            snapshot.tasks.len(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => {
            // Best effort: the temp file may not exist if the failure came first.
            let _ = fs::remove_file(&temp_path);
            error!(
                "event=snapshot_save module=repo status=error tasks={} duration_ms={} error={}",
                snapshot.tasks.len(),
                started_at.elapsed().as_millis(),
                err
            );
        }
    }

    result
}

/// Reads the snapshot stored at `path`.
///
/// Returns an empty snapshot when `path` does not exist (first run).
pub fn load(path: &Path) -> PersistResult<TaskSnapshot> {
    let started_at = Instant::now();
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => {
            return Err(PersistenceError::InvalidPath(path.to_path_buf()));
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!("event=snapshot_load module=repo status=ok outcome=first_run tasks=0");
            return Ok(TaskSnapshot::default());
        }
        Err(source) => {
            return Err(PersistenceError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    let result = open_db_read_only(path)
        .map_err(PersistenceError::from)
        .and_then(|conn| read_snapshot(&conn));

    match &result {
        Ok(snapshot) => info!(
            "event=snapshot_load module=repo status=ok tasks={} duration_ms={}",
            snapshot.tasks.len(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=snapshot_load module=repo status=error duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }

    result
}

/// Replaces all snapshot rows on `conn` inside one transaction.
pub fn write_snapshot(conn: &mut Connection, snapshot: &TaskSnapshot) -> PersistResult<()> {
    let tx = conn.transaction()?;
    tx.execute_batch("DELETE FROM subtasks; DELETE FROM tasks; DELETE FROM store_meta;")?;

    {
        let mut insert_task = tx.prepare(
            "INSERT INTO tasks (
                id,
                position,
                title,
                description,
                completed,
                start_time,
                expected_end_time,
                actual_end_time,
                heat_index,
                tag_name,
                tag_color,
                tag_icon
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
        )?;
        let mut insert_subtask = tx.prepare(
            "INSERT INTO subtasks (
                id,
                task_id,
                position,
                title,
                description,
                completed,
                start_time,
                actual_end_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        )?;

        for (position, task) in snapshot.tasks.iter().enumerate() {
            let tag = task.tag();
            insert_task.execute(params![
                task.id().0,
                position_to_db(position)?,
                task.title(),
                task.description(),
                bool_to_int(task.is_completed()),
                task.start_time(),
                task.expected_end_time(),
                task.actual_end_time(),
                i64::from(task.heat_index()),
                tag.map(Tag::name),
                tag.map(Tag::color),
                tag.and_then(Tag::icon),
            ])?;

            for (sub_position, subtask) in task.subtasks().iter().enumerate() {
                insert_subtask.execute(params![
                    subtask.id().0,
                    task.id().0,
                    position_to_db(sub_position)?,
                    subtask.title(),
                    subtask.description(),
                    bool_to_int(subtask.is_completed()),
                    subtask.start_time(),
                    subtask.actual_end_time(),
                ])?;
            }
        }
    }

    let marks = snapshot
        .watermarks
        .max(IdWatermarks::covering(&snapshot.tasks));
    tx.execute(
        "INSERT INTO store_meta (key, value) VALUES (?1, ?2), (?3, ?4);",
        params![
            META_LAST_TASK_ID,
            marks.last_task_id,
            META_LAST_SUBTASK_ID,
            marks.last_subtask_id,
        ],
    )?;

    tx.commit()?;
    Ok(())
}

/// Reads every snapshot row on `conn` back into validated entities.
pub fn read_snapshot(conn: &Connection) -> PersistResult<TaskSnapshot> {
    let mut subtasks_by_task = read_subtasks(conn)?;

    let mut stmt = conn.prepare(
        "SELECT
            id,
            title,
            description,
            completed,
            start_time,
            expected_end_time,
            actual_end_time,
            heat_index,
            tag_name,
            tag_color,
            tag_icon
        FROM tasks
        ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut tasks = Vec::new();

    while let Some(row) = rows.next()? {
        let mut data = parse_task_row(row)?;
        data.subtasks = subtasks_by_task.remove(&data.id.0).unwrap_or_default();
        let task_id = data.id;
        let task = Task::try_from(data)
            .map_err(|err| PersistenceError::InvalidData(format!("task {task_id}: {err}")))?;
        tasks.push(task);
    }

    if let Some(orphan_task_id) = subtasks_by_task.keys().next() {
        return Err(PersistenceError::InvalidData(format!(
            "subtasks reference missing task {orphan_task_id}"
        )));
    }

    let watermarks = read_watermarks(conn)?.max(IdWatermarks::covering(&tasks));
    Ok(TaskSnapshot { tasks, watermarks })
}

fn write_snapshot_file(temp_path: &Path, snapshot: &TaskSnapshot) -> PersistResult<()> {
    let mut conn = open_db(temp_path)?;
    write_snapshot(&mut conn, snapshot)?;
    conn.close().map_err(|(_, err)| PersistenceError::from(err))?;
    Ok(())
}

fn read_subtasks(conn: &Connection) -> PersistResult<HashMap<i64, Vec<SubtaskData>>> {
    let mut stmt = conn.prepare(
        "SELECT
            id,
            task_id,
            title,
            description,
            completed,
            start_time,
            actual_end_time
        FROM subtasks
        ORDER BY task_id ASC, position ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut grouped: HashMap<i64, Vec<SubtaskData>> = HashMap::new();

    while let Some(row) = rows.next()? {
        let task_id: i64 = row.get("task_id")?;
        let data = SubtaskData {
            id: SubtaskId(row.get("id")?),
            parent_id: TaskId(task_id),
            title: row.get("title")?,
            description: row.get("description")?,
            completed: int_to_bool(row.get("completed")?, "subtasks.completed")?,
            start_time: row.get("start_time")?,
            actual_end_time: row.get("actual_end_time")?,
        };
        grouped.entry(task_id).or_default().push(data);
    }

    Ok(grouped)
}

fn parse_task_row(row: &Row<'_>) -> PersistResult<TaskData> {
    let id = TaskId(row.get("id")?);

    let heat_raw: i64 = row.get("heat_index")?;
    let heat_index = u32::try_from(heat_raw).map_err(|_| {
        PersistenceError::InvalidData(format!("invalid heat_index `{heat_raw}` for task {id}"))
    })?;

    let tag = match (
        row.get::<_, Option<String>>("tag_name")?,
        row.get::<_, Option<String>>("tag_color")?,
    ) {
        (None, None) => None,
        (Some(name), Some(color)) => {
            let data = TagData {
                name,
                color,
                icon: row.get("tag_icon")?,
            };
            Some(Tag::try_from(data).map_err(|err| {
                PersistenceError::InvalidData(format!("tag of task {id}: {err}"))
            })?)
        }
        _ => {
            return Err(PersistenceError::InvalidData(format!(
                "task {id} has a partial tag (name and color must both be set)"
            )));
        }
    };

    Ok(TaskData {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        completed: int_to_bool(row.get("completed")?, "tasks.completed")?,
        start_time: row.get("start_time")?,
        expected_end_time: row.get("expected_end_time")?,
        actual_end_time: row.get("actual_end_time")?,
        heat_index,
        tag,
        subtasks: Vec::new(),
    })
}

fn read_watermarks(conn: &Connection) -> PersistResult<IdWatermarks> {
    let mut stmt = conn.prepare("SELECT key, value FROM store_meta;")?;
    let mut rows = stmt.query([])?;
    let mut marks = IdWatermarks::default();

    while let Some(row) = rows.next()? {
        let key: String = row.get("key")?;
        let value: i64 = row.get("value")?;
        match key.as_str() {
            META_LAST_TASK_ID => marks.last_task_id = value,
            META_LAST_SUBTASK_ID => marks.last_subtask_id = value,
            _ => {}
        }
    }

    Ok(marks)
}

fn ensure_parent_dir(path: &Path) -> PersistResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

fn temp_path_for(path: &Path) -> PersistResult<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| PersistenceError::InvalidPath(path.to_path_buf()))?;
    let temp_name = format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        Uuid::new_v4().simple()
    );
    Ok(path.with_file_name(temp_name))
}

fn position_to_db(position: usize) -> PersistResult<i64> {
    i64::try_from(position)
        .map_err(|_| PersistenceError::InvalidData(format!("position {position} overflows i64")))
}

fn int_to_bool(value: i64, column: &str) -> PersistResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(PersistenceError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::{int_to_bool, temp_path_for};
    use std::path::Path;

    #[test]
    fn temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/data/tasks.data")).unwrap();
        assert_eq!(temp.parent(), Some(Path::new("/data")));
        let name = temp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".tasks.data."));
        assert!(name.ends_with(".tmp"));
    }

    #[test]
    fn temp_path_requires_file_name() {
        assert!(temp_path_for(Path::new("/")).is_err());
    }

    #[test]
    fn int_to_bool_rejects_out_of_range() {
        assert!(int_to_bool(1, "tasks.completed").unwrap());
        assert!(int_to_bool(2, "tasks.completed").is_err());
    }
}
