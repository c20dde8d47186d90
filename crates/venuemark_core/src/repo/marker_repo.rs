//! Point store contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the read/write contract the engine needs from marker persistence.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Marker::validate()` before SQL mutations.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - `pos_x/pos_y/pos_z` hold the relative offset verbatim.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::marker::{Marker, MarkerId, MarkerValidationError};
use crate::model::pose::RelativeOffset;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const MARKER_SELECT_SQL: &str = "SELECT
    id,
    reference_code,
    name,
    pos_x,
    pos_y,
    pos_z,
    created_by,
    created_at
FROM markers";

pub type RepoResult<T> = Result<T, RepoError>;

/// Point store failure.
#[derive(Debug)]
pub enum RepoError {
    Validation(MarkerValidationError),
    Db(DbError),
    NotFound(MarkerId),
    InvalidData(String),
    /// Connection was not opened through `db::open_db*`.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Store backend is unreachable (network bridges, test doubles).
    Unavailable(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "marker not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted marker data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::Unavailable(message) => write!(f, "point store unavailable: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MarkerValidationError> for RepoError {
    fn from(value: MarkerValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Marker lookup for one reference location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerQuery {
    pub reference_code: String,
    /// Exact name match when set.
    pub name: Option<String>,
}

impl MarkerQuery {
    pub fn for_reference(reference_code: impl Into<String>) -> Self {
        Self {
            reference_code: reference_code.into(),
            name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Store-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total_markers: u64,
    /// Distinct reference codes with at least one marker.
    pub total_references: u64,
}

/// Marker persistence contract used by the engine.
pub trait PointStore {
    /// Markers of one reference code, oldest first.
    fn query(&self, query: &MarkerQuery) -> RepoResult<Vec<Marker>>;
    fn insert(&self, marker: &Marker) -> RepoResult<MarkerId>;
    fn delete(&self, id: MarkerId) -> RepoResult<()>;
    /// Removes every marker of every reference; returns the removed count.
    fn clear_all(&self) -> RepoResult<usize>;
    /// Distinct non-null names under one reference code, sorted.
    fn distinct_names(&self, reference_code: &str) -> RepoResult<Vec<String>>;
    fn stats(&self) -> RepoResult<StoreStats>;
}

/// SQLite-backed point store.
pub struct SqlitePointStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePointStore<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version is not the latest.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let actual_version = current_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl PointStore for SqlitePointStore<'_> {
    fn query(&self, query: &MarkerQuery) -> RepoResult<Vec<Marker>> {
        let mut sql = format!("{MARKER_SELECT_SQL} WHERE reference_code = ?");
        let mut bind_values = vec![Value::Text(query.reference_code.clone())];

        if let Some(name) = &query.name {
            sql.push_str(" AND name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut markers = Vec::new();
        while let Some(row) = rows.next()? {
            markers.push(parse_marker_row(row)?);
        }
        Ok(markers)
    }

    fn insert(&self, marker: &Marker) -> RepoResult<MarkerId> {
        marker.validate()?;

        self.conn.execute(
            "INSERT INTO markers (
                id,
                reference_code,
                name,
                pos_x,
                pos_y,
                pos_z,
                created_by,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                marker.id.to_string(),
                marker.reference_code.as_str(),
                marker.name.as_deref(),
                marker.relative_offset.x,
                marker.relative_offset.y,
                marker.relative_offset.z,
                marker.created_by.as_str(),
                marker.created_at,
            ],
        )?;
        Ok(marker.id)
    }

    fn delete(&self, id: MarkerId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM markers WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn clear_all(&self) -> RepoResult<usize> {
        Ok(self.conn.execute("DELETE FROM markers;", [])?)
    }

    fn distinct_names(&self, reference_code: &str) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT name
             FROM markers
             WHERE reference_code = ?1 AND name IS NOT NULL
             ORDER BY name ASC;",
        )?;
        let names = stmt
            .query_map([reference_code], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn stats(&self) -> RepoResult<StoreStats> {
        let (total_markers, total_references) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT reference_code) FROM markers;",
            [],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        Ok(StoreStats {
            total_markers: total_markers.max(0) as u64,
            total_references: total_references.max(0) as u64,
        })
    }
}

fn parse_marker_row(row: &Row<'_>) -> RepoResult<Marker> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in markers.id"))
    })?;

    let marker = Marker {
        id,
        name: row.get("name")?,
        reference_code: row.get("reference_code")?,
        relative_offset: RelativeOffset::new(
            row.get("pos_x")?,
            row.get("pos_y")?,
            row.get("pos_z")?,
        ),
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
    };
    marker
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("marker {id}: {err}")))?;
    Ok(marker)
}
