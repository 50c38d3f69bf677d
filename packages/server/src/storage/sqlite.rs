//! SQLite-backed storage implementation.
//!
//! Uses `rusqlite` (with bundled SQLite) wrapped in an `Arc<Mutex<Connection>>`
//! to satisfy the `Send + Sync` requirements. All blocking calls are offloaded
//! to a thread-pool via `tokio::task::spawn_blocking`.
//!
//! Paged reads run the core executor inside the blocking task. Rows are pulled
//! from a live `rusqlite::Rows` cursor, so the executor stops reading as soon
//! as the page is full.
//!
//! # Schema
//!
//! - `offices`: one row per office.
//! - `locations` / `location_aliases`: locations and their alternate names.
//! - `rating_templates`: independent parameters and lookup methods are kept
//!   in their delimited column form (`Elev,Stor` and `low,in,high/...`).
//! - `rating_specs`: ratings built on a template; `aliased_item` marks aliases.
//! - `water_users`: water-supply contract holders per project.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use riverdata::{
    single, Group, JoinRow, Location, Office, Page, PagedQuery, ParameterSpec, ProjectId,
    RatingTemplate, RowSource, WaterUser,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    check_template, template_what, LocationAlias, LocationFilter, PageParams, RatingSpec, Storage,
    StorageError, TemplateFilter,
};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS offices (
    name        TEXT PRIMARY KEY,
    long_name   TEXT NOT NULL,
    office_type TEXT NOT NULL,
    reports_to  TEXT
);

CREATE TABLE IF NOT EXISTS locations (
    office_id        TEXT NOT NULL,
    location_id      TEXT NOT NULL,
    latitude         REAL,
    longitude        REAL,
    horizontal_datum TEXT,
    timezone_name    TEXT,
    location_kind    TEXT,
    public_name      TEXT,
    active           INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (office_id, location_id)
);

CREATE TABLE IF NOT EXISTS location_aliases (
    office_id   TEXT NOT NULL,
    location_id TEXT NOT NULL,
    alias_id    TEXT NOT NULL,
    PRIMARY KEY (office_id, location_id, alias_id)
);

CREATE TABLE IF NOT EXISTS rating_templates (
    office_id              TEXT NOT NULL,
    template_id            TEXT NOT NULL,
    version                TEXT NOT NULL,
    description            TEXT,
    dependent_parameter    TEXT NOT NULL,
    independent_parameters TEXT NOT NULL,
    rating_methods         TEXT NOT NULL,
    PRIMARY KEY (office_id, template_id)
);

CREATE TABLE IF NOT EXISTS rating_specs (
    office_id    TEXT NOT NULL,
    rating_id    TEXT NOT NULL,
    template_id  TEXT NOT NULL,
    aliased_item TEXT,
    PRIMARY KEY (office_id, rating_id)
);
CREATE INDEX IF NOT EXISTS idx_rating_specs_template ON rating_specs(office_id, template_id);

CREATE TABLE IF NOT EXISTS water_users (
    office_id   TEXT NOT NULL,
    project_id  TEXT NOT NULL,
    entity_name TEXT NOT NULL,
    water_right TEXT,
    PRIMARY KEY (office_id, project_id, entity_name)
);
";

const LOCATION_COLUMNS: &str = "l.office_id, l.location_id, l.latitude, l.longitude, \
     l.horizontal_datum, l.timezone_name, l.location_kind, l.public_name, l.active";

const TEMPLATE_COLUMNS: &str = "t.office_id, t.template_id, t.version, t.description, \
     t.dependent_parameter, t.independent_parameters, t.rating_methods";

// ---------------------------------------------------------------------------
// SqliteStorage
// ---------------------------------------------------------------------------

/// SQLite-backed implementation of [`Storage`].
///
/// Holds a single database connection protected by a `Mutex`. All operations
/// run inside `spawn_blocking` to avoid blocking the async runtime.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the SQLite database at `path` and apply the schema.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database (data is lost when dropped).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            f(&conn)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StorageError> {
    conn.lock()
        .map_err(|_| StorageError::Internal("sqlite connection lock poisoned".into()))
}

// ---------------------------------------------------------------------------
// Error conversions
// ---------------------------------------------------------------------------

fn map_err(e: rusqlite::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

/// Map a primary-key violation to [`StorageError::Conflict`].
fn map_insert_err(what: String) -> impl FnOnce(rusqlite::Error) -> StorageError {
    move |e| match e.sqlite_error_code() {
        Some(rusqlite::ErrorCode::ConstraintViolation) => {
            StorageError::Conflict(format!("{what} already exists"))
        }
        _ => map_err(e),
    }
}

// ---------------------------------------------------------------------------
// Dynamic query parameter helper
// ---------------------------------------------------------------------------

/// Typed SQL parameter for building dynamic WHERE clauses.
enum SqlParam {
    Text(String),
    Integer(i64),
}

impl rusqlite::ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, Value};
        match self {
            SqlParam::Text(s) => Ok(ToSqlOutput::Owned(Value::Text(s.clone()))),
            SqlParam::Integer(i) => Ok(ToSqlOutput::Owned(Value::Integer(*i))),
        }
    }
}

/// A `WHERE` clause under construction.
struct Where {
    sql: String,
    params: Vec<SqlParam>,
}

impl Where {
    fn new() -> Self {
        Self {
            sql: String::from(" WHERE 1=1"),
            params: Vec::new(),
        }
    }

    fn office(mut self, column: &str, office: Option<&str>) -> Self {
        if let Some(office) = office {
            self.sql.push_str(&format!(" AND UPPER({column}) = UPPER(?)"));
            self.params.push(SqlParam::Text(office.to_string()));
        }
        self
    }

    /// `LIKE` is case-insensitive for ASCII, matching [`riverdata::IdMask`].
    fn like(mut self, column: &str, pattern: Option<String>) -> Self {
        if let Some(pattern) = pattern {
            self.sql.push_str(&format!(" AND {column} LIKE ? ESCAPE '\\'"));
            self.params.push(SqlParam::Text(pattern));
        }
        self
    }

    fn equals_ci(mut self, column: &str, value: &str) -> Self {
        self.sql.push_str(&format!(" AND UPPER({column}) = UPPER(?)"));
        self.params.push(SqlParam::Text(value.to_string()));
        self
    }

    fn push(&mut self, param: SqlParam) {
        self.params.push(param);
    }

    fn refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p as &dyn rusqlite::ToSql).collect()
    }
}

fn location_where(filter: &LocationFilter) -> Where {
    Where::new()
        .office("office_id", filter.office.as_deref())
        .like("location_id", filter.names.as_ref().map(|m| m.to_like()))
}

fn template_where(filter: &TemplateFilter) -> Where {
    Where::new()
        .office("office_id", filter.office.as_deref())
        .like("template_id", filter.id_mask.as_ref().map(|m| m.to_like()))
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Columns 0..=8 as laid out by [`LOCATION_COLUMNS`].
fn location_from_row(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        office_id: row.get(0)?,
        name: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        horizontal_datum: row.get(4)?,
        timezone_name: row.get(5)?,
        location_kind: row.get(6)?,
        public_name: row.get(7)?,
        active: row.get::<_, i64>(8)? != 0,
        aliases: Vec::new(),
    })
}

/// Columns 0..=6 as laid out by [`TEMPLATE_COLUMNS`].
fn template_from_row(row: &Row<'_>) -> Result<RatingTemplate, StorageError> {
    let office_id: String = row.get(0).map_err(map_err)?;
    let id: String = row.get(1).map_err(map_err)?;
    let parameters: String = row.get(5).map_err(map_err)?;
    let methods: String = row.get(6).map_err(map_err)?;
    let specs = ParameterSpec::parse_all(&parameters, &methods).map_err(|e| {
        tracing::warn!(%office_id, template = %id, "stored rating template is malformed: {e}");
        StorageError::Internal(format!("rating template {id}: {e}"))
    })?;
    Ok(RatingTemplate {
        office_id,
        id,
        version: row.get(2).map_err(map_err)?,
        description: row.get(3).map_err(map_err)?,
        dependent_parameter: row.get(4).map_err(map_err)?,
        independent_parameter_specs: specs,
        rating_ids: Vec::new(),
    })
}

/// Stream `sql` into `visit`, mapping each row with `map`.
fn stream<P, C>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
    map: impl Fn(&Row<'_>) -> Result<JoinRow<P, C>, StorageError>,
    visit: &mut dyn FnMut(JoinRow<P, C>) -> ControlFlow<()>,
) -> Result<(), StorageError> {
    let mut stmt = conn.prepare(sql).map_err(map_err)?;
    let mut rows = stmt.query(params).map_err(map_err)?;
    while let Some(row) = rows.next().map_err(map_err)? {
        if visit(map(row)?).is_break() {
            break;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Row sources
// ---------------------------------------------------------------------------

/// `locations` left-joined with `location_aliases`, windowed on locations.
struct LocationRows<'c>(&'c Connection);

impl LocationRows<'_> {
    fn map(row: &Row<'_>) -> Result<JoinRow<Location, String>, StorageError> {
        let location = location_from_row(row).map_err(map_err)?;
        let alias: Option<String> = row.get(9).map_err(map_err)?;
        Ok(JoinRow::new(location, alias))
    }
}

impl RowSource for LocationRows<'_> {
    type Filter = LocationFilter;
    type Parent = Location;
    type Child = String;
    type Error = StorageError;

    fn scan(
        &self,
        filter: &LocationFilter,
        skip_parents: u64,
        limit_hint: u32,
        visit: &mut dyn FnMut(JoinRow<Location, String>) -> ControlFlow<()>,
    ) -> Result<(), StorageError> {
        let mut w = location_where(filter);
        let sql = format!(
            "WITH parents AS (
                 SELECT office_id, location_id FROM locations{}
                 ORDER BY office_id, location_id LIMIT ? OFFSET ?
             )
             SELECT {LOCATION_COLUMNS}, a.alias_id
             FROM parents p
             JOIN locations l ON l.office_id = p.office_id AND l.location_id = p.location_id
             LEFT OUTER JOIN location_aliases a
                 ON a.office_id = l.office_id AND a.location_id = l.location_id
             ORDER BY l.office_id, l.location_id, a.alias_id",
            w.sql
        );
        w.push(SqlParam::Integer(i64::from(limit_hint)));
        w.push(SqlParam::Integer(offset_param(skip_parents)));
        stream(self.0, &sql, &w.refs(), Self::map, visit)
    }

    fn count(&self, filter: &LocationFilter) -> Result<u64, StorageError> {
        let w = location_where(filter);
        let sql = format!("SELECT COUNT(*) FROM locations{}", w.sql);
        let n: i64 = self
            .0
            .query_row(&sql, w.refs().as_slice(), |row| row.get(0))
            .map_err(map_err)?;
        Ok(n as u64)
    }
}

/// `rating_templates` left-joined with non-aliased `rating_specs`, windowed on templates.
struct TemplateRows<'c>(&'c Connection);

impl TemplateRows<'_> {
    fn map(row: &Row<'_>) -> Result<JoinRow<RatingTemplate, String>, StorageError> {
        let template = template_from_row(row)?;
        let rating_id: Option<String> = row.get(7).map_err(map_err)?;
        Ok(JoinRow::new(template, rating_id))
    }
}

const TEMPLATE_JOIN: &str = "LEFT OUTER JOIN rating_specs s
         ON s.office_id = t.office_id AND s.template_id = t.template_id
        AND s.aliased_item IS NULL";

impl RowSource for TemplateRows<'_> {
    type Filter = TemplateFilter;
    type Parent = RatingTemplate;
    type Child = String;
    type Error = StorageError;

    fn scan(
        &self,
        filter: &TemplateFilter,
        skip_parents: u64,
        limit_hint: u32,
        visit: &mut dyn FnMut(JoinRow<RatingTemplate, String>) -> ControlFlow<()>,
    ) -> Result<(), StorageError> {
        let mut w = template_where(filter);
        let sql = format!(
            "WITH parents AS (
                 SELECT office_id, template_id FROM rating_templates{}
                 ORDER BY office_id, template_id LIMIT ? OFFSET ?
             )
             SELECT {TEMPLATE_COLUMNS}, s.rating_id
             FROM parents p
             JOIN rating_templates t ON t.office_id = p.office_id AND t.template_id = p.template_id
             {TEMPLATE_JOIN}
             ORDER BY t.office_id, t.template_id, s.rating_id",
            w.sql
        );
        w.push(SqlParam::Integer(i64::from(limit_hint)));
        w.push(SqlParam::Integer(offset_param(skip_parents)));
        stream(self.0, &sql, &w.refs(), Self::map, visit)
    }

    fn count(&self, filter: &TemplateFilter) -> Result<u64, StorageError> {
        let w = template_where(filter);
        let sql = format!("SELECT COUNT(*) FROM rating_templates{}", w.sql);
        let n: i64 = self
            .0
            .query_row(&sql, w.refs().as_slice(), |row| row.get(0))
            .map_err(map_err)?;
        Ok(n as u64)
    }
}

fn offset_param(skip: u64) -> i64 {
    i64::try_from(skip).unwrap_or(i64::MAX)
}

fn collect_rows<P, C>(
    emit: impl FnOnce(&mut dyn FnMut(JoinRow<P, C>) -> ControlFlow<()>) -> Result<(), StorageError>,
) -> Result<Vec<JoinRow<P, C>>, StorageError> {
    let mut rows = Vec::new();
    emit(&mut |row| {
        rows.push(row);
        ControlFlow::Continue(())
    })?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for SqliteStorage {
    // --- Offices -------------------------------------------------------------

    async fn put_office(&self, office: &Office) -> Result<(), StorageError> {
        let office = office.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO offices (name, long_name, office_type, reports_to)
                 VALUES (?1, ?2, ?3, ?4)",
                params![office.name, office.long_name, office.office_type, office.reports_to],
            )
            .map_err(map_insert_err(format!("office {}", office.name)))?;
            Ok(())
        })
        .await
    }

    async fn list_offices(&self) -> Result<Vec<Office>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT name, long_name, office_type, reports_to FROM offices ORDER BY name")
                .map_err(map_err)?;
            let offices = stmt
                .query_map([], |row| {
                    Ok(Office {
                        name: row.get(0)?,
                        long_name: row.get(1)?,
                        office_type: row.get(2)?,
                        reports_to: row.get(3)?,
                    })
                })
                .map_err(map_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_err)?;
            Ok(offices)
        })
        .await
    }

    async fn get_office(&self, name: &str) -> Result<Option<Office>, StorageError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT name, long_name, office_type, reports_to FROM offices
                 WHERE UPPER(name) = UPPER(?1)",
                params![name],
                |row| {
                    Ok(Office {
                        name: row.get(0)?,
                        long_name: row.get(1)?,
                        office_type: row.get(2)?,
                        reports_to: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(map_err)
        })
        .await
    }

    // --- Locations -----------------------------------------------------------

    async fn put_location(&self, location: &Location) -> Result<(), StorageError> {
        let location = location.clone();
        self.with_conn(move |conn| {
            let tx = conn.unchecked_transaction().map_err(map_err)?;
            tx.execute(
                "INSERT INTO locations (office_id, location_id, latitude, longitude,
                     horizontal_datum, timezone_name, location_kind, public_name, active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    location.office_id,
                    location.name,
                    location.latitude,
                    location.longitude,
                    location.horizontal_datum,
                    location.timezone_name,
                    location.location_kind,
                    location.public_name,
                    location.active,
                ],
            )
            .map_err(map_insert_err(format!(
                "location {}/{}",
                location.office_id, location.name
            )))?;
            for alias in &location.aliases {
                tx.execute(
                    "INSERT OR IGNORE INTO location_aliases (office_id, location_id, alias_id)
                     VALUES (?1, ?2, ?3)",
                    params![location.office_id, location.name, alias],
                )
                .map_err(map_err)?;
            }
            tx.commit().map_err(map_err)
        })
        .await
    }

    async fn put_location_alias(&self, alias: &LocationAlias) -> Result<(), StorageError> {
        let alias = alias.clone();
        self.with_conn(move |conn| {
            let exists: bool = conn
                .query_row(
                    "SELECT COUNT(*) FROM locations WHERE office_id = ?1 AND location_id = ?2",
                    params![alias.office_id, alias.location_id],
                    |row| row.get::<_, i64>(0),
                )
                .map_err(map_err)?
                > 0;
            if !exists {
                return Err(StorageError::NotFound);
            }
            conn.execute(
                "INSERT OR IGNORE INTO location_aliases (office_id, location_id, alias_id)
                 VALUES (?1, ?2, ?3)",
                params![alias.office_id, alias.location_id, alias.alias_id],
            )
            .map_err(map_err)?;
            Ok(())
        })
        .await
    }

    async fn get_location(&self, office: &str, name: &str) -> Result<Option<Location>, StorageError> {
        let office = office.to_string();
        let name = name.to_string();
        self.with_conn(move |conn| {
            let w = Where::new()
                .equals_ci("l.office_id", &office)
                .equals_ci("l.location_id", &name);
            let sql = format!(
                "SELECT {LOCATION_COLUMNS}, a.alias_id
                 FROM locations l
                 LEFT OUTER JOIN location_aliases a
                     ON a.office_id = l.office_id AND a.location_id = l.location_id{}
                 ORDER BY l.office_id, l.location_id, a.alias_id",
                w.sql
            );
            let rows = collect_rows(|visit| stream(conn, &sql, &w.refs(), LocationRows::map, visit))?;
            let what = format!("location {office}/{name}");
            Ok(single(rows, &what)?.map(Group::assemble))
        })
        .await
    }

    async fn locations_page(
        &self,
        filter: &LocationFilter,
        page: &PageParams,
    ) -> Result<Page<Location>, StorageError> {
        let filter = filter.clone();
        let page = page.clone();
        self.with_conn(move |conn| {
            let source = LocationRows(conn);
            let page = PagedQuery::new(&source).page(&filter, &page.request())?;
            Ok(page.map(Group::assemble))
        })
        .await
    }

    // --- Rating templates ----------------------------------------------------

    async fn put_rating_template(&self, template: &RatingTemplate) -> Result<(), StorageError> {
        check_template(template)?;
        let template = template.clone();
        self.with_conn(move |conn| {
            let (parameters, methods) = ParameterSpec::join_all(&template.independent_parameter_specs);
            conn.execute(
                "INSERT INTO rating_templates (office_id, template_id, version, description,
                     dependent_parameter, independent_parameters, rating_methods)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    template.office_id,
                    template.id,
                    template.version,
                    template.description,
                    template.dependent_parameter,
                    parameters,
                    methods,
                ],
            )
            .map_err(map_insert_err(format!(
                "rating template {} in office {}",
                template.id, template.office_id
            )))?;
            Ok(())
        })
        .await
    }

    async fn put_rating_spec(&self, spec: &RatingSpec) -> Result<(), StorageError> {
        let spec = spec.clone();
        self.with_conn(move |conn| {
            let template_exists: bool = conn
                .query_row(
                    "SELECT COUNT(*) FROM rating_templates WHERE office_id = ?1 AND template_id = ?2",
                    params![spec.office_id, spec.template_id],
                    |row| row.get::<_, i64>(0),
                )
                .map_err(map_err)?
                > 0;
            if !template_exists {
                return Err(StorageError::NotFound);
            }
            conn.execute(
                "INSERT INTO rating_specs (office_id, rating_id, template_id, aliased_item)
                 VALUES (?1, ?2, ?3, ?4)",
                params![spec.office_id, spec.rating_id, spec.template_id, spec.aliased_item],
            )
            .map_err(map_insert_err(format!(
                "rating spec {} in office {}",
                spec.rating_id, spec.office_id
            )))?;
            Ok(())
        })
        .await
    }

    async fn get_rating_template(
        &self,
        office: Option<&str>,
        id: &str,
    ) -> Result<Option<RatingTemplate>, StorageError> {
        let office = office.map(str::to_string);
        let id = id.to_string();
        self.with_conn(move |conn| {
            let w = Where::new()
                .office("t.office_id", office.as_deref())
                .equals_ci("t.template_id", &id);
            let sql = format!(
                "SELECT {TEMPLATE_COLUMNS}, s.rating_id
                 FROM rating_templates t
                 {TEMPLATE_JOIN}{}
                 ORDER BY t.office_id, t.template_id, s.rating_id",
                w.sql
            );
            let rows = collect_rows(|visit| stream(conn, &sql, &w.refs(), TemplateRows::map, visit))?;
            let what = template_what(office.as_deref(), &id);
            Ok(single(rows, &what)?.map(Group::assemble))
        })
        .await
    }

    async fn rating_templates_page(
        &self,
        filter: &TemplateFilter,
        page: &PageParams,
    ) -> Result<Page<RatingTemplate>, StorageError> {
        let filter = filter.clone();
        let page = page.clone();
        self.with_conn(move |conn| {
            let source = TemplateRows(conn);
            let page = PagedQuery::new(&source).page(&filter, &page.request())?;
            Ok(page.map(Group::assemble))
        })
        .await
    }

    // --- Water users ---------------------------------------------------------

    async fn put_water_user(&self, user: &WaterUser) -> Result<(), StorageError> {
        let user = user.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO water_users (office_id, project_id, entity_name, water_right)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.project_id.office_id,
                    user.project_id.name,
                    user.entity_name,
                    user.water_right,
                ],
            )
            .map_err(map_insert_err(format!(
                "water user {} at project {}",
                user.entity_name, user.project_id.name
            )))?;
            Ok(())
        })
        .await
    }

    async fn get_water_user(
        &self,
        office: &str,
        project: &str,
        entity_name: &str,
    ) -> Result<Option<WaterUser>, StorageError> {
        let office = office.to_string();
        let project = project.to_string();
        let entity_name = entity_name.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT office_id, project_id, entity_name, water_right FROM water_users
                 WHERE UPPER(office_id) = UPPER(?1)
                   AND UPPER(project_id) = UPPER(?2)
                   AND UPPER(entity_name) = UPPER(?3)",
                params![office, project, entity_name],
                |row| {
                    Ok(WaterUser {
                        project_id: ProjectId {
                            office_id: row.get(0)?,
                            name: row.get(1)?,
                        },
                        entity_name: row.get(2)?,
                        water_right: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(map_err)
        })
        .await
    }
}
