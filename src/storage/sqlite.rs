//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordStore trait.

use crate::record::{timestamp_to_db, EnrichedRecord};
use crate::state::RunStatistics;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordStore, StoreError, StoreResult};
use crate::storage::{RunRecord, RunStatus, UpsertOutcome};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// Stored project columns, in the order `row_to_record` reads them
const PROJECT_COLUMNS: &str = "project_number, project_id, project_name, facility_name, \
     location_address, city, county, start_date, completion_date, estimated_cost, \
     type_of_work, type_of_funds, scope_of_work, square_footage, project_status, \
     owner_name, owner_address, owner_phone, design_firm_name, design_firm_address, \
     ras_name, ras_number, registration_date, date_scraped";

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, pages_fetched, \
     records_attempted, records_stored, records_failed, retries, aborted_reason";

/// SQLite record store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// Missing parent directories are created.
    pub fn new(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl RecordStore for SqliteStore {
    // ===== Records =====

    fn upsert(&mut self, record: &EnrichedRecord) -> StoreResult<UpsertOutcome> {
        let scraped = timestamp_to_db(&record.date_scraped);
        let tx = self.conn.transaction()?;

        let existed = tx
            .query_row(
                "SELECT 1 FROM projects WHERE project_number = ?1",
                params![record.project_number],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        let changed = tx.execute(
            &format!(
                "INSERT INTO projects ({PROJECT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                         ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)
                 ON CONFLICT(project_number) DO UPDATE SET
                    project_id = excluded.project_id,
                    project_name = excluded.project_name,
                    facility_name = excluded.facility_name,
                    location_address = excluded.location_address,
                    city = excluded.city,
                    county = excluded.county,
                    start_date = excluded.start_date,
                    completion_date = excluded.completion_date,
                    estimated_cost = excluded.estimated_cost,
                    type_of_work = excluded.type_of_work,
                    type_of_funds = excluded.type_of_funds,
                    scope_of_work = excluded.scope_of_work,
                    square_footage = excluded.square_footage,
                    project_status = excluded.project_status,
                    owner_name = excluded.owner_name,
                    owner_address = excluded.owner_address,
                    owner_phone = excluded.owner_phone,
                    design_firm_name = excluded.design_firm_name,
                    design_firm_address = excluded.design_firm_address,
                    ras_name = excluded.ras_name,
                    ras_number = excluded.ras_number,
                    registration_date = excluded.registration_date,
                    date_scraped = excluded.date_scraped
                 WHERE excluded.date_scraped >= projects.date_scraped"
            ),
            params![
                record.project_number,
                record.project_id,
                record.project_name,
                record.facility_name,
                record.location_address,
                record.city,
                record.county,
                record.start_date,
                record.completion_date,
                record.estimated_cost,
                record.type_of_work,
                record.type_of_funds,
                record.scope_of_work,
                record.square_footage,
                record.project_status,
                record.owner_name,
                record.owner_address,
                record.owner_phone,
                record.design_firm_name,
                record.design_firm_address,
                record.ras_name,
                record.ras_number,
                record.registration_date,
                scraped,
            ],
        )?;

        tx.commit()?;

        Ok(match (existed, changed) {
            (false, _) => UpsertOutcome::Inserted,
            (true, 0) => UpsertOutcome::Stale,
            (true, _) => UpsertOutcome::Replaced,
        })
    }

    fn get(&self, identifier: &str) -> StoreResult<Option<EnrichedRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE project_number = ?1"),
                params![identifier],
                row_to_record,
            )
            .optional()?;

        Ok(record)
    }

    fn search(&self, query: &str, limit: usize) -> StoreResult<Vec<EnrichedRecord>> {
        let pattern = like_pattern(query);

        let mut stmt = self.conn.prepare(&format!(
            r"SELECT {PROJECT_COLUMNS} FROM projects
              WHERE project_number LIKE ?1 ESCAPE '\'
                 OR project_name LIKE ?1 ESCAPE '\'
                 OR facility_name LIKE ?1 ESCAPE '\'
                 OR city LIKE ?1 ESCAPE '\'
                 OR county LIKE ?1 ESCAPE '\'
              ORDER BY registration_date IS NULL, registration_date DESC, project_number
              LIMIT ?2"
        ))?;

        let records = stmt
            .query_map(params![pattern, limit as i64], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        stats: &RunStatistics,
    ) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET
                status = ?1, finished_at = ?2, pages_fetched = ?3, records_attempted = ?4,
                records_stored = ?5, records_failed = ?6, retries = ?7, aborted_reason = ?8
             WHERE id = ?9",
            params![
                status.to_db_string(),
                now,
                stats.pages_fetched,
                stats.records_attempted as i64,
                stats.records_stored as i64,
                stats.records_failed as i64,
                stats.retries as i64,
                stats.aborted,
                run_id,
            ],
        )?;

        if updated == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StoreResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = ?1"),
                params![run_id],
                row_to_run,
            )
            .optional()?
            .ok_or(StoreError::RunNotFound(run_id))
    }

    fn recent_runs(&self, limit: usize) -> StoreResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM runs ORDER BY id DESC LIMIT ?1"
        ))?;

        let runs = stmt
            .query_map(params![limit as i64], row_to_run)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }
}

/// Wraps a search term for a LIKE match, escaping its wildcards
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<EnrichedRecord> {
    let scraped: String = row.get(23)?;
    let date_scraped = DateTime::parse_from_rfc3339(&scraped)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(23, Type::Text, Box::new(e)))?;

    Ok(EnrichedRecord {
        project_number: row.get(0)?,
        project_id: row.get(1)?,
        project_name: row.get(2)?,
        facility_name: row.get(3)?,
        location_address: row.get(4)?,
        city: row.get(5)?,
        county: row.get(6)?,
        start_date: row.get(7)?,
        completion_date: row.get(8)?,
        estimated_cost: row.get(9)?,
        type_of_work: row.get(10)?,
        type_of_funds: row.get(11)?,
        scope_of_work: row.get(12)?,
        square_footage: row.get(13)?,
        project_status: row.get(14)?,
        owner_name: row.get(15)?,
        owner_address: row.get(16)?,
        owner_phone: row.get(17)?,
        design_firm_name: row.get(18)?,
        design_firm_address: row.get(19)?,
        ras_name: row.get(20)?,
        ras_number: row.get(21)?,
        registration_date: row.get(22)?,
        date_scraped,
    })
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Failed),
        pages_fetched: row.get(5)?,
        records_attempted: row.get::<_, i64>(6)? as u64,
        records_stored: row.get::<_, i64>(7)? as u64,
        records_failed: row.get::<_, i64>(8)? as u64,
        retries: row.get::<_, i64>(9)? as u64,
        aborted_reason: row.get(10)?,
    })
}
