//! Database schema definitions
//!
//! This module contains the SQL schema for the TABS-Harvest database.

/// Current schema version, stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track scrape runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    pages_fetched INTEGER NOT NULL DEFAULT 0,
    records_attempted INTEGER NOT NULL DEFAULT 0,
    records_stored INTEGER NOT NULL DEFAULT 0,
    records_failed INTEGER NOT NULL DEFAULT 0,
    retries INTEGER NOT NULL DEFAULT 0,
    aborted_reason TEXT
);

-- One row per project, keyed by project number
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT,
    project_number TEXT NOT NULL UNIQUE,
    project_name TEXT,
    facility_name TEXT,
    location_address TEXT,
    city TEXT,
    county TEXT,
    start_date TEXT,
    completion_date TEXT,
    estimated_cost REAL,
    type_of_work TEXT,
    type_of_funds TEXT,
    scope_of_work TEXT,
    square_footage INTEGER,
    project_status TEXT,
    owner_name TEXT,
    owner_address TEXT,
    owner_phone TEXT,
    design_firm_name TEXT,
    design_firm_address TEXT,
    ras_name TEXT,
    ras_number TEXT,
    registration_date TEXT,
    date_scraped TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_projects_registration ON projects(registration_date);
CREATE INDEX IF NOT EXISTS idx_projects_city ON projects(city);
CREATE INDEX IF NOT EXISTS idx_projects_county ON projects(county);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_initializes() {
        let conn = Connection::open_in_memory().unwrap();
        let result = initialize_schema(&conn);
        assert!(result.is_ok());
        let version: u32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["runs", "projects"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_project_number_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let insert = "INSERT INTO projects (project_number, date_scraped) VALUES ('TABS1', 'x')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
