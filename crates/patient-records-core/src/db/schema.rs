//! SQLite schema definition.

/// Complete database schema for the patient store.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uhid TEXT NOT NULL UNIQUE,                   -- hospital identifier, external key
    name TEXT NOT NULL,
    age INTEGER NOT NULL CHECK (age >= 0),
    sex TEXT NOT NULL,
    remarks TEXT,
    diagnosis TEXT,
    follow_up_date TEXT                          -- ISO date, NULL = none scheduled
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);
"#;
