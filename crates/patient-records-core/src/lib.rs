//! Patient Records Core Library
//!
//! Storage for patient intake, edit, follow-up and search, on a single SQLite
//! table behind a bounded connection pool.
//!
//! # Architecture
//!
//! ```text
//!   Form fields / query params
//!              │
//!      PatientForm::validate ──────────► ValidationError
//!              │
//!   ┌──────────▼──────────────────────────────────────────┐
//!   │                 Database (r2d2 pool)                │
//!   │  create · get · update · upsert_follow_up · delete  │
//!   │             search_patients → PatientPage           │
//!   └──────────┬──────────────────────────────────────────┘
//!              │
//!        patients table (uhid UNIQUE)
//! ```
//!
//! # Core Principle
//!
//! **The uhid is the only external key.** Follow-ups upsert on it atomically;
//! the numeric id never leaves the store layer.
//!
//! # Modules
//!
//! - [`config`]: Startup configuration for the store
//! - [`db`]: Connection pool, schema and patient operations
//! - [`models`]: Domain types (Patient, PatientForm, SearchQuery, PatientPage)

pub mod config;
pub mod db;
pub mod models;

// Re-export commonly used types
pub use config::{ConfigError, StoreConfig};
pub use db::{Database, DbError, DbResult, ErrorKind};
pub use models::{
    Patient, PatientDetails, PatientForm, PatientPage, SearchQuery, ValidationError,
};
