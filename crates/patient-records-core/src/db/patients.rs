//! Patient database operations.

use rusqlite::{ffi, params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{validate_uhid, Patient, PatientDetails, PatientPage, SearchQuery, ValidationError};

impl Database {
    /// Insert a new patient, returning its surrogate id.
    ///
    /// A uhid that already exists is reported as [`DbError::Constraint`].
    pub fn create_patient(&self, uhid: &str, details: &PatientDetails) -> DbResult<i64> {
        validate_uhid(uhid)?;
        details.validate()?;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO patients (
                uhid, name, age, sex, remarks, diagnosis, follow_up_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                uhid,
                details.name,
                details.age,
                details.sex,
                details.remarks,
                details.diagnosis,
                details.follow_up_date,
            ],
        )
        .map_err(|e| constraint_error(e, uhid))?;

        let id = conn.last_insert_rowid();
        tracing::debug!(uhid, id, "created patient");
        Ok(id)
    }

    /// Get a patient by hospital identifier (exact, case-sensitive match).
    pub fn get_patient(&self, uhid: &str) -> DbResult<Option<Patient>> {
        self.conn()?
            .query_row(
                r#"
                SELECT id, uhid, name, age, sex, remarks, diagnosis, follow_up_date
                FROM patients
                WHERE uhid = ?
                "#,
                [uhid],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Overwrite name, age, sex, remarks and diagnosis of an existing patient.
    ///
    /// Absent optional fields are written as NULL. The follow-up date is left
    /// as is.
    pub fn update_patient(&self, uhid: &str, details: &PatientDetails) -> DbResult<Patient> {
        validate_uhid(uhid)?;
        details.validate()?;

        let updated = self
            .conn()?
            .query_row(
                r#"
                UPDATE patients SET
                    name = ?2,
                    age = ?3,
                    sex = ?4,
                    remarks = ?5,
                    diagnosis = ?6
                WHERE uhid = ?1
                RETURNING id, uhid, name, age, sex, remarks, diagnosis, follow_up_date
                "#,
                params![
                    uhid,
                    details.name,
                    details.age,
                    details.sex,
                    details.remarks,
                    details.diagnosis,
                ],
                patient_from_row,
            )
            .optional()?;

        match updated {
            Some(patient) => {
                tracing::debug!(uhid, "updated patient");
                Ok(patient)
            }
            None => Err(DbError::NotFound(uhid.to_string())),
        }
    }

    /// Record a follow-up visit: update the patient if known, insert otherwise.
    ///
    /// One `INSERT .. ON CONFLICT DO UPDATE` statement keyed on the unique
    /// uhid, so concurrent follow-ups for an unseen uhid yield a single row.
    pub fn upsert_follow_up(&self, uhid: &str, details: &PatientDetails) -> DbResult<Patient> {
        validate_uhid(uhid)?;
        details.validate()?;
        if details.follow_up_date.is_none() {
            return Err(ValidationError::MissingField("follow_up_date").into());
        }

        let patient = self.conn()?.query_row(
            r#"
            INSERT INTO patients (
                uhid, name, age, sex, remarks, diagnosis, follow_up_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(uhid) DO UPDATE SET
                name = excluded.name,
                age = excluded.age,
                sex = excluded.sex,
                remarks = excluded.remarks,
                diagnosis = excluded.diagnosis,
                follow_up_date = excluded.follow_up_date
            RETURNING id, uhid, name, age, sex, remarks, diagnosis, follow_up_date
            "#,
            params![
                uhid,
                details.name,
                details.age,
                details.sex,
                details.remarks,
                details.diagnosis,
                details.follow_up_date,
            ],
            patient_from_row,
        )?;

        tracing::debug!(uhid, id = patient.id, "recorded follow-up");
        Ok(patient)
    }

    /// Delete a patient. An unknown uhid is [`DbError::NotFound`].
    pub fn delete_patient(&self, uhid: &str) -> DbResult<()> {
        let rows_affected = self
            .conn()?
            .execute("DELETE FROM patients WHERE uhid = ?", [uhid])?;

        if rows_affected == 0 {
            return Err(DbError::NotFound(uhid.to_string()));
        }
        tracing::debug!(uhid, "deleted patient");
        Ok(())
    }

    /// Count all stored patients.
    pub fn count_patients(&self) -> DbResult<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Paginated search by case-insensitive substring of name or uhid.
    ///
    /// Matching and ordering go through the `casefold` SQL function, so
    /// non-ASCII letters fold too. The filter text is matched literally. Without filter text every patient is listed in id order. The total is
    /// counted with the same predicate, in the same read transaction as the
    /// page. A page past the end returns no rows; see
    /// [`PatientPage::clamp_target`].
    pub fn search_patients(&self, query: &SearchQuery) -> DbResult<PatientPage> {
        query.validate()?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let total: i64 = match &query.text {
            Some(text) => tx.query_row(
                r#"
                SELECT COUNT(*) FROM patients
                WHERE instr(casefold(name), casefold(?1)) > 0
                   OR instr(casefold(uhid), casefold(?1)) > 0
                "#,
                [text],
                |row| row.get(0),
            )?,
            None => tx.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?,
        };
        let total_count = u64::try_from(total).unwrap_or(0);

        let mut page = PatientPage {
            patients: Vec::new(),
            page: query.page,
            page_size: query.page_size,
            total_count,
            text: query.text.clone(),
        };
        if query.offset() >= total_count {
            tracing::debug!(page = query.page, total_count, "search page past the end");
            return Ok(page);
        }

        let limit = i64::from(query.page_size);
        let offset = i64::try_from(query.offset()).unwrap_or(i64::MAX);
        page.patients = match &query.text {
            Some(text) => {
                let mut stmt = tx.prepare(
                    r#"
                    SELECT id, uhid, name, age, sex, remarks, diagnosis, follow_up_date
                    FROM patients
                    WHERE instr(casefold(name), casefold(?1)) > 0
                       OR instr(casefold(uhid), casefold(?1)) > 0
                    ORDER BY casefold(name), id
                    LIMIT ?2 OFFSET ?3
                    "#,
                )?;
                let rows = stmt.query_map(params![text, limit, offset], patient_from_row)?;
                let patients = rows.collect::<Result<Vec<_>, _>>()?;
                patients
            }
            None => {
                let mut stmt = tx.prepare(
                    r#"
                    SELECT id, uhid, name, age, sex, remarks, diagnosis, follow_up_date
                    FROM patients
                    ORDER BY id
                    LIMIT ?1 OFFSET ?2
                    "#,
                )?;
                let rows = stmt.query_map(params![limit, offset], patient_from_row)?;
                let patients = rows.collect::<Result<Vec<_>, _>>()?;
                patients
            }
        };
        tx.commit()?;

        tracing::debug!(
            text = ?query.text,
            page = query.page,
            returned = page.patients.len(),
            total_count,
            "searched patients"
        );
        Ok(page)
    }
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        uhid: row.get(1)?,
        name: row.get(2)?,
        age: row.get(3)?,
        sex: row.get(4)?,
        remarks: row.get(5)?,
        diagnosis: row.get(6)?,
        follow_up_date: row.get(7)?,
    })
}

fn constraint_error(e: rusqlite::Error, uhid: &str) -> DbError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            DbError::Constraint(format!("uhid {uhid} already exists"))
        }
        _ => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ErrorKind;
    use chrono::NaiveDate;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn follow_up_on(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let db = setup_db();

        let details = PatientDetails::new("Asha", 34, "F")
            .with_remarks("referred by OPD")
            .with_diagnosis("anaemia")
            .with_follow_up(follow_up_on(1));
        let id = db.create_patient("UH-001", &details).unwrap();

        let retrieved = db.get_patient("UH-001").unwrap().unwrap();
        assert_eq!(retrieved.id, id);
        assert_eq!(retrieved.uhid, "UH-001");
        assert_eq!(retrieved.details(), details);
    }

    #[test]
    fn test_get_is_case_sensitive() {
        let db = setup_db();
        db.create_patient("uh-abc", &PatientDetails::new("Asha", 34, "F"))
            .unwrap();

        assert!(db.get_patient("uh-abc").unwrap().is_some());
        assert!(db.get_patient("UH-ABC").unwrap().is_none());
    }

    #[test]
    fn test_create_rejects_missing_fields() {
        let db = setup_db();

        let err = db
            .create_patient(" ", &PatientDetails::new("Asha", 34, "F"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = db
            .create_patient("UH-1", &PatientDetails::new("", 34, "F"))
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::MissingField("name"))
        ));
        assert_eq!(db.count_patients().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_uhid_is_constraint_error() {
        let db = setup_db();
        let details = PatientDetails::new("Asha", 34, "F");

        db.create_patient("UH-1", &details).unwrap();
        let err = db.create_patient("UH-1", &details).unwrap_err();

        assert!(matches!(err, DbError::Constraint(_)));
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(db.count_patients().unwrap(), 1);
    }

    #[test]
    fn test_update_overwrites_all_fields() {
        let db = setup_db();
        let original = PatientDetails::new("Asha", 34, "F")
            .with_remarks("first visit")
            .with_diagnosis("anaemia")
            .with_follow_up(follow_up_on(2));
        db.create_patient("UH-1", &original).unwrap();

        let edited = PatientDetails::new("Asha Rao", 35, "F");
        let updated = db.update_patient("UH-1", &edited).unwrap();

        assert_eq!(updated.name, "Asha Rao");
        assert_eq!(updated.age, 35);
        assert_eq!(updated.remarks, None);
        assert_eq!(updated.diagnosis, None);
        // Owned by the follow-up flow
        assert_eq!(updated.follow_up_date, Some(follow_up_on(2)));
        assert_eq!(db.get_patient("UH-1").unwrap().unwrap(), updated);
    }

    #[test]
    fn test_update_unknown_is_not_found() {
        let db = setup_db();
        let err = db
            .update_patient("UH-404", &PatientDetails::new("Asha", 34, "F"))
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound(ref uhid) if uhid == "UH-404"));
        assert_eq!(db.count_patients().unwrap(), 0);
    }

    #[test]
    fn test_follow_up_inserts_then_updates() {
        let db = setup_db();

        let first = PatientDetails::new("Ravi", 60, "M").with_follow_up(follow_up_on(10));
        let created = db.upsert_follow_up("UH-9", &first).unwrap();
        assert_eq!(db.count_patients().unwrap(), 1);

        let second = PatientDetails::new("Ravi K", 61, "M")
            .with_diagnosis("COPD")
            .with_follow_up(follow_up_on(24));
        let updated = db.upsert_follow_up("UH-9", &second).unwrap();

        assert_eq!(db.count_patients().unwrap(), 1);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.details(), second);
    }

    #[test]
    fn test_follow_up_requires_date() {
        let db = setup_db();
        let err = db
            .upsert_follow_up("UH-9", &PatientDetails::new("Ravi", 60, "M"))
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::MissingField("follow_up_date"))
        ));
    }

    #[test]
    fn test_delete() {
        let db = setup_db();
        db.create_patient("UH-1", &PatientDetails::new("Asha", 34, "F"))
            .unwrap();
        db.create_patient("UH-2", &PatientDetails::new("Ravi", 60, "M"))
            .unwrap();

        db.delete_patient("UH-1").unwrap();
        assert!(db.get_patient("UH-1").unwrap().is_none());

        let err = db.delete_patient("UH-1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(db.count_patients().unwrap(), 1);
    }

    #[test]
    fn test_search_case_insensitive_on_name_and_uhid() {
        let db = setup_db();
        db.create_patient("UH-100", &PatientDetails::new("Asha", 34, "F"))
            .unwrap();
        db.create_patient("AB-7", &PatientDetails::new("Ravi", 60, "M"))
            .unwrap();

        let page = db
            .search_patients(&SearchQuery::new(Some("asha".into()), 1, 10))
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.patients[0].name, "Asha");

        let page = db
            .search_patients(&SearchQuery::new(Some("ab-".into()), 1, 10))
            .unwrap();
        assert_eq!(page.patients.len(), 1);
        assert_eq!(page.patients[0].uhid, "AB-7");
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        let db = setup_db();
        db.create_patient("UH_1", &PatientDetails::new("Asha", 34, "F"))
            .unwrap();
        db.create_patient("UHX1", &PatientDetails::new("Ravi", 60, "M"))
            .unwrap();
        db.create_patient("UH-3", &PatientDetails::new("100% Sure", 1, "M"))
            .unwrap();

        let page = db
            .search_patients(&SearchQuery::new(Some("UH_".into()), 1, 10))
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.patients[0].uhid, "UH_1");

        let page = db
            .search_patients(&SearchQuery::new(Some("%".into()), 1, 10))
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.patients[0].uhid, "UH-3");
    }

    #[test]
    fn test_unfiltered_search_orders_by_id() {
        let db = setup_db();
        for (uhid, name) in [("UH-1", "Zara"), ("UH-2", "Asha"), ("UH-3", "Mira")] {
            db.create_patient(uhid, &PatientDetails::new(name, 30, "F"))
                .unwrap();
        }

        let page = db.search_patients(&SearchQuery::all(1, 10)).unwrap();
        let uhids: Vec<_> = page.patients.iter().map(|p| p.uhid.as_str()).collect();
        assert_eq!(uhids, vec!["UH-1", "UH-2", "UH-3"]);
        assert_eq!(page.total_count, db.count_patients().unwrap());
    }

    #[test]
    fn test_search_rejects_page_zero() {
        let db = setup_db();
        let err = db.search_patients(&SearchQuery::all(0, 10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_search_folds_non_ascii_case() {
        let db = setup_db();
        db.create_patient("UH-1", &PatientDetails::new("Élodie", 29, "F"))
            .unwrap();
        db.create_patient("UH-2", &PatientDetails::new("ÖZGÜR", 41, "M"))
            .unwrap();
        db.create_patient("UH-3", &PatientDetails::new("Elodie", 52, "F"))
            .unwrap();

        let page = db
            .search_patients(&SearchQuery::new(Some("élodie".into()), 1, 10))
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.patients[0].uhid, "UH-1");

        let page = db
            .search_patients(&SearchQuery::new(Some("özgür".into()), 1, 10))
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.patients[0].name, "ÖZGÜR");
    }

    #[test]
    fn test_filtered_search_orders_by_folded_name() {
        let db = setup_db();
        for (uhid, name) in [("UH-1", "bina"), ("UH-2", "Anu"), ("UH-3", "CHITRA"), ("UH-4", "anu")] {
            db.create_patient(uhid, &PatientDetails::new(name, 30, "F"))
                .unwrap();
        }

        let page = db
            .search_patients(&SearchQuery::new(Some("UH".into()), 1, 10))
            .unwrap();
        let uhids: Vec<_> = page.patients.iter().map(|p| p.uhid.as_str()).collect();
        assert_eq!(uhids, vec!["UH-2", "UH-4", "UH-1", "UH-3"]);
    }
}
