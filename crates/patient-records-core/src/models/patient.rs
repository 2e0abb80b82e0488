//! Patient models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A stored patient record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    /// Internal surrogate key, never exposed in URLs
    #[serde(skip)]
    pub id: i64,
    /// Hospital identifier - the external key
    pub uhid: String,
    /// Patient name
    pub name: String,
    /// Age in years
    pub age: u32,
    /// Sex as entered at intake
    pub sex: String,
    /// Free-text remarks
    pub remarks: Option<String>,
    /// Working diagnosis
    pub diagnosis: Option<String>,
    /// Next scheduled follow-up visit
    pub follow_up_date: Option<NaiveDate>,
}

impl Patient {
    /// Split into the external key and the mutable field set.
    pub fn details(&self) -> PatientDetails {
        PatientDetails {
            name: self.name.clone(),
            age: self.age,
            sex: self.sex.clone(),
            remarks: self.remarks.clone(),
            diagnosis: self.diagnosis.clone(),
            follow_up_date: self.follow_up_date,
        }
    }

    /// Whether a follow-up visit is scheduled.
    pub fn has_follow_up(&self) -> bool {
        self.follow_up_date.is_some()
    }
}

/// The mutable fields of a patient, as written by create/update/follow-up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientDetails {
    pub name: String,
    pub age: u32,
    pub sex: String,
    pub remarks: Option<String>,
    pub diagnosis: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

impl PatientDetails {
    /// Create details with the required fields only.
    pub fn new(name: impl Into<String>, age: u32, sex: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age,
            sex: sex.into(),
            remarks: None,
            diagnosis: None,
            follow_up_date: None,
        }
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    pub fn with_diagnosis(mut self, diagnosis: impl Into<String>) -> Self {
        self.diagnosis = Some(diagnosis.into());
        self
    }

    pub fn with_follow_up(mut self, date: NaiveDate) -> Self {
        self.follow_up_date = Some(date);
        self
    }
}
