//! Raw form submissions and required-field validation.

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use super::PatientDetails;

/// Input rejected before any store access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("age must be a non-negative whole number, got {0:?}")]
    InvalidAge(String),

    #[error("follow-up date must be YYYY-MM-DD, got {0:?}")]
    InvalidDate(String),

    #[error("invalid paging: {0}")]
    InvalidPaging(&'static str),
}

/// An untyped patient submission as extracted from an HTML form.
///
/// Every field is optional so that a missing input surfaces as a
/// [`ValidationError`] rather than an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientForm {
    pub uhid: Option<String>,
    pub name: Option<String>,
    pub age: Option<String>,
    pub sex: Option<String>,
    pub remarks: Option<String>,
    pub diagnosis: Option<String>,
    pub follow_up_date: Option<String>,
}

impl PatientForm {
    /// Validate an intake or edit submission.
    pub fn validate(&self) -> Result<(String, PatientDetails), ValidationError> {
        let uhid = required(&self.uhid, "uhid")?;
        let details = self.validate_details()?;
        Ok((uhid, details))
    }

    /// Validate a follow-up submission; the follow-up date is mandatory.
    pub fn validate_follow_up(&self) -> Result<(String, PatientDetails), ValidationError> {
        let (uhid, details) = self.validate()?;
        if details.follow_up_date.is_none() {
            return Err(ValidationError::MissingField("follow_up_date"));
        }
        Ok((uhid, details))
    }

    /// Validate the mutable fields only (the key comes from the URL on edit).
    pub fn validate_details(&self) -> Result<PatientDetails, ValidationError> {
        let name = required(&self.name, "name")?;
        let age = parse_age(&required(&self.age, "age")?)?;
        let sex = required(&self.sex, "sex")?;
        let follow_up_date = optional(&self.follow_up_date)
            .map(|raw| parse_date(&raw))
            .transpose()?;

        Ok(PatientDetails {
            name,
            age,
            sex,
            remarks: optional(&self.remarks),
            diagnosis: optional(&self.diagnosis),
            follow_up_date,
        })
    }
}

/// Reject a blank hospital identifier.
pub fn validate_uhid(uhid: &str) -> Result<(), ValidationError> {
    if uhid.trim().is_empty() {
        return Err(ValidationError::MissingField("uhid"));
    }
    Ok(())
}

impl PatientDetails {
    /// Check required-field presence on already-typed details.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.sex.trim().is_empty() {
            return Err(ValidationError::MissingField("sex"));
        }
        Ok(())
    }
}

fn optional(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn required(field: &Option<String>, name: &'static str) -> Result<String, ValidationError> {
    optional(field).ok_or(ValidationError::MissingField(name))
}

fn parse_age(raw: &str) -> Result<u32, ValidationError> {
    raw.parse::<u32>()
        .map_err(|_| ValidationError::InvalidAge(raw.to_string()))
}

fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}
