//! Business rules of the brigades service.
//!
//! Three components share one [`Repository`](crate::db::Repository):
//! the member registry, the brigade registry and the assignment coordinator.
//! Handlers stay thin; every invariant lives here or in the schema backing it.

mod assignments;
mod brigades;
mod members;

pub use assignments::*;
pub use brigades::*;
pub use members::*;

use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{BrigadeStatus, MemberRole};

/// Trimmed value of a required text field; absent or blank is a validation error.
fn required(value: Option<&str>, field: &str) -> Result<String, AppError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::Validation(format!("{} is required", field))),
    }
}

/// Parse a hyphenated UUID, case-insensitively, normalized to lowercase.
fn parse_uuid(value: &str, field: &str) -> Result<Uuid, AppError> {
    // Uuid::parse_str also takes simple and braced forms
    if value.len() != 36 {
        return Err(AppError::Validation(format!("{} is not a valid UUID", field)));
    }
    Uuid::parse_str(value)
        .map_err(|_| AppError::Validation(format!("{} is not a valid UUID", field)))
}

fn parse_role(value: &str) -> Result<MemberRole, AppError> {
    MemberRole::parse(value).ok_or_else(|| {
        let allowed: Vec<&str> = MemberRole::ALL.iter().map(|r| r.as_str()).collect();
        AppError::Validation(format!(
            "Invalid role '{}', expected one of: {}",
            value,
            allowed.join(", ")
        ))
    })
}

fn parse_status(value: &str) -> Result<BrigadeStatus, AppError> {
    BrigadeStatus::parse(value).ok_or_else(|| {
        let allowed: Vec<&str> = BrigadeStatus::ALL.iter().map(|s| s.as_str()).collect();
        AppError::Validation(format!(
            "Invalid status '{}', expected one of: {}",
            value,
            allowed.join(", ")
        ))
    })
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::Validation(format!("{} must be a date formatted as YYYY-MM-DD", field))
    })
}

/// Optional date field: absent or blank means no date.
fn parse_optional_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, AppError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => parse_date(v, field).map(Some),
        _ => Ok(None),
    }
}

/// A replacement list of records; anything but a JSON array is rejected.
fn records(value: Option<Value>, field: &str) -> Result<Vec<Value>, AppError> {
    match value {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(AppError::Validation(format!("{} must be an array", field))),
    }
}
