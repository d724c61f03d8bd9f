//! Student record types
//!
//! A `StudentRecord` is the only persisted entity. Writes go through
//! `StudentInput`, which carries every staff-editable field and checks
//! the record invariants before the store touches SQL:
//! - `nisn` is exactly 10 characters
//! - `score` lies in [0, 100]
//! - `status` is `passed` or `failed`

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Exact length of a national student ID.
pub const NISN_LEN: usize = 10;
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_LABEL_LEN: usize = 50;
pub const MAX_NOTES_LEN: usize = 1000;
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// Graduation outcome. Recorded by staff, never derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
}

impl Status {
    /// Get the string representation stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
        }
    }

    /// Human label for terminal output
    pub fn label(&self) -> &'static str {
        match self {
            Status::Passed => "Passed",
            Status::Failed => "Failed",
        }
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "passed" | "pass" | "lulus" => Ok(Status::Passed),
            "failed" | "fail" | "tidak_lulus" => Ok(Status::Failed),
            _ => Err(Error::constraint(
                Field::Status,
                format!("invalid graduation status '{}' (expected passed or failed)", s),
            )),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Record fields, used to point a constraint violation at its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Nisn,
    Name,
    Class,
    Major,
    Score,
    Status,
    Notes,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Nisn => "nisn",
            Field::Name => "name",
            Field::Class => "class",
            Field::Major => "major",
            Field::Score => "score",
            Field::Status => "status",
            Field::Notes => "notes",
        }
    }

    pub fn all() -> &'static [Field] {
        &[
            Field::Nisn,
            Field::Name,
            Field::Class,
            Field::Major,
            Field::Score,
            Field::Status,
            Field::Notes,
        ]
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted student record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Surrogate key assigned by the store
    pub id: i64,
    /// National student ID (unique, 10 characters)
    pub nisn: String,
    pub name: String,
    /// Enrollment group label, e.g. "XII IPA 1"
    pub class: String,
    /// Academic track label, e.g. "IPA"
    pub major: String,
    /// Final score with two-decimal precision
    pub score: f64,
    pub status: Status,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentRecord {
    pub fn has_passed(&self) -> bool {
        self.status == Status::Passed
    }
}

/// Staff-supplied fields for creating or editing a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentInput {
    pub nisn: String,
    pub name: String,
    pub class: String,
    pub major: String,
    pub score: f64,
    pub status: Status,
    #[serde(default)]
    pub notes: Option<String>,
}

impl StudentInput {
    /// Create an input with the required fields and no notes
    pub fn new(
        nisn: impl Into<String>,
        name: impl Into<String>,
        class: impl Into<String>,
        major: impl Into<String>,
        score: f64,
        status: Status,
    ) -> Self {
        Self {
            nisn: nisn.into(),
            name: name.into(),
            class: class.into(),
            major: major.into(),
            score,
            status,
            notes: None,
        }
    }

    /// Set the notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Check every field-level invariant. Uniqueness of `nisn` is the
    /// store's job since it needs the table.
    pub fn validate(&self) -> Result<()> {
        if self.nisn.chars().count() != NISN_LEN {
            return Err(Error::constraint(
                Field::Nisn,
                format!("NISN must be exactly {} characters", NISN_LEN),
            ));
        }
        check_text(Field::Name, &self.name, MAX_NAME_LEN)?;
        check_text(Field::Class, &self.class, MAX_LABEL_LEN)?;
        check_text(Field::Major, &self.major, MAX_LABEL_LEN)?;

        if !self.score.is_finite() || self.score < MIN_SCORE || self.score > MAX_SCORE {
            return Err(Error::constraint(
                Field::Score,
                format!("score must be between {} and {}", MIN_SCORE, MAX_SCORE),
            ));
        }

        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_NOTES_LEN {
                return Err(Error::constraint(
                    Field::Notes,
                    format!("notes may not exceed {} characters", MAX_NOTES_LEN),
                ));
            }
        }
        Ok(())
    }

    /// Score rounded to the stored two-decimal precision
    pub fn stored_score(&self) -> f64 {
        round2(self.score)
    }

    /// Notes with blank values collapsed to `None`
    pub fn stored_notes(&self) -> Option<&str> {
        self.notes.as_deref().filter(|n| !n.trim().is_empty())
    }
}

fn check_text(field: Field, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::constraint(field, format!("{} is required", field)));
    }
    if value.chars().count() > max {
        return Err(Error::constraint(
            field,
            format!("{} may not exceed {} characters", field, max),
        ));
    }
    Ok(())
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
