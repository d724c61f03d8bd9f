//! Request payloads and response bodies for the HTTP surface

use serde::{Deserialize, Serialize};
use crate::storage::{ListQuery, Page};
use crate::student::{Field, Status, StudentInput, StudentRecord};
use crate::{Error, Result};

#[derive(Debug, Default, Deserialize)]
pub struct CheckParams {
    pub nisn: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

/// Query string of the staff listing. `all` and empty values mean
/// "no filter".
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub status: Option<String>,
    pub class: Option<String>,
    pub major: Option<String>,
    pub page: Option<u32>,
}

impl ListParams {
    pub fn to_query(&self) -> Result<ListQuery> {
        let status = match active_filter(&self.status) {
            Some(raw) => Some(raw.parse::<Status>()?),
            None => None,
        };

        Ok(ListQuery {
            search: active_filter(&self.search),
            status,
            class: active_filter(&self.class),
            major: active_filter(&self.major),
            page: self.page.unwrap_or(1),
        })
    }

    /// Filters echoed back with the listing, defaults filled in
    pub fn echo(&self) -> ListFilters {
        let or_all = |value: &Option<String>| active_filter(value).unwrap_or_else(|| "all".to_string());
        ListFilters {
            search: self.search.clone().unwrap_or_default(),
            status: or_all(&self.status),
            class: or_all(&self.class),
            major: or_all(&self.major),
        }
    }
}

fn active_filter(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
        .map(str::to_string)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListFilters {
    pub search: String,
    pub status: String,
    pub class: String,
    pub major: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterOptions {
    pub classes: Vec<String>,
    pub majors: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudentIndex {
    pub students: Page<StudentRecord>,
    pub filters: ListFilters,
    pub filter_options: FilterOptions,
}

/// Body of a create or update request. Fields are optional here so a
/// missing one is reported against its name rather than as a parse error.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StudentPayload {
    pub nisn: Option<String>,
    pub name: Option<String>,
    pub class: Option<String>,
    pub major: Option<String>,
    pub score: Option<ScoreValue>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Form posts send the score as text, JSON clients as a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    Number(f64),
    Text(String),
}

impl ScoreValue {
    fn to_score(&self) -> Result<f64> {
        match self {
            ScoreValue::Number(n) => Ok(*n),
            ScoreValue::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::constraint(Field::Score, "score must be a number")),
        }
    }
}

impl StudentPayload {
    pub fn into_input(self) -> Result<StudentInput> {
        let input = StudentInput {
            nisn: required(Field::Nisn, self.nisn)?,
            name: required(Field::Name, self.name)?,
            class: required(Field::Class, self.class)?,
            major: required(Field::Major, self.major)?,
            score: self
                .score
                .ok_or_else(|| Error::constraint(Field::Score, "score is required"))?
                .to_score()?,
            status: required(Field::Status, self.status)?.parse()?,
            notes: self.notes,
        };
        input.validate()?;
        Ok(input)
    }
}

fn required(field: Field, value: Option<String>) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::constraint(field, format!("{} is required", field)))
}
