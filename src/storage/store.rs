//! Data-access interface for student records

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::Result;
use crate::student::{Status, StudentInput, StudentRecord};

/// Fixed page size for staff listings
pub const PAGE_SIZE: u32 = 15;

/// Typed query surface over the student table.
///
/// Reads never fail for a missing record; they return `None` or an empty
/// collection. Writes check every record invariant and report the first
/// violation as `Error::ConstraintViolation`.
pub trait StudentStore {
    /// Exact-match lookup by the unique NISN
    fn find_by_nisn(&self, nisn: &str) -> Result<Option<StudentRecord>>;

    fn get(&self, id: i64) -> Result<Option<StudentRecord>>;

    /// Count records, optionally restricted to one status
    fn count(&self, status: Option<Status>) -> Result<u64>;

    /// Count records per (group, status) pair
    fn count_grouped(&self, field: GroupField) -> Result<GroupedCounts>;

    /// Most recently created records with the given status, newest first
    fn recent(&self, status: Status, limit: usize) -> Result<Vec<StudentRecord>>;

    fn insert(&self, input: &StudentInput) -> Result<StudentRecord>;

    fn update(&self, id: i64, input: &StudentInput) -> Result<StudentRecord>;

    fn delete(&self, id: i64) -> Result<()>;

    /// Filtered, paginated listing, newest first
    fn list(&self, query: &ListQuery) -> Result<Page<StudentRecord>>;

    /// Sorted distinct values of a grouping column
    fn distinct_values(&self, field: GroupField) -> Result<Vec<String>>;
}

/// Column a statistic or filter option is grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Class,
    Major,
}

impl GroupField {
    pub fn column(&self) -> &'static str {
        match self {
            GroupField::Class => "class",
            GroupField::Major => "major",
        }
    }
}

/// Per-group status counts.
///
/// A (group, status) pair with no records has no entry; `count` reads a
/// missing entry as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupedCounts {
    groups: BTreeMap<String, BTreeMap<Status, u64>>,
}

impl GroupedCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` records for a (group, status) pair. Zero counts are
    /// not stored.
    pub fn insert(&mut self, group: impl Into<String>, status: Status, count: u64) {
        if count == 0 {
            return;
        }
        *self
            .groups
            .entry(group.into())
            .or_default()
            .entry(status)
            .or_insert(0) += count;
    }

    pub fn count(&self, group: &str, status: Status) -> u64 {
        self.groups
            .get(group)
            .and_then(|buckets| buckets.get(&status))
            .copied()
            .unwrap_or(0)
    }

    pub fn group_total(&self, group: &str) -> u64 {
        self.groups
            .get(group)
            .map(|buckets| buckets.values().sum())
            .unwrap_or(0)
    }

    /// Sum over every group and status
    pub fn total(&self) -> u64 {
        self.groups.values().flat_map(|b| b.values()).sum()
    }

    /// Group names in sorted order
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn buckets(&self, group: &str) -> Option<&BTreeMap<Status, u64>> {
        self.groups.get(group)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }
}

/// Filters for the staff listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Substring matched against name, nisn, class and major
    pub search: Option<String>,
    pub status: Option<Status>,
    pub class: Option<String>,
    pub major: Option<String>,
    /// 1-based page number
    pub page: u32,
}

impl ListQuery {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    /// Page number clamped to at least 1
    pub fn effective_page(&self) -> u32 {
        self.page.max(1)
    }

    pub fn offset(&self) -> u64 {
        (self.effective_page() as u64 - 1) * PAGE_SIZE as u64
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, current_page: u32, total: u64) -> Self {
        let per_page = PAGE_SIZE;
        let last_page = total.div_ceil(per_page as u64).max(1) as u32;
        Self {
            data,
            current_page,
            last_page,
            per_page,
            total,
        }
    }

    pub fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }
}
