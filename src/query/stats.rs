//! Graduation statistics
//!
//! Every figure is recomputed from the store on each call:
//! - overall totals and pass percentage
//! - per-class and per-major status counts
//! - the latest passed records

use serde::{Deserialize, Serialize};
use crate::Result;
use crate::storage::{GroupField, GroupedCounts, StudentStore};
use crate::student::{round2, Status, StudentRecord};

/// Size of the recent-passed window
pub const RECENT_PASSED_LIMIT: usize = 10;

/// Whole-table graduation counts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    /// `passed / total * 100` rounded to two decimals, 0 for an empty table
    pub pass_percentage: f64,
}

impl OverallStats {
    pub fn new(passed: u64, failed: u64) -> Self {
        let total = passed + failed;
        Self {
            total,
            passed,
            failed,
            pass_percentage: pass_percentage(passed, total),
        }
    }
}

/// Everything the public statistics page shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcements {
    pub overall_stats: OverallStats,
    pub stats_by_class: GroupedCounts,
    pub stats_by_major: GroupedCounts,
    pub recent_graduates: Vec<StudentRecord>,
}

/// Pass rate in percent, rounded to two decimals. An empty population
/// yields 0 rather than an error.
pub fn pass_percentage(passed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(passed as f64 / total as f64 * 100.0)
}

/// Aggregation queries over the student store
pub struct StatsService<'a, S: StudentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: StudentStore + ?Sized> StatsService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn overall(&self) -> Result<OverallStats> {
        // The status CHECK constraint makes passed + failed the total
        let passed = self.store.count(Some(Status::Passed))?;
        let failed = self.store.count(Some(Status::Failed))?;
        Ok(OverallStats::new(passed, failed))
    }

    pub fn by_class(&self) -> Result<GroupedCounts> {
        self.store.count_grouped(GroupField::Class)
    }

    pub fn by_major(&self) -> Result<GroupedCounts> {
        self.store.count_grouped(GroupField::Major)
    }

    pub fn recent_passed(&self) -> Result<Vec<StudentRecord>> {
        self.store.recent(Status::Passed, RECENT_PASSED_LIMIT)
    }

    pub fn announcements(&self) -> Result<Announcements> {
        let announcements = Announcements {
            overall_stats: self.overall()?,
            stats_by_class: self.by_class()?,
            stats_by_major: self.by_major()?,
            recent_graduates: self.recent_passed()?,
        };
        tracing::debug!(
            "Computed announcements: {} records, {} classes, {} majors",
            announcements.overall_stats.total,
            announcements.stats_by_class.len(),
            announcements.stats_by_major.len()
        );
        Ok(announcements)
    }
}
