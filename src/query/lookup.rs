//! Public lookup by NISN

use serde::{Deserialize, Serialize};
use crate::Result;
use crate::storage::StudentStore;
use crate::student::StudentRecord;
use super::stats::{OverallStats, StatsService};

/// Outcome of a public status check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    /// Whether a non-empty NISN was submitted
    pub searched: bool,
    /// The NISN as submitted
    pub nisn: String,
    pub student: Option<StudentRecord>,
    /// Overall counts, present whether or not the lookup matched
    pub stats: LookupStats,
}

/// Counts shown next to the lookup form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupStats {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
}

impl From<OverallStats> for LookupStats {
    fn from(stats: OverallStats) -> Self {
        Self {
            total: stats.total,
            passed: stats.passed,
            failed: stats.failed,
        }
    }
}

/// Status lookup over the student store
pub struct LookupService<'a, S: StudentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: StudentStore + ?Sized> LookupService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Find the record whose NISN equals `nisn` exactly.
    ///
    /// No trimming or format checks happen here; anything that is not a
    /// stored NISN, including the empty string, is simply not found.
    pub fn find_by_nisn(&self, nisn: &str) -> Result<Option<StudentRecord>> {
        if nisn.is_empty() {
            return Ok(None);
        }
        self.store.find_by_nisn(nisn)
    }

    /// Lookup plus the overall counts for the public check page
    pub fn check(&self, nisn: Option<&str>) -> Result<LookupResult> {
        let nisn = nisn.unwrap_or_default();
        let searched = !nisn.is_empty();

        let student = if searched {
            self.find_by_nisn(nisn)?
        } else {
            None
        };

        match &student {
            Some(found) => tracing::debug!("Lookup hit for {}: {}", nisn, found.status),
            None if searched => tracing::debug!("Lookup miss for {}", nisn),
            None => {}
        }

        let stats = StatsService::new(self.store).overall()?;

        Ok(LookupResult {
            searched,
            nisn: nisn.to_string(),
            student,
            stats: stats.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use crate::student::{Status, StudentInput};

    fn store_with(nisns: &[&str]) -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        for (i, nisn) in nisns.iter().enumerate() {
            let status = if i % 2 == 0 { Status::Passed } else { Status::Failed };
            store
                .insert(&StudentInput::new(*nisn, "Budi", "XII IPA 1", "IPA", 75.0, status))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_every_stored_nisn_resolves_to_itself() {
        let nisns = ["0011223344", "0011223345", "9988776655", "ABCDEFGHIJ"];
        let store = store_with(&nisns);
        let lookup = LookupService::new(&store);

        for nisn in nisns {
            let found = lookup.find_by_nisn(nisn).unwrap().unwrap();
            assert_eq!(found.nisn, nisn);
        }
    }

    #[test]
    fn test_absent_and_malformed_are_not_found() {
        let store = store_with(&["0011223344"]);
        let lookup = LookupService::new(&store);

        for candidate in ["0011223340", "", "001122334", "0011223344 ", "abc", "%"] {
            assert!(lookup.find_by_nisn(candidate).unwrap().is_none(), "{:?}", candidate);
        }
    }

    #[test]
    fn test_check_on_empty_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = LookupService::new(&store).check(Some("0000000000")).unwrap();

        assert!(result.searched);
        assert!(result.student.is_none());
        assert_eq!(result.stats, LookupStats { total: 0, passed: 0, failed: 0 });
    }

    #[test]
    fn test_check_without_query_still_reports_counts() {
        let store = store_with(&["0011223344", "0011223345", "0011223346"]);
        let result = LookupService::new(&store).check(None).unwrap();

        assert!(!result.searched);
        assert!(result.student.is_none());
        assert_eq!(result.stats, LookupStats { total: 3, passed: 2, failed: 1 });
    }

    #[test]
    fn test_check_hit() {
        let store = store_with(&["0011223344", "0011223345"]);
        let result = LookupService::new(&store).check(Some("0011223345")).unwrap();

        let student = result.student.unwrap();
        assert_eq!(student.status, Status::Failed);
        assert_eq!(result.nisn, "0011223345");
    }
}
