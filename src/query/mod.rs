pub mod lookup;
pub mod stats;

pub use lookup::{LookupResult, LookupService};
pub use stats::{pass_percentage, Announcements, OverallStats, StatsService, RECENT_PASSED_LIMIT};
