pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, header, info, section, success, summary_row, warn};
pub use table::{grouped_table, stats_table, student_table, TableBuilder};
pub use theme::{theme, Theme};
