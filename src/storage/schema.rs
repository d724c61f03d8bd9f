//! Database schema definitions

/// SQL to create the students table
///
/// The CHECK and UNIQUE clauses mirror `StudentInput::validate` so a write
/// that bypasses validation still cannot persist an invalid record.
pub const CREATE_STUDENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nisn TEXT NOT NULL UNIQUE CHECK (length(nisn) = 10),
    name TEXT NOT NULL,
    class TEXT NOT NULL,
    major TEXT NOT NULL,
    score REAL NOT NULL CHECK (score >= 0 AND score <= 100),
    status TEXT NOT NULL CHECK (status IN ('passed', 'failed')),
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_students_nisn ON students(nisn)",
    "CREATE INDEX IF NOT EXISTS idx_students_name ON students(name)",
    "CREATE INDEX IF NOT EXISTS idx_students_status ON students(status)",
    "CREATE INDEX IF NOT EXISTS idx_students_status_class ON students(status, class)",
    "CREATE INDEX IF NOT EXISTS idx_students_major_status ON students(major, status)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_STUDENTS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
