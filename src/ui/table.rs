use tabled::{settings::Style, Table, Tabled};
use crate::storage::GroupedCounts;
use crate::student::{Status, StudentRecord};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[derive(Tabled)]
struct StudentRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "NISN")]
    nisn: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Major")]
    major: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Status")]
    status: &'static str,
}

pub fn student_table(students: &[StudentRecord]) -> String {
    let rows: Vec<StudentRow> = students
        .iter()
        .map(|s| StudentRow {
            id: s.id,
            nisn: s.nisn.clone(),
            name: s.name.clone(),
            class: s.class.clone(),
            major: s.major.clone(),
            score: format!("{:.2}", s.score),
            status: s.status.label(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Passed")]
    passed: u64,
    #[tabled(rename = "Failed")]
    failed: u64,
    #[tabled(rename = "Total")]
    total: u64,
}

/// One row per group; missing buckets print as zero
pub fn grouped_table(counts: &GroupedCounts) -> String {
    let rows: Vec<GroupRow> = counts
        .groups()
        .map(|group| GroupRow {
            group: group.to_string(),
            passed: counts.count(group, Status::Passed),
            failed: counts.count(group, Status::Failed),
            total: counts.group_total(group),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}
