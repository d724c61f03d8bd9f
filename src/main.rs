//! Gradcheck CLI - graduation record manager

use clap::{Parser, Subcommand};
use gradcheck::config::{self, GradcheckConfig};
use gradcheck::query::{LookupService, StatsService};
use gradcheck::server::{self, AppState};
use gradcheck::server::views::ListParams;
use gradcheck::storage::{SqliteStore, StudentStore};
use gradcheck::ui::{self, Icons};
use gradcheck::{Status, StudentInput};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "gradcheck")]
#[command(version)]
#[command(about = "Graduation record manager - pass/fail lookup and statistics")]
#[command(long_about = r#"
Gradcheck keeps one table of student graduation records and serves:
  • Public pass/fail lookup by NISN
  • Graduation statistics by class and major
  • Staff create/edit/delete of records

Example usage:
  gradcheck init
  gradcheck add --nisn 0051234567 --name "Siti Aminah" --class "XII IPA 1" --major IPA --score 88.5 --status passed
  gradcheck lookup 0051234567
  gradcheck serve --port 8080
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter gradcheck.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check a student's graduation status by NISN
    Lookup {
        /// National student ID
        nisn: String,
    },

    /// Show graduation statistics and recent graduates
    Stats,

    /// Add a student record
    Add {
        #[arg(long)]
        nisn: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        class: String,
        #[arg(long)]
        major: String,
        #[arg(long)]
        score: f64,
        /// passed or failed
        #[arg(long)]
        status: String,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Edit a student record; omitted fields keep their value
    Edit {
        id: i64,
        #[arg(long)]
        nisn: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        major: Option<String>,
        #[arg(long)]
        score: Option<f64>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a student record
    Remove {
        id: i64,
    },

    /// Show one student record
    Show {
        id: i64,
    },

    /// List student records, newest first
    List {
        /// Substring matched against name, NISN, class and major
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        major: Option<String>,
        #[arg(short, long, default_value = "1")]
        page: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli) {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let database = settings.database_path(cli.database.clone());
    let json = cli.json;

    match cli.command {
        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            let starter = GradcheckConfig {
                database: Some(database.display().to_string()),
                host: Some(settings.host(None)),
                port: Some(settings.port(None)),
                staff_token: None,
            };
            config::write_config(&path, &starter, force)?;
            ui::success(&format!("Wrote {}", path.display()));
        }

        Commands::Serve { host, port } => {
            config::ensure_db_dir(&database)?;
            let host = settings.host(host);
            let port = settings.port(port);
            let state = AppState::new(database, settings.staff_token());

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::start_server(&host, port, state))?;
        }

        Commands::Lookup { nisn } => {
            let store = open_store(&database)?;
            let result = LookupService::new(&store).check(Some(nisn.as_str()))?;

            if json {
                return print_json(&result);
            }

            ui::header(&format!("Graduation check for {}", nisn));
            match &result.student {
                Some(student) => {
                    println!("{}", ui::student_table(std::slice::from_ref(student)));
                    if student.has_passed() {
                        ui::success(&format!("{} has PASSED", student.name));
                    } else {
                        ui::warn(&format!("{} has NOT passed", student.name));
                    }
                    if let Some(notes) = &student.notes {
                        ui::info("Notes", notes);
                    }
                }
                None => println!("{} No student found with NISN {}", Icons::CROSS, nisn),
            }

            ui::section("Overall");
            ui::summary_row("Total:", &result.stats.total.to_string());
            ui::summary_row("Passed:", &result.stats.passed.to_string());
            ui::summary_row("Failed:", &result.stats.failed.to_string());
        }

        Commands::Stats => {
            let store = open_store(&database)?;
            let announcements = StatsService::new(&store).announcements()?;

            if json {
                return print_json(&announcements);
            }

            let overall = &announcements.overall_stats;
            let total = overall.total.to_string();
            let passed = overall.passed.to_string();
            let failed = overall.failed.to_string();
            let rate = format!("{:.2}%", overall.pass_percentage);

            ui::header(&format!("{} Graduation statistics ({})", Icons::STATS, database.display()));
            println!(
                "{}",
                ui::stats_table(&[
                    ("Total", total.as_str()),
                    ("Passed", passed.as_str()),
                    ("Failed", failed.as_str()),
                    ("Pass rate", rate.as_str()),
                ])
            );

            ui::section("By class");
            if announcements.stats_by_class.is_empty() {
                println!("{}", ui::dim("no records"));
            } else {
                println!("{}", ui::grouped_table(&announcements.stats_by_class));
            }

            ui::section("By major");
            if announcements.stats_by_major.is_empty() {
                println!("{}", ui::dim("no records"));
            } else {
                println!("{}", ui::grouped_table(&announcements.stats_by_major));
            }

            ui::section(&format!("{} Recent graduates", Icons::TROPHY));
            if announcements.recent_graduates.is_empty() {
                println!("{}", ui::dim("no graduates yet"));
            } else {
                println!("{}", ui::student_table(&announcements.recent_graduates));
            }
        }

        Commands::Add { nisn, name, class, major, score, status, notes } => {
            let store = open_store(&database)?;
            let mut input = StudentInput::new(nisn, name, class, major, score, status.parse()?);
            input.notes = notes;

            let record = store.insert(&input)?;
            if json {
                return print_json(&record);
            }
            ui::success(&format!("{} Added {} (id {})", Icons::NEW, record.name, record.id));
        }

        Commands::Edit { id, nisn, name, class, major, score, status, notes } => {
            let store = open_store(&database)?;
            let current = store.get(id)?.ok_or(gradcheck::Error::RecordNotFound(id))?;

            let status: Status = match status {
                Some(raw) => raw.parse()?,
                None => current.status,
            };
            let input = StudentInput {
                nisn: nisn.unwrap_or(current.nisn),
                name: name.unwrap_or(current.name),
                class: class.unwrap_or(current.class),
                major: major.unwrap_or(current.major),
                score: score.unwrap_or(current.score),
                status,
                notes: notes.or(current.notes),
            };

            let record = store.update(id, &input)?;
            if json {
                return print_json(&record);
            }
            ui::success(&format!("{} Updated {} (id {})", Icons::MOD, record.name, record.id));
        }

        Commands::Remove { id } => {
            let store = open_store(&database)?;
            store.delete(id)?;
            if json {
                return print_json(&serde_json::json!({ "deleted": id }));
            }
            ui::success(&format!("{} Deleted student record {}", Icons::DEL, id));
        }

        Commands::Show { id } => {
            let store = open_store(&database)?;
            let record = store.get(id)?.ok_or(gradcheck::Error::RecordNotFound(id))?;
            if json {
                return print_json(&record);
            }

            ui::header(&format!("{} {}", Icons::PERSON, record.name));
            ui::info("NISN", &record.nisn);
            ui::info("Class", &record.class);
            ui::info("Major", &record.major);
            ui::info("Score", &format!("{:.2}", record.score));
            ui::info("Status", record.status.label());
            ui::info("Notes", record.notes.as_deref().unwrap_or("-"));
            ui::info("Created", &record.created_at.to_rfc3339());
            ui::info("Updated", &record.updated_at.to_rfc3339());
        }

        Commands::List { search, status, class, major, page } => {
            let store = open_store(&database)?;
            // Same filter rules as the HTTP listing: "all" or blank means no filter
            let query = ListParams {
                search,
                status,
                class,
                major,
                page: Some(page),
            }
            .to_query()?;
            let result = store.list(&query)?;

            if json {
                return print_json(&result);
            }

            if result.data.is_empty() {
                println!("{} No student records found.", Icons::SEARCH);
            } else {
                println!("{}", ui::student_table(&result.data));
            }
            ui::summary_row(
                "Page",
                &format!("{}/{} ({} records)", result.current_page, result.last_page, result.total),
            );
            if result.has_more() {
                println!("{}", ui::dim(&format!("Next page: --page {}", result.current_page + 1)));
            }
        }
    }

    Ok(())
}

fn open_store(database: &std::path::Path) -> anyhow::Result<SqliteStore> {
    config::ensure_db_dir(database)?;
    tracing::debug!("Opening database {}", database.display());
    Ok(SqliteStore::open(database)?)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
