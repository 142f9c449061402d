use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::cli::error::{user_error, validate_progress, validate_record_key};
use crate::cli::output::{
    format_config, format_detection_report, format_record_detail, format_record_table,
    get_terminal_width, is_tty,
};
use crate::cli::parser::{apply_field_args, parse_date_arg, parse_field_args};
use crate::db::DbConnection;
use crate::models::{ConfigError, DisplayConfig, Record, Role, TimelineTask, ViewGranularity};
use crate::repo::{ConfigRepo, RecordRepo, SqliteStore, WriteOutcome};
use crate::timeline::detect::profile_fields;
use crate::timeline::{
    EditError, EventOutcome, JsonRenderer, MountedRenderer, TextRenderer, TimelineEvent,
    TimelineOutcome, TimelineRenderer, TimelineView,
};
use crate::utils::fuzzy::find_near_matches;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(about = "Gantry - render records as a dependency-aware timeline and write edits back")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a record
    Add {
        /// Stable record key (e.g. projects/Research.md)
        key: String,
        /// Display name (defaults to the key's basename)
        #[arg(long)]
        name: Option<String>,
        /// Free-form body text
        #[arg(long)]
        body: Option<String>,
        /// Fields as field:value (e.g. start:2026-03-15 status:Todo)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        fields: Vec<String>,
    },
    /// Set or remove fields on an existing record (field: removes)
    Set {
        key: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        fields: Vec<String>,
    },
    /// Import records from a JSON array of {key, name?, fields, body?}
    Import {
        file: PathBuf,
    },
    /// List records
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show a record
    Show {
        key: String,
    },
    /// Remove a record
    Remove {
        key: String,
    },
    /// Render the timeline
    Timeline {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Group rows by this field
        #[arg(long)]
        group_by: Option<String>,
        /// quarter-day, half-day, day, week, month or year
        #[arg(long)]
        granularity: Option<String>,
        /// Hide progress
        #[arg(long)]
        no_progress: bool,
        /// Show expected progress for today
        #[arg(long)]
        expected: bool,
    },
    /// Show which field plays which role
    Detect {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Move or resize a task (end defaults to keeping the duration)
    Move {
        /// Task id (task:<key>) or record key
        task: String,
        start: String,
        end: Option<String>,
    },
    /// Set a task's progress (0-100)
    Progress {
        /// Task id (task:<key>) or record key
        task: String,
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    /// Open the record behind a task
    Click {
        /// Task id (task:<key>) or record key
        task: String,
    },
    /// Create a record starting on a date
    NewAt {
        date: String,
        key: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Timeline configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show effective settings
    Show,
    /// Store a setting (e.g. role.start begins, view.granularity month)
    Set {
        key: String,
        value: String,
    },
    /// Remove a stored setting
    Unset {
        key: String,
    },
}

pub fn run() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };
    handle_command(cli)
}

fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Add { key, name, body, fields } => handle_add(key, name, body, fields),
        Commands::Set { key, fields } => handle_set(key, fields),
        Commands::Import { file } => handle_import(file),
        Commands::List { json } => handle_list(json),
        Commands::Show { key } => handle_show(key),
        Commands::Remove { key } => handle_remove(key),
        Commands::Timeline { json, group_by, granularity, no_progress, expected } => {
            handle_timeline(json, group_by, granularity, no_progress, expected)
        }
        Commands::Detect { json } => handle_detect(json),
        Commands::Move { task, start, end } => handle_move(task, start, end),
        Commands::Progress { task, value } => handle_progress(task, value),
        Commands::Click { task } => handle_click(task),
        Commands::NewAt { date, key, name } => handle_new_at(date, key, name),
        Commands::Config { subcommand } => handle_config(subcommand),
    }
}

fn connect() -> Result<Connection> {
    DbConnection::connect().context("Failed to connect to database")
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn handle_add(key: String, name: Option<String>, body: Option<String>, fields: Vec<String>) -> Result<()> {
    if let Err(e) = validate_record_key(&key) {
        user_error(&e);
    }
    let args = parse_field_args(&fields).unwrap_or_else(|e| user_error(&e.to_string()));

    let conn = connect()?;
    if RecordRepo::get_by_key(&conn, &key)?.is_some() {
        user_error(&format!("Record already exists: {}", key));
    }

    let mut record = Record::new(key);
    record.name = name.filter(|n| !n.trim().is_empty());
    record.body = body;
    apply_field_args(&mut record.fields, args);

    let saved = RecordRepo::upsert(&conn, &record)?;
    println!("Added record {}.", saved.key);
    Ok(())
}

fn handle_set(key: String, fields: Vec<String>) -> Result<()> {
    let args = parse_field_args(&fields).unwrap_or_else(|e| user_error(&e.to_string()));
    let conn = connect()?;
    let Some(mut record) = RecordRepo::get_by_key(&conn, &key)? else {
        user_error(&format!("Record not found: {}", key));
    };
    apply_field_args(&mut record.fields, args);
    RecordRepo::upsert(&conn, &record)?;
    println!("Updated record {}.", key);
    Ok(())
}

fn handle_import(file: PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(&file)
        .unwrap_or_else(|e| user_error(&format!("Cannot read {}: {}", file.display(), e)));
    let records: Vec<Record> = serde_json::from_str(&text)
        .unwrap_or_else(|e| user_error(&format!("Invalid import file {}: {}", file.display(), e)));

    for record in &records {
        if let Err(e) = validate_record_key(&record.key) {
            user_error(&e);
        }
    }

    let conn = connect()?;
    let tx = conn.unchecked_transaction()?;
    for record in &records {
        RecordRepo::upsert(&tx, record)?;
    }
    tx.commit().context("Failed to commit import")?;

    println!("Imported {} record{}.", records.len(), if records.len() == 1 { "" } else { "s" });
    Ok(())
}

fn handle_list(json: bool) -> Result<()> {
    let conn = connect()?;
    let records = RecordRepo::list_all(&conn).context("Failed to list records")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No records found.");
        return Ok(());
    }
    print!("{}", format_record_table(&records));
    Ok(())
}

fn handle_show(key: String) -> Result<()> {
    let conn = connect()?;
    match RecordRepo::get_by_key(&conn, &key)? {
        Some(record) => print!("{}", format_record_detail(&record)),
        None => user_error(&format!("Record not found: {}", key)),
    }
    Ok(())
}

fn handle_remove(key: String) -> Result<()> {
    let conn = connect()?;
    if !RecordRepo::delete(&conn, &key)? {
        user_error(&format!("Record not found: {}", key));
    }
    println!("Removed record {}.", key);
    Ok(())
}

fn handle_timeline(
    json: bool,
    group_by: Option<String>,
    granularity: Option<String>,
    no_progress: bool,
    expected: bool,
) -> Result<()> {
    let conn = connect()?;
    let mut config = ConfigRepo::load(&conn)?;
    if let Some(field) = group_by {
        config.group_by = Some(field).filter(|f| !f.trim().is_empty());
    }
    if let Some(g) = granularity {
        config.display.granularity = ViewGranularity::from_str(&g).unwrap_or_else(|| {
            user_error(&format!(
                "Invalid granularity '{}'. Use quarter-day, half-day, day, week, month or year.",
                g
            ))
        });
    }
    if no_progress {
        config.display.show_progress = false;
    }
    if expected {
        config.display.show_expected_progress = true;
    }

    let display = config.display.clone();
    let mut view = TimelineView::new(config);
    let tasks = match view.refresh(&SqliteStore::new(&conn), today())? {
        TimelineOutcome::Ready(tasks) => tasks,
        TimelineOutcome::NeedsConfiguration => {
            if json {
                println!("{}", serde_json::json!({ "needs_configuration": true, "tasks": [] }));
            } else {
                println!("Timeline needs configuration: no start date field was found.");
                println!("  Set one with: gantry config set role.start <field>");
            }
            return Ok(());
        }
    };

    if json {
        render_with(JsonRenderer::new(io::stdout().lock()), display, &tasks)
    } else {
        let renderer = TextRenderer::new(io::stdout().lock(), get_terminal_width(), is_tty());
        render_with(renderer, display, &tasks)
    }
}

fn render_with<R: TimelineRenderer>(renderer: R, display: DisplayConfig, tasks: &[TimelineTask]) -> Result<()> {
    let mut mounted = MountedRenderer::mount(renderer, display)?;
    mounted.render(tasks)
}

fn handle_detect(json: bool) -> Result<()> {
    let conn = connect()?;
    let config = ConfigRepo::load(&conn)?;
    let records = RecordRepo::list_all(&conn)?;
    let fields = profile_fields(&records);

    let mut view = TimelineView::new(config);
    let resolved = view.resolve_roles(&records);

    if json {
        let value = serde_json::json!({
            "roles": resolved.assignment,
            "detected": resolved.detected,
            "fields": fields,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", format_detection_report(resolved, &fields));
    }
    Ok(())
}

/// Open a refreshed view for an event command
fn open_view(conn: &Connection) -> Result<TimelineView> {
    let config = ConfigRepo::load(conn)?;
    let mut view = TimelineView::new(config);
    view.refresh(&SqliteStore::new(conn), today())?;
    Ok(view)
}

fn find_task(view: &TimelineView, reference: &str) -> TimelineTask {
    view.find_task(reference)
        .cloned()
        .unwrap_or_else(|| user_error(&format!("Task not found on the timeline: {}", reference)))
}

// Edit errors are the user's to fix; anything else propagates
fn check_edit(result: Result<EventOutcome>) -> Result<EventOutcome> {
    if let Err(e) = &result {
        if let Some(edit) = e.downcast_ref::<EditError>() {
            user_error(&edit.to_string());
        }
    }
    result
}

fn report_write(outcome: EventOutcome) {
    match outcome {
        EventOutcome::Written { key, outcome: WriteOutcome::Written(n) } => {
            println!("Updated {} ({} field{}).", key, n, if n == 1 { "" } else { "s" });
        }
        EventOutcome::Written { key, .. } => println!("No changes to {}.", key),
        EventOutcome::Missing(key) => println!("Record {} no longer exists; nothing written.", key),
        EventOutcome::Opened(record) | EventOutcome::Created(record) => {
            print!("{}", format_record_detail(&record))
        }
    }
}

fn handle_move(task_ref: String, start: String, end: Option<String>) -> Result<()> {
    let start = parse_date_arg(&start).unwrap_or_else(|e| user_error(&e));
    let end = end.map(|e| parse_date_arg(&e).unwrap_or_else(|e| user_error(&e)));

    let conn = connect()?;
    let mut view = open_view(&conn)?;
    let task = find_task(&view, &task_ref);
    let end = end.unwrap_or_else(|| start + (task.end - task.start));

    let event = TimelineEvent::DateChange {
        task_id: task.id,
        start,
        end,
    };
    let outcome = check_edit(view.handle_event(&SqliteStore::new(&conn), event))?;
    report_write(outcome);
    Ok(())
}

fn handle_progress(task_ref: String, value: i64) -> Result<()> {
    let value = validate_progress(value).unwrap_or_else(|e| user_error(&e));

    let conn = connect()?;
    let mut view = open_view(&conn)?;
    let task = find_task(&view, &task_ref);

    let event = TimelineEvent::ProgressChange {
        task_id: task.id,
        progress: value,
    };
    let outcome = check_edit(view.handle_event(&SqliteStore::new(&conn), event))?;
    report_write(outcome);
    Ok(())
}

fn handle_click(task_ref: String) -> Result<()> {
    let conn = connect()?;
    let mut view = open_view(&conn)?;
    let task = find_task(&view, &task_ref);

    let event = TimelineEvent::Click { task_id: task.id };
    let outcome = check_edit(view.handle_event(&SqliteStore::new(&conn), event))?;
    report_write(outcome);
    Ok(())
}

fn handle_new_at(date: String, key: String, name: Option<String>) -> Result<()> {
    let date = parse_date_arg(&date).unwrap_or_else(|e| user_error(&e));
    if let Err(e) = validate_record_key(&key) {
        user_error(&e);
    }

    let conn = connect()?;
    if RecordRepo::get_by_key(&conn, &key)?.is_some() {
        user_error(&format!("Record already exists: {}", key));
    }
    let mut view = open_view(&conn)?;

    let event = TimelineEvent::DateClick {
        date,
        key,
        name: name.filter(|n| !n.trim().is_empty()),
    };
    let outcome = check_edit(view.handle_event(&SqliteStore::new(&conn), event))?;
    if let EventOutcome::Created(record) = &outcome {
        println!("Created record {}.", record.key);
    }
    Ok(())
}

fn handle_config(cmd: ConfigCommands) -> Result<()> {
    let conn = connect()?;
    match cmd {
        ConfigCommands::Show => {
            let config = ConfigRepo::load(&conn)?;
            print!("{}", format_config(&config));
        }
        ConfigCommands::Set { key, value } => {
            if let Err(e) = ConfigRepo::set(&conn, &key, &value) {
                if let Some(config_error) = e.downcast_ref::<ConfigError>() {
                    user_error(&config_error.to_string());
                }
                return Err(e);
            }
            warn_unknown_field(&conn, &key, &value)?;
            println!("Set {} = {}.", key, value.trim());
        }
        ConfigCommands::Unset { key } => {
            if ConfigRepo::unset(&conn, &key)? {
                println!("Unset {}.", key);
            } else {
                println!("{} was not set.", key);
            }
        }
    }
    Ok(())
}

// Pinning a role to a field no record has is allowed, but usually a typo
fn warn_unknown_field(conn: &Connection, key: &str, value: &str) -> Result<()> {
    let names_field = key.starts_with("role.") || key == "group_by";
    let field = value.trim();
    if !names_field || field.is_empty() {
        return Ok(());
    }

    let records = RecordRepo::list_all(conn)?;
    let known: Vec<String> = profile_fields(&records).into_iter().map(|f| f.name).collect();
    if known.is_empty() || known.iter().any(|k| k == field) {
        return Ok(());
    }

    let suggestions = find_near_matches(field, &known, 3);
    match suggestions.first() {
        Some((suggestion, _)) => eprintln!(
            "Warning: no record has a field named '{}'. Did you mean '{}'?",
            field, suggestion
        ),
        None => eprintln!("Warning: no record has a field named '{}'.", field),
    }

    if let Some(role) = key.strip_prefix("role.").and_then(Role::from_str) {
        log::debug!("Pinned {} role to unknown field '{}'", role.as_str(), field);
    }
    Ok(())
}
