mod cli;
mod config;
mod database;
mod error;
mod matcher;
mod models;
mod query;
mod stats;
mod store;
mod ui;

#[cfg(test)]
mod testing;

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, EditArgs, ListArgs};
use database::Database;
use matcher::Resolution;
use models::{NewTask, Status, Task, TaskUpdate, User};
use query::{Query, SortKey};
use store::TaskStore;
use ui::run_tui;

/// `log` records are routed through tracing-subscriber to stderr so stdout
/// stays clean for `--json`.
fn init_logging() {
    let filter = EnvFilter::try_from_env(config::LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn ask_user_confirmation(prompt: &str) -> Result<bool> {
    print!("{prompt} (y/n): ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let answer = input.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn active_user(db: &Database, flag: Option<&str>) -> Result<User> {
    let Some(login_id) = config::active_login(db, flag)? else {
        let known: Vec<String> = db.list_users()?.into_iter().map(|user| user.login_id).collect();
        if known.is_empty() {
            bail!("no users yet; run `dodeck register <LOGIN>` first");
        }
        bail!(
            "no active user; run `dodeck login <LOGIN>` or pass --user (registered: {})",
            known.join(", ")
        );
    };
    db.find_user(&login_id)
        .with_context(|| format!("cannot act as '{login_id}'"))
}

/// Turns a task reference into one task, asking before accepting a fuzzy
/// match. `None` means the user was told why nothing was selected.
fn resolve_task(db: &Database, user: &User, reference: &str) -> Result<Option<Task>> {
    let tasks = db.list_tasks(user.id).context("Failed to load tasks")?;
    match matcher::resolve(&tasks, reference) {
        Resolution::Exact(task) => Ok(Some(task)),
        Resolution::Suggested { task, score } => {
            log::debug!("fuzzy match '{}' -> {} (score {})", reference, task.id, score);
            let prompt = format!("'{}' not found. Did you mean '{}' ({})?", reference, task.title, task.id);
            if ask_user_confirmation(&prompt)? {
                Ok(Some(task))
            } else {
                println!("Skipped '{reference}'.");
                Ok(None)
            }
        }
        Resolution::Ambiguous(candidates) => {
            println!("'{reference}' matches several tasks; use an id:");
            for task in candidates {
                println!("  {} {}", task.id, task.title);
            }
            Ok(None)
        }
        Resolution::NotFound => {
            println!("Task '{reference}' not found.");
            Ok(None)
        }
    }
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }
    println!("Tasks:");
    println!("------");
    for task in tasks {
        let due = task
            .due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        let archived = if task.archived { " | Archived" } else { "" };
        println!(
            "{} {} | Priority: {} | Category: {} | Status: {} | Due: {}{}",
            task.id, task.title, task.priority, task.category, task.status, due, archived
        );
    }
    println!("\n{} tasks found", tasks.len());
}

fn list_query(args: &ListArgs, sort_key: SortKey) -> Query {
    let mut query = Query::new().sort_by(sort_key);
    if let Some(text) = &args.search {
        query = query.search(text.as_str());
    }
    if let Some(filter) = args.structured_filter() {
        query = query.structured(filter);
    }
    if let Some(filter) = args.quick_filter() {
        query = query.quick(filter);
    }
    query
}

fn list_tasks(db: &Database, user: &User, args: ListArgs) -> Result<()> {
    let tasks = db.list_tasks(user.id).context("Failed to load tasks")?;
    let sort_key = match args.sort {
        Some(key) => key,
        None => config::default_sort(db)?,
    };
    let query = list_query(&args, sort_key);
    log::debug!("running query {:?}", query);

    let filtered = query::filter_tasks_now(&tasks, &query)?;
    let found = query::sort_tasks(&filtered, query.sort_key);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&found)?);
    } else {
        print_tasks(&found);
    }
    Ok(())
}

fn edit_update(fields: EditArgs) -> TaskUpdate {
    let due_date = if fields.clear_due {
        Some(None)
    } else {
        fields.due.map(Some)
    };
    let archived = if fields.archive {
        Some(true)
    } else if fields.unarchive {
        Some(false)
    } else {
        None
    };
    TaskUpdate {
        title: fields.title,
        description: fields.description,
        priority: fields.priority,
        category: fields.category,
        status: fields.status,
        due_date,
        archived,
    }
}

fn update_one(db: &mut Database, user: &User, reference: &str, update: TaskUpdate) -> Result<()> {
    let Some(task) = resolve_task(db, user, reference)? else {
        return Ok(());
    };
    let updated = db
        .update_task(user.id, task.id, update)
        .with_context(|| format!("Failed to update task {}", task.id))?;
    println!("Task '{}' updated (status: {}, priority: {})", updated.title, updated.status, updated.priority);
    Ok(())
}

fn print_stats(db: &Database, user: &User, json: bool) -> Result<()> {
    let tasks = db.list_tasks(user.id).context("Failed to load tasks")?;
    let stats = stats::compute_statistics_now(&tasks)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Total Tasks:     {}", stats.total);
    println!("Completed:       {}", stats.completed);
    println!("Pending:         {}", stats.pending);
    println!("Overdue:         {}", stats.overdue);
    println!(
        "Completion Rate: {:.1}% ({} of {} tasks)",
        stats.completion_rate, stats.completed, stats.task_count
    );
    println!("Points:          {}", stats.points);
    if let Some(category) = stats.top_category {
        println!("Top Category:    {category}");
    }
    if let Some(priority) = stats.top_priority {
        println!("Top Priority:    {priority}");
    }

    println!("\nBy status:");
    for (status, count) in stats.by_status.iter() {
        println!("  {:<18}{}", status.label(), count);
    }
    println!("By priority:");
    for (priority, count) in stats.by_priority.iter() {
        println!("  {:<18}{}", priority.label(), count);
    }
    println!("By category:");
    for (category, count) in stats.by_category.iter() {
        println!("  {:<18}{}", category.label(), count);
    }

    println!("\nCompleted this week:");
    for point in &stats.weekly_trend {
        println!("  {} {} {}", point.label, "#".repeat(point.completed), point.completed);
    }
    Ok(())
}

fn print_calendar(db: &Database, user: &User, month: Option<(i32, u32)>) -> Result<()> {
    use chrono::Datelike;

    let today = query::today();
    let (year, month) = month.unwrap_or((today.year(), today.month()));
    let tasks = db.list_tasks(user.id).context("Failed to load tasks")?;
    let counts = stats::due_counts_for_month(&tasks, year, month)?;
    let weeks = stats::calendar_weeks(year, month)?;

    println!("{year}-{month:02}  (day[tasks due])");
    println!("{}", ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"].map(|d| format!("{d:<7}")).concat());
    for week in weeks {
        let row: String = week
            .iter()
            .map(|cell| match cell {
                Some(day) => match counts.get(day) {
                    Some(count) => format!("{:<7}", format!("{:>2}[{}]", day.day(), count)),
                    None => format!("{:<7}", format!("{:>2}", day.day())),
                },
                None => " ".repeat(7),
            })
            .collect();
        println!("{}", row.trim_end());
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let db_path = config::db_path();
    let mut db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    let user_flag = cli.user.as_deref();

    match cli.command {
        Some(Commands::Register { login_id }) => {
            let user = db.register_user(&login_id)?;
            println!("User '{}' registered successfully", user.login_id);
            if db.get_config(config::CURRENT_USER_KEY)?.is_none() {
                db.set_config(config::CURRENT_USER_KEY, &user.login_id)?;
                println!("Logged in as '{}'", user.login_id);
            }
        }
        Some(Commands::Login { login_id }) => {
            let user = db.find_user(&login_id)?;
            db.set_config(config::CURRENT_USER_KEY, &user.login_id)?;
            println!("Logged in as '{}'", user.login_id);
        }
        Some(Commands::Whoami) => match config::active_login(&db, user_flag)? {
            Some(login_id) => println!("{login_id}"),
            None => println!("No active user."),
        },
        Some(Commands::Add { title, description, priority, category, status, due }) => {
            let user = active_user(&db, user_flag)?;
            let task = db.create_task(
                user.id,
                NewTask {
                    title,
                    description,
                    priority,
                    category,
                    status,
                    due_date: due,
                },
            )?;
            println!("Task '{}' created ({})", task.title, task.id);
        }
        Some(Commands::List(args)) => {
            let user = active_user(&db, user_flag)?;
            list_tasks(&db, &user, args)?;
        }
        Some(Commands::Edit { task, fields }) => {
            let user = active_user(&db, user_flag)?;
            let update = edit_update(fields);
            if update.is_empty() {
                println!("Nothing to change; pass at least one field.");
                return Ok(());
            }
            update_one(&mut db, &user, &task, update)?;
        }
        Some(Commands::Status { task, status }) => {
            let user = active_user(&db, user_flag)?;
            update_one(&mut db, &user, &task, TaskUpdate::status(status))?;
        }
        Some(Commands::Complete { tasks }) => {
            let user = active_user(&db, user_flag)?;
            for reference in &tasks {
                update_one(&mut db, &user, reference, TaskUpdate::status(Status::Completed))?;
            }
        }
        Some(Commands::Delete { tasks, yes }) => {
            let user = active_user(&db, user_flag)?;
            let mut selected = Vec::new();
            for reference in &tasks {
                if let Some(task) = resolve_task(&db, &user, reference)? {
                    selected.push(task);
                }
            }
            if selected.is_empty() {
                return Ok(());
            }
            let prompt = format!("Delete {} task(s)? This cannot be undone.", selected.len());
            if !yes && !ask_user_confirmation(&prompt)? {
                println!("Operation cancelled.");
                return Ok(());
            }
            for task in selected {
                db.delete_task(user.id, task.id)?;
                println!("Task '{}' deleted", task.title);
            }
        }
        Some(Commands::Stats { json }) => {
            let user = active_user(&db, user_flag)?;
            print_stats(&db, &user, json)?;
        }
        Some(Commands::Calendar { month }) => {
            let user = active_user(&db, user_flag)?;
            print_calendar(&db, &user, month)?;
        }
        Some(Commands::Set { key, value }) => {
            if let Err(reason) = config::validate_value(&key, &value) {
                bail!("cannot set {key}: {reason}");
            }
            db.set_config(&key, &value)?;
            println!("{key} = {value}");
        }
        Some(Commands::Get { key }) => match db.get_config(&key)? {
            Some(value) => println!("{value}"),
            None => println!("Config '{key}' is not set"),
        },
        Some(Commands::ConfigList) => {
            println!("Configs:");
            println!("--------");
            for item in db.list_configs()? {
                let description = item.description.as_deref().unwrap_or("");
                println!("{} = {} | {} | Updated: {}", item.key_name, item.value, description, item.updated_at);
            }
        }
        Some(Commands::ConfigDelete { key }) => {
            if db.delete_config(&key)? {
                println!("Config '{key}' deleted");
            } else {
                println!("Config '{key}' not found");
            }
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "dodeck", &mut io::stdout());
        }
        Some(Commands::Tui) | None => {
            let user = active_user(&db, user_flag)?;
            run_tui(db, user)?;
        }
    }

    Ok(())
}
