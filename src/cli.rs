use chrono::{Days, NaiveDate};
use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::models::{Category, Priority, Status};
use crate::query::{QuickFilter, SortKey, StructuredFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Act as this user instead of the logged-in one
    #[arg(short = 'u', long = "user", global = true, value_name = "LOGIN")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Accepts `YYYY-MM-DD`, `today` or `tomorrow`.
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    let today = crate::query::today();
    match value.trim().to_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => today
            .checked_add_days(Days::new(1))
            .ok_or_else(|| "date out of range".to_string()),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .map_err(|_| format!("'{value}' is not a date (use YYYY-MM-DD)")),
    }
}

/// Accepts `YYYY-MM`.
pub fn parse_month(value: &str) -> Result<(i32, u32), String> {
    let invalid = || format!("'{value}' is not a month (use YYYY-MM)");
    let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
    let year = year.parse().map_err(|_| invalid())?;
    let month = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

#[derive(Args, Debug, Default)]
#[command(group(ArgGroup::new("quick").multiple(false)))]
#[command(group(ArgGroup::new("structured").multiple(false)))]
pub struct ListArgs {
    /// Only tasks whose title or description contains TEXT
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Due today
    #[arg(long, group = "quick")]
    pub today: bool,
    /// High priority
    #[arg(long, group = "quick")]
    pub important: bool,
    /// Due within the next seven days
    #[arg(long, group = "quick")]
    pub upcoming: bool,
    /// Due on DATE
    #[arg(long, group = "quick", value_name = "DATE", value_parser = parse_date)]
    pub on: Option<NaiveDate>,

    #[arg(long, group = "structured")]
    pub category: Option<Category>,
    #[arg(long, group = "structured")]
    pub priority: Option<Priority>,
    #[arg(long, group = "structured")]
    pub status: Option<Status>,
    /// Completed tasks only
    #[arg(long, group = "structured")]
    pub completed: bool,
    /// Archived tasks only
    #[arg(long, group = "structured")]
    pub archived: bool,

    /// date, priority or title
    #[arg(long, value_name = "KEY")]
    pub sort: Option<SortKey>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    pub fn quick_filter(&self) -> Option<QuickFilter> {
        if self.today {
            Some(QuickFilter::Today)
        } else if self.important {
            Some(QuickFilter::Important)
        } else if self.upcoming {
            Some(QuickFilter::Upcoming)
        } else {
            self.on.map(QuickFilter::DateEquals)
        }
    }

    pub fn structured_filter(&self) -> Option<StructuredFilter> {
        if let Some(category) = self.category {
            Some(StructuredFilter::Category(category))
        } else if let Some(priority) = self.priority {
            Some(StructuredFilter::Priority(priority))
        } else if let Some(status) = self.status {
            Some(StructuredFilter::Status(status))
        } else if self.completed {
            Some(StructuredFilter::Completed)
        } else if self.archived {
            Some(StructuredFilter::Archived)
        } else {
            None
        }
    }
}

#[derive(Args, Debug, Default)]
#[command(group(ArgGroup::new("due_change").multiple(false)))]
#[command(group(ArgGroup::new("archive_change").multiple(false)))]
pub struct EditArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(short = 'd', long)]
    pub description: Option<String>,
    #[arg(short = 'p', long)]
    pub priority: Option<Priority>,
    #[arg(short = 'c', long)]
    pub category: Option<Category>,
    #[arg(short = 's', long)]
    pub status: Option<Status>,
    #[arg(long, group = "due_change", value_name = "DATE", value_parser = parse_date)]
    pub due: Option<NaiveDate>,
    /// Remove the due date
    #[arg(long, group = "due_change")]
    pub clear_due: bool,
    #[arg(long, group = "archive_change")]
    pub archive: bool,
    #[arg(long, group = "archive_change")]
    pub unarchive: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a user
    Register {
        #[arg(value_name = "LOGIN")]
        login_id: String,
    },
    /// Make LOGIN the active user
    Login {
        #[arg(value_name = "LOGIN")]
        login_id: String,
    },
    /// Show the active user
    Whoami,
    /// Add a task
    Add {
        #[arg(value_name = "TITLE")]
        title: String,
        #[arg(short = 'd', long)]
        description: Option<String>,
        #[arg(short = 'p', long)]
        priority: Option<Priority>,
        #[arg(short = 'c', long)]
        category: Option<Category>,
        #[arg(short = 's', long)]
        status: Option<Status>,
        #[arg(long, value_name = "DATE", value_parser = parse_date)]
        due: Option<NaiveDate>,
    },
    /// List tasks, optionally searched, filtered and sorted
    List(ListArgs),
    /// Change fields of a task
    Edit {
        /// Task id or title
        #[arg(value_name = "TASK")]
        task: String,
        #[command(flatten)]
        fields: EditArgs,
    },
    /// Change task status
    Status {
        #[arg(value_name = "TASK")]
        task: String,
        #[arg(value_name = "STATUS")]
        status: Status,
    },
    /// Mark one or more tasks completed
    Complete {
        #[arg(value_name = "TASK", required = true)]
        tasks: Vec<String>,
    },
    /// Delete one or more tasks
    Delete {
        #[arg(value_name = "TASK", required = true)]
        tasks: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Show task statistics and the weekly completion trend
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Show a month with the number of tasks due each day
    Calendar {
        #[arg(long, value_name = "YYYY-MM", value_parser = parse_month)]
        month: Option<(i32, u32)>,
    },
    /// Set a config value
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },
    /// Get a config value
    Get {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// List all config values
    ConfigList,
    /// Delete a config value
    ConfigDelete {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Launch TUI interface
    Tui,
    /// Print a shell completion script
    Completions {
        #[arg(value_name = "SHELL")]
        shell: clap_complete::Shell,
    },
}
