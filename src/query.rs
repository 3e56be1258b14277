//! Task query engine: search, quick-access and structured filters, and
//! sorting over one owner's task list.
//!
//! Everything here is a pure function of its arguments. The current date is
//! always passed in explicitly; the `*_now` wrappers read it from the local
//! clock for callers that don't care.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use serde::Serialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::{ParseEnumError, QueryError};
use crate::models::{Category, Priority, Status, Task};

/// Width of the `upcoming` window, inclusive of both ends.
pub const UPCOMING_WINDOW_DAYS: u64 = 7;

/// Shortcut predicates shown next to the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuickFilter {
    Today,
    Important,
    Upcoming,
    DateEquals(NaiveDate),
}

impl QuickFilter {
    fn matches(self, task: &Task, today: NaiveDate) -> bool {
        match self {
            QuickFilter::Today => task.due_date == Some(today),
            QuickFilter::Important => task.priority == Priority::High,
            QuickFilter::Upcoming => match (task.due_date, today.checked_add_days(Days::new(UPCOMING_WINDOW_DAYS))) {
                (Some(due), Some(horizon)) => due >= today && due <= horizon,
                _ => false,
            },
            QuickFilter::DateEquals(day) => task.due_date == Some(day),
        }
    }
}

impl fmt::Display for QuickFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuickFilter::Today => f.write_str("Today"),
            QuickFilter::Important => f.write_str("Important"),
            QuickFilter::Upcoming => f.write_str("Upcoming"),
            QuickFilter::DateEquals(day) => write!(f, "Due {}", day.format("%Y-%m-%d")),
        }
    }
}

/// Equality filter on one task field, or one of the derived flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StructuredFilter {
    Category(Category),
    Priority(Priority),
    Status(Status),
    Completed,
    Archived,
}

impl StructuredFilter {
    fn matches(self, task: &Task) -> bool {
        match self {
            StructuredFilter::Category(category) => task.category == category,
            StructuredFilter::Priority(priority) => task.priority == priority,
            StructuredFilter::Status(status) => task.status == status,
            StructuredFilter::Completed => task.status == Status::Completed,
            StructuredFilter::Archived => task.archived,
        }
    }
}

impl fmt::Display for StructuredFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuredFilter::Category(category) => write!(f, "Category: {category}"),
            StructuredFilter::Priority(priority) => write!(f, "Priority: {priority}"),
            StructuredFilter::Status(status) => write!(f, "Status: {status}"),
            StructuredFilter::Completed => f.write_str("Completed"),
            StructuredFilter::Archived => f.write_str("Archived"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortKey {
    /// Newest first.
    #[default]
    Date,
    /// High before Medium before Low.
    Priority,
    /// Alphabetical.
    Title,
}

impl SortKey {
    #[cfg(test)]
    pub const ALL: [SortKey; 3] = [SortKey::Date, SortKey::Priority, SortKey::Title];

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::Priority => "priority",
            SortKey::Title => "title",
        }
    }

    pub fn next(self) -> SortKey {
        match self {
            SortKey::Date => SortKey::Priority,
            SortKey::Priority => SortKey::Title,
            SortKey::Title => SortKey::Date,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortKey {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "date" | "created" | "newest" => Ok(SortKey::Date),
            "priority" => Ok(SortKey::Priority),
            "title" | "name" => Ok(SortKey::Title),
            _ => Err(ParseEnumError::new("sort key", s, "date, priority, title")),
        }
    }
}

/// One user interaction's worth of list criteria. Rebuilt from input on
/// every change; never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Query {
    pub search_text: Option<String>,
    pub structured: Option<StructuredFilter>,
    pub quick: Option<QuickFilter>,
    pub sort_key: SortKey,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn structured(mut self, filter: StructuredFilter) -> Self {
        self.structured = Some(filter);
        self
    }

    pub fn quick(mut self, filter: QuickFilter) -> Self {
        self.quick = Some(filter);
        self
    }

    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort_key = key;
        self
    }

    /// Lowercased search needle, or `None` when searching is a no-op.
    fn needle(&self) -> Option<String> {
        self.search_text
            .as_deref()
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase)
    }
}

pub fn local_date(timestamp: &DateTime<Utc>) -> NaiveDate {
    timestamp.with_timezone(&Local).date_naive()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Rejects task lists the store should never have produced.
pub fn validate_tasks(tasks: &[Task]) -> Result<(), QueryError> {
    match tasks.iter().find(|task| task.title.trim().is_empty()) {
        Some(task) => Err(QueryError::InvalidTask {
            id: task.id,
            reason: "title is empty".to_string(),
        }),
        None => Ok(()),
    }
}

fn matches_search(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle) || task.description.to_lowercase().contains(needle)
}

/// Applies search, then the quick filter, then the structured filter.
/// Output keeps the input order.
pub fn filter_tasks(tasks: &[Task], query: &Query, today: NaiveDate) -> Result<Vec<Task>, QueryError> {
    validate_tasks(tasks)?;

    let needle = query.needle();
    let filtered = tasks
        .iter()
        .filter(|task| needle.as_deref().map_or(true, |needle| matches_search(task, needle)))
        .filter(|task| query.quick.map_or(true, |quick| quick.matches(task, today)))
        .filter(|task| query.structured.map_or(true, |filter| filter.matches(task)))
        .cloned()
        .collect();

    Ok(filtered)
}

pub fn filter_tasks_now(tasks: &[Task], query: &Query) -> Result<Vec<Task>, QueryError> {
    filter_tasks(tasks, query, today())
}

/// Lowercased with accents stripped, so "Éclair" files next to "eclair".
fn collation_key(title: &str) -> String {
    title
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Accent- and case-insensitive first, then unaccented before accented,
/// then lowercase before uppercase.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

/// Returns a newly ordered copy; `sort_by` is stable so ties keep input order.
pub fn sort_tasks(tasks: &[Task], key: SortKey) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    match key {
        SortKey::Date => sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Priority => sorted.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank())),
        SortKey::Title => sorted.sort_by(|a, b| compare_titles(&a.title, &b.title)),
    }
    sorted
}

/// Filter then sort, the way every list view consumes the engine.
pub fn query_tasks(tasks: &[Task], query: &Query, today: NaiveDate) -> Result<Vec<Task>, QueryError> {
    let filtered = filter_tasks(tasks, query, today)?;
    Ok(sort_tasks(&filtered, query.sort_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{date, task, TaskBuilder};
    use proptest::prelude::*;

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn search_matches_title_or_description() {
        let tasks = vec![
            task(1, "Buy milk").build(),
            task(2, "Write report").description("quarterly").build(),
        ];
        let found = filter_tasks(&tasks, &Query::new().search("report"), date(2024, 6, 10)).unwrap();
        assert_eq!(titles(&found), vec!["Write report"]);

        let found = filter_tasks(&tasks, &Query::new().search("QUARTER"), date(2024, 6, 10)).unwrap();
        assert_eq!(titles(&found), vec!["Write report"]);
    }

    #[test]
    fn empty_search_keeps_everything() {
        let tasks = vec![task(1, "a").build(), task(2, "b").build()];
        let found = filter_tasks(&tasks, &Query::new().search(""), date(2024, 6, 10)).unwrap();
        assert_eq!(found, tasks);
    }

    #[test]
    fn upcoming_covers_today_through_seven_days() {
        let today = date(2024, 6, 10);
        let tasks = vec![
            task(1, "past").due(date(2024, 6, 9)).build(),
            task(2, "soon").due(date(2024, 6, 12)).build(),
            task(3, "later").due(date(2024, 6, 20)).build(),
            task(4, "undated").build(),
        ];
        let found = filter_tasks(&tasks, &Query::new().quick(QuickFilter::Upcoming), today).unwrap();
        assert_eq!(titles(&found), vec!["soon"]);
    }

    #[test]
    fn upcoming_window_edges_are_inclusive() {
        let today = date(2024, 6, 10);
        let tasks = vec![
            task(1, "today").due(today).build(),
            task(2, "edge").due(date(2024, 6, 17)).build(),
            task(3, "beyond").due(date(2024, 6, 18)).build(),
        ];
        let found = filter_tasks(&tasks, &Query::new().quick(QuickFilter::Upcoming), today).unwrap();
        assert_eq!(titles(&found), vec!["today", "edge"]);
    }

    #[test]
    fn today_and_date_equals_ignore_undated_tasks() {
        let today = date(2024, 6, 10);
        let tasks = vec![
            task(1, "due today").due(today).build(),
            task(2, "due tomorrow").due(date(2024, 6, 11)).build(),
            task(3, "undated").build(),
        ];
        let found = filter_tasks(&tasks, &Query::new().quick(QuickFilter::Today), today).unwrap();
        assert_eq!(titles(&found), vec!["due today"]);

        let on = QuickFilter::DateEquals(date(2024, 6, 11));
        let found = filter_tasks(&tasks, &Query::new().quick(on), today).unwrap();
        assert_eq!(titles(&found), vec!["due tomorrow"]);
    }

    #[test]
    fn important_keeps_high_priority() {
        let tasks = vec![
            task(1, "low").priority(Priority::Low).build(),
            task(2, "high").priority(Priority::High).build(),
        ];
        let found = filter_tasks(&tasks, &Query::new().quick(QuickFilter::Important), date(2024, 6, 10)).unwrap();
        assert_eq!(titles(&found), vec!["high"]);
    }

    #[test]
    fn structured_filters_match_fields_and_flags() {
        let tasks = vec![
            task(1, "groceries").category(Category::Shopping).build(),
            task(2, "gym").category(Category::HealthFitness).status(Status::Completed).build(),
            task(3, "old").archived(true).build(),
        ];
        let today = date(2024, 6, 10);
        let by = |filter| filter_tasks(&tasks, &Query::new().structured(filter), today).unwrap();

        assert_eq!(titles(&by(StructuredFilter::Category(Category::Shopping))), vec!["groceries"]);
        assert_eq!(titles(&by(StructuredFilter::Status(Status::ToDo))), vec!["groceries", "old"]);
        assert_eq!(titles(&by(StructuredFilter::Completed)), vec!["gym"]);
        assert_eq!(titles(&by(StructuredFilter::Archived)), vec!["old"]);
        assert!(by(StructuredFilter::Priority(Priority::High)).is_empty());
    }

    #[test]
    fn stages_compose() {
        let today = date(2024, 6, 10);
        let tasks = vec![
            task(1, "report draft").priority(Priority::High).due(today).build(),
            task(2, "report review").priority(Priority::High).due(today).status(Status::Completed).build(),
            task(3, "report final").priority(Priority::Low).due(today).build(),
        ];
        let query = Query::new()
            .search("report")
            .quick(QuickFilter::Important)
            .structured(StructuredFilter::Status(Status::ToDo));
        let found = filter_tasks(&tasks, &query, today).unwrap();
        assert_eq!(titles(&found), vec!["report draft"]);
    }

    #[test]
    fn malformed_task_is_rejected() {
        let tasks = vec![task(1, "ok").build(), task(7, "   ").build()];
        let err = filter_tasks(&tasks, &Query::new(), date(2024, 6, 10)).unwrap_err();
        assert!(matches!(err, QueryError::InvalidTask { id, .. } if id.0 == 7));
    }

    #[test]
    fn priority_sort_orders_by_severity() {
        let tasks = vec![
            task(1, "a").priority(Priority::Low).build(),
            task(2, "b").priority(Priority::High).build(),
            task(3, "c").priority(Priority::Medium).build(),
        ];
        let sorted = sort_tasks(&tasks, SortKey::Priority);
        let priorities: Vec<Priority> = sorted.iter().map(|t| t.priority).collect();
        assert_eq!(priorities, vec![Priority::High, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn date_sort_is_newest_first_and_stable() {
        let tasks = vec![
            task(1, "first").created_days_ago(3).build(),
            task(2, "twin a").created_days_ago(1).build(),
            task(3, "newest").created_days_ago(0).build(),
            task(4, "twin b").created_days_ago(1).build(),
        ];
        let sorted = sort_tasks(&tasks, SortKey::Date);
        assert_eq!(titles(&sorted), vec!["newest", "twin a", "twin b", "first"]);
    }

    #[test]
    fn title_sort_ignores_case() {
        let tasks = vec![
            task(1, "banana").build(),
            task(2, "Apple").build(),
            task(3, "cherry").build(),
            task(4, "apple").build(),
        ];
        let sorted = sort_tasks(&tasks, SortKey::Title);
        assert_eq!(titles(&sorted), vec!["apple", "Apple", "banana", "cherry"]);
    }

    #[test]
    fn title_sort_folds_accents() {
        let tasks = vec![
            task(1, "Zebra").build(),
            task(2, "Éclair").build(),
            task(3, "apple").build(),
            task(4, "eclair").build(),
        ];
        let sorted = sort_tasks(&tasks, SortKey::Title);
        assert_eq!(titles(&sorted), vec!["apple", "eclair", "Éclair", "Zebra"]);
        assert_eq!(compare_titles("résumé", "resume"), Ordering::Greater);
        assert_eq!(compare_titles("Ångström", "angstrom"), Ordering::Greater);
        assert_eq!(compare_titles("ångström", "Ångström"), Ordering::Less);
    }

    #[test]
    fn filter_now_uses_the_local_date() {
        let tasks = vec![
            task(1, "due now").due(today()).build(),
            task(2, "undated").build(),
        ];
        let found = filter_tasks_now(&tasks, &Query::new().quick(QuickFilter::Today)).unwrap();
        assert_eq!(titles(&found), vec!["due now"]);
    }

    #[test]
    fn sorting_leaves_input_untouched() {
        let tasks = vec![
            task(1, "b").priority(Priority::Low).build(),
            task(2, "a").priority(Priority::High).build(),
        ];
        let before = tasks.clone();
        let _ = sort_tasks(&tasks, SortKey::Title);
        assert_eq!(tasks, before);
    }

    #[test]
    fn query_tasks_filters_then_sorts() {
        let tasks = vec![
            task(1, "b task").priority(Priority::Low).build(),
            task(2, "a task").priority(Priority::High).build(),
            task(3, "other").build(),
        ];
        let query = Query::new().search("task").sort_by(SortKey::Title);
        let found = query_tasks(&tasks, &query, date(2024, 6, 10)).unwrap();
        assert_eq!(titles(&found), vec!["a task", "b task"]);
    }

    #[test]
    fn sort_key_parses_and_cycles() {
        assert_eq!("Priority".parse::<SortKey>().unwrap(), SortKey::Priority);
        assert!("size".parse::<SortKey>().is_err());
        let mut key = SortKey::Date;
        for _ in 0..SortKey::ALL.len() {
            key = key.next();
        }
        assert_eq!(key, SortKey::Date);
    }

    fn arb_tasks() -> impl Strategy<Value = Vec<Task>> {
        let one = (
            "[a-zA-Z ]{0,6}[a-zA-Z]",
            0usize..3,
            0usize..3,
            0usize..8,
            proptest::option::of(-10i64..20),
            0u64..5,
            any::<bool>(),
        );
        prop::collection::vec(one, 0..24).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (title, p, s, c, due, age, archived))| {
                    let mut builder: TaskBuilder = task(i as i64 + 1, &title)
                        .priority(Priority::ALL[p])
                        .status(Status::ALL[s])
                        .category(Category::ALL[c])
                        .created_days_ago(age)
                        .archived(archived);
                    if let Some(offset) = due {
                        builder = builder.due(date(2024, 6, 10) + chrono::Duration::days(offset));
                    }
                    builder.build()
                })
                .collect()
        })
    }

    fn arb_query() -> impl Strategy<Value = Query> {
        let quick = prop_oneof![
            Just(None),
            Just(Some(QuickFilter::Today)),
            Just(Some(QuickFilter::Important)),
            Just(Some(QuickFilter::Upcoming)),
            Just(Some(QuickFilter::DateEquals(date(2024, 6, 12)))),
        ];
        let structured = prop_oneof![
            Just(None),
            Just(Some(StructuredFilter::Completed)),
            Just(Some(StructuredFilter::Archived)),
            Just(Some(StructuredFilter::Priority(Priority::Medium))),
            Just(Some(StructuredFilter::Category(Category::Work))),
        ];
        (proptest::option::of("[a-z]{0,2}"), quick, structured).prop_map(|(search_text, quick, structured)| Query {
            search_text,
            structured,
            quick,
            sort_key: SortKey::Date,
        })
    }

    proptest! {
        #[test]
        fn prop_sort_is_idempotent(tasks in arb_tasks()) {
            for key in SortKey::ALL {
                let once = sort_tasks(&tasks, key);
                prop_assert_eq!(sort_tasks(&once, key), once);
            }
        }

        #[test]
        fn prop_filter_is_an_ordered_subset(tasks in arb_tasks(), query in arb_query()) {
            let found = filter_tasks(&tasks, &query, date(2024, 6, 10)).unwrap();
            prop_assert!(found.len() <= tasks.len());
            // Ids are unique, so walking the input once proves order and no duplicates.
            let mut remaining = tasks.iter();
            for kept in &found {
                prop_assert!(remaining.any(|t| t == kept));
            }
        }
    }
}
