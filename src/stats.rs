//! Aggregates for the dashboard, analytics and calendar views.
//!
//! Statistics are always computed over the owner's full task list, never the
//! filtered subset on screen.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Days, NaiveDate};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::QueryError;
use crate::models::{Category, Priority, Status, Task};
use crate::query::{local_date, today, validate_tasks};

/// Analytics score awarded per completed task.
pub const POINTS_PER_COMPLETION: usize = 10;

/// Number of days in the completion trend, ending today.
pub const TREND_DAYS: u64 = 7;

/// Count per enum value, in the enum's declaration order, zeros included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakdown<K>(Vec<(K, usize)>);

impl<K: Copy + PartialEq> Breakdown<K> {
    fn tally(keys: &[K], tasks: &[Task], key_of: impl Fn(&Task) -> K) -> Self {
        Breakdown(
            keys.iter()
                .map(|&key| (key, tasks.iter().filter(|task| key_of(task) == key).count()))
                .collect(),
        )
    }

    pub fn get(&self, key: K) -> usize {
        self.0
            .iter()
            .find(|(k, _)| *k == key)
            .map_or(0, |(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(K, usize)> {
        self.0.iter()
    }

    /// Largest non-zero bucket; earlier keys win ties.
    pub fn top(&self) -> Option<K> {
        let mut best: Option<(K, usize)> = None;
        for &(key, count) in &self.0 {
            if count > 0 && best.map_or(true, |(_, top)| count > top) {
                best = Some((key, count));
            }
        }
        best.map(|(key, _)| key)
    }
}

impl<K: fmt::Display> Serialize for Breakdown<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, count) in &self.0 {
            map.serialize_entry(&key.to_string(), count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    /// Short English weekday, e.g. "Mon".
    pub label: String,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Count of "To Do" tasks. The dashboard has always labelled this
    /// "Total Tasks"; the real collection size is `task_count`.
    pub total: usize,
    pub task_count: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    /// Percentage with one decimal.
    pub completion_rate: f64,
    pub points: usize,
    pub by_category: Breakdown<Category>,
    pub by_priority: Breakdown<Priority>,
    pub by_status: Breakdown<Status>,
    pub top_category: Option<Category>,
    pub top_priority: Option<Priority>,
    pub weekly_trend: Vec<TrendPoint>,
}

fn completion_rate(completed: usize, task_count: usize) -> f64 {
    if task_count == 0 {
        return 0.0;
    }
    let percent = completed as f64 / task_count as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}

fn weekly_trend(tasks: &[Task], today: NaiveDate) -> Vec<TrendPoint> {
    (0..TREND_DAYS)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|day| TrendPoint {
            date: day,
            label: day.format("%a").to_string(),
            completed: tasks
                .iter()
                .filter(|task| task.is_completed() && local_date(&task.updated_at) == day)
                .count(),
        })
        .collect()
}

pub fn compute_statistics(tasks: &[Task], today: NaiveDate) -> Result<Stats, QueryError> {
    validate_tasks(tasks)?;

    let completed = tasks.iter().filter(|task| task.is_completed()).count();
    let overdue = tasks
        .iter()
        .filter(|task| !task.is_completed())
        .filter(|task| task.due_date.is_some_and(|due| due < today))
        .count();

    let by_category = Breakdown::tally(&Category::ALL, tasks, |task| task.category);
    let by_priority = Breakdown::tally(&Priority::ALL, tasks, |task| task.priority);
    let by_status = Breakdown::tally(&Status::ALL, tasks, |task| task.status);

    Ok(Stats {
        total: by_status.get(Status::ToDo),
        task_count: tasks.len(),
        completed,
        pending: tasks.len() - completed,
        overdue,
        completion_rate: completion_rate(completed, tasks.len()),
        points: completed * POINTS_PER_COMPLETION,
        top_category: by_category.top(),
        top_priority: by_priority.top(),
        by_category,
        by_priority,
        by_status,
        weekly_trend: weekly_trend(tasks, today),
    })
}

pub fn compute_statistics_now(tasks: &[Task]) -> Result<Stats, QueryError> {
    compute_statistics(tasks, today())
}

/// First and last day of a month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), QueryError> {
    let invalid = || QueryError::InvalidMonth { year, month };
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = next.and_then(|d| d.pred_opt()).ok_or_else(invalid)?;
    Ok((first, last))
}

/// The month laid out in Sunday-first weeks; cells outside the month are `None`.
pub fn calendar_weeks(year: i32, month: u32) -> Result<Vec<[Option<NaiveDate>; 7]>, QueryError> {
    let (first, last) = month_bounds(year, month)?;
    let mut weeks = Vec::new();
    let mut week = [None; 7];
    let mut slot = first.weekday().num_days_from_sunday() as usize;
    for day in first.iter_days().take_while(|day| *day <= last) {
        week[slot] = Some(day);
        slot += 1;
        if slot == 7 {
            weeks.push(week);
            week = [None; 7];
            slot = 0;
        }
    }
    if slot > 0 {
        weeks.push(week);
    }
    Ok(weeks)
}

/// Tasks due per day of the month; days with nothing due are absent.
pub fn due_counts_for_month(
    tasks: &[Task],
    year: i32,
    month: u32,
) -> Result<BTreeMap<NaiveDate, usize>, QueryError> {
    month_bounds(year, month)?;
    let mut counts = BTreeMap::new();
    for due in tasks.iter().filter_map(|task| task.due_date) {
        if due.year() == year && due.month() == month {
            *counts.entry(due).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{date, task};
    use proptest::prelude::*;

    #[test]
    fn overdue_counts_open_tasks_past_due() {
        let today = date(2024, 6, 10);
        let tasks = vec![
            task(1, "late").due(date(2024, 6, 1)).build(),
            task(2, "late but done").due(date(2024, 6, 1)).status(Status::Completed).build(),
            task(3, "future").due(date(2024, 6, 20)).build(),
        ];
        let stats = compute_statistics(&tasks, today).unwrap();
        assert_eq!(stats.overdue, 1);
    }

    #[test]
    fn due_today_is_not_overdue() {
        let today = date(2024, 6, 10);
        let tasks = vec![task(1, "now").due(today).build()];
        assert_eq!(compute_statistics(&tasks, today).unwrap().overdue, 0);
    }

    #[test]
    fn total_reports_the_to_do_count() {
        let tasks = vec![
            task(1, "a").build(),
            task(2, "b").status(Status::InProgress).build(),
            task(3, "c").status(Status::Completed).build(),
        ];
        let stats = compute_statistics(&tasks, date(2024, 6, 10)).unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.task_count, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.points, 10);
    }

    #[test]
    fn completion_rate_rounds_to_one_decimal() {
        let tasks = vec![
            task(1, "a").status(Status::Completed).build(),
            task(2, "b").build(),
            task(3, "c").build(),
        ];
        let stats = compute_statistics(&tasks, date(2024, 6, 10)).unwrap();
        assert_eq!(stats.completion_rate, 33.3);
    }

    #[test]
    fn empty_list_yields_zeroes() {
        let stats = compute_statistics(&[], date(2024, 6, 10)).unwrap();
        assert_eq!(stats.task_count, 0);
        assert_eq!(stats.completion_rate, 0.0);
        assert_eq!(stats.top_category, None);
        assert_eq!(stats.by_category.iter().count(), Category::ALL.len());
        assert!(stats.by_category.iter().all(|(_, count)| *count == 0));
        assert_eq!(stats.weekly_trend.len(), 7);
    }

    #[test]
    fn breakdowns_cover_every_value() {
        let tasks = vec![
            task(1, "a").category(Category::Finance).priority(Priority::High).build(),
            task(2, "b").category(Category::Finance).priority(Priority::Low).build(),
            task(3, "c").category(Category::Home).priority(Priority::High).build(),
        ];
        let stats = compute_statistics(&tasks, date(2024, 6, 10)).unwrap();
        assert_eq!(stats.by_category.get(Category::Finance), 2);
        assert_eq!(stats.by_category.get(Category::Home), 1);
        assert_eq!(stats.by_category.get(Category::Work), 0);
        assert_eq!(stats.by_priority.get(Priority::High), 2);
        assert_eq!(stats.by_status.get(Status::ToDo), 3);
        assert_eq!(stats.top_category, Some(Category::Finance));
        assert_eq!(stats.top_priority, Some(Priority::High));
    }

    #[test]
    fn top_prefers_declaration_order_on_ties() {
        let tasks = vec![
            task(1, "a").category(Category::Social).build(),
            task(2, "b").category(Category::Personal).build(),
        ];
        let stats = compute_statistics(&tasks, date(2024, 6, 10)).unwrap();
        assert_eq!(stats.top_category, Some(Category::Personal));
    }

    #[test]
    fn weekly_trend_runs_oldest_to_today() {
        let today = date(2024, 6, 10); // a Monday
        let tasks = vec![
            task(1, "done today").status(Status::Completed).updated_on(today).build(),
            task(2, "done today too").status(Status::Completed).updated_on(today).build(),
            task(3, "done tuesday").status(Status::Completed).updated_on(date(2024, 6, 4)).build(),
            task(4, "touched today, open").updated_on(today).build(),
            task(5, "done too long ago").status(Status::Completed).updated_on(date(2024, 6, 3)).build(),
        ];
        let trend = compute_statistics(&tasks, today).unwrap().weekly_trend;

        let labels: Vec<&str> = trend.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Tue", "Wed", "Thu", "Fri", "Sat", "Sun", "Mon"]);
        assert_eq!(trend.first().unwrap().date, date(2024, 6, 4));
        assert_eq!(trend.first().unwrap().completed, 1);
        assert_eq!(trend.last().unwrap().completed, 2);
        assert_eq!(trend.iter().map(|p| p.completed).sum::<usize>(), 3);
    }

    #[test]
    fn rejects_malformed_tasks() {
        let tasks = vec![task(3, "").build()];
        assert!(compute_statistics(&tasks, date(2024, 6, 10)).is_err());
    }

    #[test]
    fn stats_serialize_breakdowns_as_maps() {
        let tasks = vec![task(1, "a").category(Category::HealthFitness).build()];
        let stats = compute_statistics(&tasks, date(2024, 6, 10)).unwrap();
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["byCategory"]["Health & Fitness"], 1);
        assert_eq!(json["byStatus"]["To Do"], 1);
        assert_eq!(json["completionRate"], 0.0);
    }

    #[test]
    fn month_counts_only_include_that_month() {
        let tasks = vec![
            task(1, "a").due(date(2024, 2, 29)).build(),
            task(2, "b").due(date(2024, 2, 29)).build(),
            task(3, "c").due(date(2024, 3, 1)).build(),
            task(4, "d").build(),
        ];
        let counts = due_counts_for_month(&tasks, 2024, 2).unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[&date(2024, 2, 29)], 2);
    }

    #[test]
    fn month_bounds_handle_december_and_bad_input() {
        assert_eq!(
            month_bounds(2024, 12).unwrap(),
            (date(2024, 12, 1), date(2024, 12, 31))
        );
        assert_eq!(month_bounds(2023, 2).unwrap().1, date(2023, 2, 28));
        assert!(matches!(
            due_counts_for_month(&[], 2024, 13),
            Err(QueryError::InvalidMonth { month: 13, .. })
        ));
    }

    #[test]
    fn calendar_weeks_start_on_sunday() {
        // June 2024 starts on a Saturday and ends on a Sunday.
        let weeks = calendar_weeks(2024, 6).unwrap();
        assert_eq!(weeks.len(), 6);
        assert_eq!(weeks[0][6], Some(date(2024, 6, 1)));
        assert!(weeks[0][..6].iter().all(Option::is_none));
        assert_eq!(weeks[5][0], Some(date(2024, 6, 30)));
        assert!(weeks[5][1..].iter().all(Option::is_none));
        let days = weeks.iter().flatten().flatten().count();
        assert_eq!(days, 30);
    }

    proptest! {
        #[test]
        fn prop_totals_reconcile(statuses in prop::collection::vec(0usize..3, 0..40)) {
            let tasks: Vec<Task> = statuses
                .iter()
                .enumerate()
                .map(|(i, s)| task(i as i64 + 1, "t").status(Status::ALL[*s]).build())
                .collect();
            let stats = compute_statistics(&tasks, date(2024, 6, 10)).unwrap();
            prop_assert_eq!(stats.completed + stats.pending, tasks.len());
            prop_assert!(stats.completion_rate >= 0.0 && stats.completion_rate <= 100.0);
            if tasks.is_empty() {
                prop_assert_eq!(stats.completion_rate, 0.0);
            }
        }
    }
}
