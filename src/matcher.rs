use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::models::Task;

/// Outcome of looking up a task by what the user typed.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Exact(Task),
    /// No exact hit; best fuzzy candidate, to be confirmed by the user.
    Suggested { task: Task, score: i64 },
    /// Several tasks share the exact title; an id is needed.
    Ambiguous(Vec<Task>),
    NotFound,
}

fn parse_id(reference: &str) -> Option<i64> {
    reference.trim().trim_start_matches('#').parse().ok()
}

/// Resolves `reference` as a task id (`12` or `#12`), then an exact
/// case-insensitive title, then the best fuzzy title match. A numeric
/// reference is only ever an id.
pub fn resolve(tasks: &[Task], reference: &str) -> Resolution {
    if let Some(id) = parse_id(reference) {
        return match tasks.iter().find(|task| task.id.0 == id) {
            Some(task) => Resolution::Exact(task.clone()),
            None => Resolution::NotFound,
        };
    }

    let wanted = reference.trim().to_lowercase();
    let mut exact: Vec<Task> = tasks
        .iter()
        .filter(|task| task.title.to_lowercase() == wanted)
        .cloned()
        .collect();
    if exact.len() == 1 {
        return Resolution::Exact(exact.remove(0));
    }
    if exact.len() > 1 {
        return Resolution::Ambiguous(exact);
    }

    let matcher = SkimMatcherV2::default();
    let mut best: Option<(i64, &Task)> = None;
    for task in tasks {
        if let Some(score) = matcher.fuzzy_match(&task.title, reference.trim()) {
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, task));
            }
        }
    }

    match best {
        Some((score, task)) => Resolution::Suggested {
            task: task.clone(),
            score,
        },
        None => Resolution::NotFound,
    }
}
