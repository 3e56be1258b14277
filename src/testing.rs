//! Task fixtures shared by the unit tests.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};

use crate::models::{Category, Priority, Status, Task, TaskId, UserId};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}

/// Local noon on `day`, as UTC. Noon keeps the local calendar date stable
/// whatever the test machine's offset is.
pub fn local_noon(day: NaiveDate) -> DateTime<Utc> {
    let naive = day.and_hms_opt(12, 0, 0).expect("valid fixture time");
    Local
        .from_local_datetime(&naive)
        .earliest()
        .expect("local noon exists")
        .with_timezone(&Utc)
}

pub struct TaskBuilder {
    task: Task,
}

pub fn task(id: i64, title: &str) -> TaskBuilder {
    let created = Utc
        .with_ymd_and_hms(2024, 6, 10, 12, 0, 0)
        .single()
        .expect("valid fixture timestamp");
    TaskBuilder {
        task: Task {
            id: TaskId(id),
            owner: UserId(1),
            title: title.to_string(),
            description: String::new(),
            priority: Priority::default(),
            category: Category::default(),
            status: Status::default(),
            due_date: None,
            archived: false,
            created_at: created,
            updated_at: created,
        },
    }
}

impl TaskBuilder {
    pub fn description(mut self, description: &str) -> Self {
        self.task.description = description.to_string();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.task.category = category;
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.task.status = status;
        self
    }

    pub fn due(mut self, day: NaiveDate) -> Self {
        self.task.due_date = Some(day);
        self
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.task.archived = archived;
        self
    }

    pub fn created_days_ago(mut self, days: u64) -> Self {
        let days = i64::try_from(days).expect("small fixture offset");
        self.task.created_at -= Duration::days(days);
        self.task.updated_at = self.task.created_at;
        self
    }

    pub fn updated_on(mut self, day: NaiveDate) -> Self {
        self.task.updated_at = local_noon(day);
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}
