//! Calendar and list groupings handed to the rendering layer.
//!
//! None of the groupers sort. They bucket an already ordered sequence and
//! keep buckets in order of first appearance, so chronological output
//! depends on chronologically sorted input.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{
    Datelike,
    NaiveDate
};
use tracing::debug;

use crate::calendar::{
    TaskDate,
    WeekBookends
};
use crate::task::Task;

/// Buckets `items` by `key`, buckets ordered by first appearance.
fn group_in_order<K, T, F>(
    items: impl IntoIterator<Item = T>,
    mut key: F
) -> Vec<(K, Vec<T>)>
where
    K: Eq + Hash + Clone,
    F: FnMut(&T) -> K
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    for item in items {
        let k = key(&item);
        match index.get(&k) {
            | Some(&at) => groups[at].1.push(item),
            | None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }
    groups
}

/// Tasks sharing one first-date calendar day.
#[derive(Debug, Clone)]
pub struct DayBlock {
    tasks: Vec<Task>
}

impl DayBlock {
    pub fn from_tasks(tasks: Vec<Task>) -> Vec<DayBlock> {
        group_in_order(tasks, Task::first_date)
            .into_iter()
            .map(|(_, tasks)| DayBlock {
                tasks
            })
            .collect()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn date(&self) -> Option<&TaskDate> {
        self.tasks.first()?.first()
    }

    /// Two-letter weekday, unpadded day, short month: `Mo 1 Jan`.
    pub fn fmt_day(&self) -> Option<String> {
        let day = self.date()?.date()?;
        let weekday = day.weekday().to_string();
        Some(format!(
            "{} {}",
            &weekday[..2],
            day.format("%-d %b")
        ))
    }

    pub fn key(&self) -> String {
        self.date()
            .and_then(TaskDate::to_iso)
            .unwrap_or_else(|| "nodate".to_string())
    }
}

/// Day blocks belonging to one Monday-to-Sunday week.
#[derive(Debug, Clone)]
pub struct WeekBlock {
    days: Vec<DayBlock>
}

impl WeekBlock {
    #[tracing::instrument(skip(tasks), fields(count = tasks.len()))]
    pub fn from_tasks(tasks: Vec<Task>) -> Vec<WeekBlock> {
        let weeks: Vec<WeekBlock> = group_in_order(tasks, |t| {
            t.first_date()
                .and_then(WeekBookends::containing)
                .map(|b| b.monday)
        })
        .into_iter()
        .map(|(_, tasks)| WeekBlock {
            days: DayBlock::from_tasks(tasks)
        })
        .collect();
        debug!(weeks = weeks.len(), "derived week blocks");
        weeks
    }

    pub fn days(&self) -> &[DayBlock] {
        &self.days
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.days.iter().flat_map(|d| d.tasks.iter())
    }

    pub fn monday(&self) -> Option<NaiveDate> {
        self.week_bookends().map(|b| b.monday)
    }

    pub fn week_bookends(&self) -> Option<WeekBookends> {
        self.days.first()?.date()?.week_bookends()
    }

    pub fn fmt_week_bookends(&self) -> Option<String> {
        let bookends = self.week_bookends()?;
        Some(format!(
            "{} - {}",
            bookends.monday.format("%m/%d"),
            bookends.sunday.format("%m/%d")
        ))
    }

    pub fn key(&self) -> String {
        match self.week_bookends() {
            | Some(b) => format!(
                "{}{}",
                b.monday.format("%Y-%m-%d"),
                b.sunday.format("%Y-%m-%d")
            ),
            | None => "nobookends".to_string()
        }
    }
}

/// Tasks grouped by raw project id, in first appearance order.
pub fn group_by_project(
    tasks: Vec<Task>
) -> Vec<(String, Vec<Task>)> {
    group_in_order(tasks, |t| t.project().to_string())
}

/// Tasks grouped under each of their contexts. A task with several
/// contexts appears in several groups; one with none lands in `(none)`.
pub fn group_by_context(
    tasks: &[Task]
) -> Vec<(String, Vec<Task>)> {
    let pairs = tasks.iter().flat_map(|task| {
        task.contexts_with_none()
            .into_iter()
            .map(move |c| (c, task.clone()))
    });
    group_in_order(pairs, |(c, _)| c.clone())
        .into_iter()
        .map(|(c, members)| {
            (c, members.into_iter().map(|(_, t)| t).collect())
        })
        .collect()
}
