//! Ordered task collections and the partitions derived from them.
//!
//! Every operation here is a pure function of its input sequence. Sorts are
//! stable, so ties keep their incoming order, and tasks without a first date
//! always sort after dated ones.

use chrono::{
    Datelike,
    Days,
    NaiveDate
};
use tracing::debug;

use crate::calendar::cmp_absent_last;
use crate::error::EngineError;
use crate::task::{
    Task,
    TaskRecord,
    TaskStatus
};

/// A task sequence kept sorted by first date.
#[derive(Debug, Clone, Default)]
pub struct Tasks {
    tasks: Vec<Task>
}

/// The four stable partitions produced by [`Tasks::subdivide`].
#[derive(Debug, Clone, Default)]
pub struct Subdivision {
    pub tasks:    Vec<Task>,
    pub wip:      Vec<Task>,
    pub non_wip:  Vec<Task>,
    pub has_date: Vec<Task>,
    pub no_date:  Vec<Task>
}

impl Tasks {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Self::tasks_by_first_date(tasks)
        }
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = TaskRecord>
    {
        Self::new(
            records.into_iter().map(Task::new).collect()
        )
    }

    pub fn push(&mut self, task: Task) {
        self.extend(std::iter::once(task));
    }

    pub fn extend<I>(&mut self, tasks: I)
    where
        I: IntoIterator<Item = Task>
    {
        let mut all = std::mem::take(&mut self.tasks);
        all.extend(tasks);
        self.tasks = Self::tasks_by_first_date(all);
    }

    pub fn iter(
        &self
    ) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    pub fn into_vec(self) -> Vec<Task> {
        self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks_by_first_date(
        mut tasks: Vec<Task>
    ) -> Vec<Task> {
        tasks.sort_by(|a, b| {
            cmp_absent_last(
                a.first_date(),
                b.first_date()
            )
        });
        tasks
    }

    pub fn tasks_by_status(
        mut tasks: Vec<Task>
    ) -> Vec<Task> {
        tasks.sort_by_key(|t| t.status().rank());
        tasks
    }

    pub fn tasks_by_project(
        mut tasks: Vec<Task>
    ) -> Vec<Task> {
        tasks.sort_by(|a, b| a.project().cmp(b.project()));
        tasks
    }

    /// One copy of each task per context, each carrying just that context,
    /// sorted by it. Tasks without contexts pass through and sort last.
    pub fn tasks_by_context(
        tasks: Vec<Task>
    ) -> Vec<Task> {
        let mut expanded: Vec<Task> = tasks
            .into_iter()
            .flat_map(|task| {
                if task.contexts().is_empty() {
                    return vec![task];
                }
                task.contexts()
                    .iter()
                    .map(|c| task.with_single_context(c))
                    .collect()
            })
            .collect();
        expanded.sort_by(|a, b| {
            match (a.contexts().first(), b.contexts().first()) {
                | (Some(x), Some(y)) => x.cmp(y),
                | (Some(_), None) => std::cmp::Ordering::Less,
                | (None, Some(_)) => {
                    std::cmp::Ordering::Greater
                }
                | (None, None) => std::cmp::Ordering::Equal
            }
        });
        expanded
    }

    pub fn status_split(
        statuses: &[TaskStatus],
        tasks: Vec<Task>
    ) -> (Vec<Task>, Vec<Task>) {
        tasks
            .into_iter()
            .partition(|t| statuses.contains(&t.status()))
    }

    pub fn date_split(
        tasks: Vec<Task>
    ) -> (Vec<Task>, Vec<Task>) {
        tasks
            .into_iter()
            .partition(|t| t.first().is_some())
    }

    #[tracing::instrument(skip(tasks), fields(count = tasks.len()))]
    pub fn subdivide(tasks: Vec<Task>) -> Subdivision {
        let (wip, non_wip) = Self::status_split(
            &[TaskStatus::Wip, TaskStatus::Review],
            tasks.clone()
        );
        let (has_date, no_date) =
            Self::date_split(non_wip.clone());
        debug!(
            wip = wip.len(),
            has_date = has_date.len(),
            no_date = no_date.len(),
            "subdivided tasks"
        );
        Subdivision {
            tasks,
            wip,
            non_wip,
            has_date,
            no_date
        }
    }

    #[tracing::instrument(skip(tasks), fields(count = tasks.len()))]
    pub fn visibility_filter(
        tasks: Vec<Task>,
        as_of: Option<NaiveDate>
    ) -> Result<Vec<Task>, EngineError> {
        let mut kept = Vec::with_capacity(tasks.len());
        for task in tasks {
            if task.dates().is_visible(as_of)? {
                kept.push(task);
            }
        }
        debug!(kept = kept.len(), "applied visibility filter");
        Ok(kept)
    }

    /// Replaces every start-and-due task with its two linked anchors.
    pub fn split_spans(
        tasks: Vec<Task>
    ) -> Result<Vec<Task>, EngineError> {
        let mut out = Vec::with_capacity(tasks.len());
        for task in tasks {
            out.extend(task.split_with_due()?);
        }
        Ok(out)
    }

    /// Adds one week marker per Sunday inside the span of first dates.
    #[tracing::instrument(skip(tasks), fields(count = tasks.len()))]
    pub fn add_meta_tasks(
        tasks: Vec<Task>
    ) -> Vec<Task> {
        let mut days =
            tasks.iter().filter_map(Task::first_date);
        let Some(seed) = days.next() else {
            debug!("no dated tasks, no week markers");
            return Self::tasks_by_first_date(tasks);
        };
        let (min, max) = days.fold((seed, seed), |(lo, hi), d| {
            (lo.min(d), hi.max(d))
        });

        let markers = sundays_between(min, max);
        debug!(
            markers = markers.len(),
            from = %min,
            to = %max,
            "injecting week markers"
        );
        let mut all = tasks;
        all.extend(markers.into_iter().map(Task::week_marker));
        Self::tasks_by_first_date(all)
    }

    pub fn add_today_marker(
        tasks: Vec<Task>,
        as_of: NaiveDate
    ) -> Vec<Task> {
        let mut all = tasks;
        all.push(Task::today_marker(as_of));
        Self::tasks_by_first_date(all)
    }
}

/// Every Sunday in the inclusive range.
fn sundays_between(
    from: NaiveDate,
    to: NaiveDate
) -> Vec<NaiveDate> {
    let ahead = (7
        - from.weekday().num_days_from_sunday())
        % 7;
    let mut out = Vec::new();
    let mut day =
        from.checked_add_days(Days::new(u64::from(ahead)));
    while let Some(sunday) = day {
        if sunday > to {
            break;
        }
        out.push(sunday);
        day = sunday.checked_add_days(Days::new(7));
    }
    out
}

impl IntoIterator for Tasks {
    type IntoIter = std::vec::IntoIter<Task>;
    type Item = Task;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.into_iter()
    }
}

impl FromIterator<Task> for Tasks {
    fn from_iter<I: IntoIterator<Item = Task>>(
        iter: I
    ) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
