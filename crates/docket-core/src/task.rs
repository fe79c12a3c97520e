use std::sync::atomic::{
    AtomicU64,
    Ordering
};

use chrono::NaiveDate;
use serde::{
    Deserialize,
    Serialize
};

use crate::calendar::{
    DateRole,
    TaskDate,
    format_compact
};
use crate::dates::{
    DateFields,
    TaskDates
};
use crate::error::EngineError;

const START_SUFFIX: &str = " (start)";
const END_SUFFIX: &str = " (end)";
const DESCRIPTION_MARKERS: [&str; 2] = ["- ", "* "];
const PROJECT_SUFFIX: &str = ".md";
const CONTEXT_PREFIX: &str = "#x";
pub const NO_CONTEXT: &str = "(none)";

static NEXT_PAIR: AtomicU64 = AtomicU64::new(1);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
)]
pub enum TaskStatus {
    Todo,
    Wip,
    NoStatus,
    Review,
    Sunday,
    Today
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Todo,
        TaskStatus::Wip,
        TaskStatus::NoStatus,
        TaskStatus::Review,
        TaskStatus::Sunday,
        TaskStatus::Today
    ];

    /// Statuses that come from real data, as opposed to synthetic markers.
    pub const DATA: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::Wip,
        TaskStatus::NoStatus,
        TaskStatus::Review
    ];

    /// Sort rank, lower first.
    pub fn rank(self) -> u8 {
        match self {
            | TaskStatus::Wip => 1,
            | TaskStatus::Review => 2,
            | TaskStatus::Todo => 3,
            | TaskStatus::NoStatus => 4,
            | TaskStatus::Sunday => 5,
            | TaskStatus::Today => 6
        }
    }

    pub fn is_active(self) -> bool {
        matches!(
            self,
            TaskStatus::Wip | TaskStatus::Review
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            | TaskStatus::Todo => "Todo",
            | TaskStatus::Wip => "Wip",
            | TaskStatus::NoStatus => "NoStatus",
            | TaskStatus::Review => "Review",
            | TaskStatus::Sunday => "Sunday",
            | TaskStatus::Today => "Today"
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| {
            status
                .as_str()
                .eq_ignore_ascii_case(raw.trim())
        })
    }
}

/// One task as delivered by the data source.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
)]
pub struct TaskRecord {
    pub description: String,
    pub project:     String,
    pub status:      TaskStatus,
    #[serde(default)]
    pub contexts:    Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates:       Option<DateFields>
}

/// The temporal shape of a task, driven by which roles are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskShape {
    NoDates,
    Due,
    DueWithStart,
    Start,
    StartWithDue,
    VisibleOnly
}

impl TaskShape {
    pub fn as_str(self) -> &'static str {
        match self {
            | TaskShape::NoDates => "NO_DATES",
            | TaskShape::Due => "DUE",
            | TaskShape::DueWithStart => {
                "DUE_WITH_START"
            }
            | TaskShape::Start => "START",
            | TaskShape::StartWithDue => {
                "START_WITH_DUE"
            }
            | TaskShape::VisibleOnly => {
                "VISIBLE_ONLY"
            }
        }
    }
}

/// Which half of a span-split pair a task is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanHalf {
    Start,
    Due
}

/// Identity shared by the two halves of one split, unique per split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanPair(u64);

impl SpanPair {
    fn next() -> Self {
        Self(NEXT_PAIR.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which half of which split pair a task is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanLink {
    pub half: SpanHalf,
    pub pair: SpanPair
}

#[derive(Debug, Clone)]
pub struct Task {
    record:    TaskRecord,
    dates:     TaskDates,
    link:      Option<SpanLink>,
    synthetic: bool
}

impl Task {
    pub fn new(record: TaskRecord) -> Self {
        let dates = TaskDates::from_fields(
            record.dates.as_ref()
        );
        Self {
            record,
            dates,
            link: None,
            synthetic: false
        }
    }

    fn marker(
        status: TaskStatus,
        day: NaiveDate
    ) -> Self {
        let compact = format_compact(day);
        let mut task = Self::new(TaskRecord {
            description: String::new(),
            project:     String::new(),
            status,
            contexts:    vec![],
            dates:       Some(DateFields {
                start:   Some(compact.clone()),
                due:     Some(compact),
                visible: None
            })
        });
        task.synthetic = true;
        task
    }

    /// Synthetic entry closing a calendar week.
    pub fn week_marker(sunday: NaiveDate) -> Self {
        Self::marker(TaskStatus::Sunday, sunday)
    }

    /// Synthetic entry flagging the as-of day.
    pub fn today_marker(day: NaiveDate) -> Self {
        Self::marker(TaskStatus::Today, day)
    }

    pub fn record(&self) -> &TaskRecord {
        &self.record
    }

    pub fn dates(&self) -> &TaskDates {
        &self.dates
    }

    pub fn status(&self) -> TaskStatus {
        self.record.status
    }

    pub fn description(&self) -> &str {
        &self.record.description
    }

    pub fn project(&self) -> &str {
        &self.record.project
    }

    pub fn contexts(&self) -> &[String] {
        &self.record.contexts
    }

    pub fn link(&self) -> Option<&SpanLink> {
        self.link.as_ref()
    }

    /// True only for entries made by marker injection. A data record whose
    /// status happens to be Sunday or Today is not a marker.
    pub fn is_marker(&self) -> bool {
        self.synthetic
    }

    pub fn first(&self) -> Option<&TaskDate> {
        self.dates.first()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.first().and_then(TaskDate::date)
    }

    pub fn classify(
        &self
    ) -> Result<TaskShape, EngineError> {
        if self.dates.has(DateRole::Due)? {
            // the due half and any due task with a start link share a label
            return Ok(
                match self.link.as_ref().map(|l| l.half) {
                    | Some(SpanHalf::Due) => {
                        TaskShape::DueWithStart
                    }
                    | Some(SpanHalf::Start) => {
                        TaskShape::StartWithDue
                    }
                    | None => TaskShape::Due
                }
            );
        }
        if self.dates.has(DateRole::Start)? {
            return Ok(TaskShape::Start);
        }
        if self.dates.has(DateRole::Visible)? {
            return Ok(TaskShape::VisibleOnly);
        }
        Ok(TaskShape::NoDates)
    }

    /// Splits a task spanning a start and a due date into a start anchor and
    /// a due anchor linked to each other. Anything else comes back alone.
    pub fn split_with_due(
        self
    ) -> Result<Vec<Task>, EngineError> {
        if self.link.is_some()
            || self.dates.duration_days()?.is_none()
        {
            return Ok(vec![self]);
        }

        let mut start_half = self;
        let mut due_half = start_half.clone();
        start_half
            .record
            .description
            .push_str(START_SUFFIX);
        due_half
            .record
            .description
            .push_str(END_SUFFIX);
        due_half.dates.remove_date(DateRole::Start);

        let pair = SpanPair::next();
        start_half.link = Some(SpanLink {
            half: SpanHalf::Start,
            pair
        });
        due_half.link = Some(SpanLink {
            half: SpanHalf::Due,
            pair
        });

        Ok(vec![start_half, due_half])
    }

    fn sibling_in<'a>(
        &self,
        half: SpanHalf,
        tasks: &'a [Task]
    ) -> Option<&'a Task> {
        let link = self.link?;
        if link.half == half {
            return None;
        }
        let wanted = SpanLink {
            half,
            pair: link.pair
        };
        let mut candidates =
            tasks.iter().filter(|t| t.link == Some(wanted));
        let first = candidates.next()?;
        // context-expanded copies share a pair; prefer the one whose
        // contexts match this half
        if first.contexts() == self.contexts() {
            return Some(first);
        }
        Some(
            candidates
                .find(|t| t.contexts() == self.contexts())
                .unwrap_or(first)
        )
    }

    /// The due half of this task's split pair, looked up in `tasks`.
    pub fn due_ref<'a>(
        &self,
        tasks: &'a [Task]
    ) -> Option<&'a Task> {
        self.sibling_in(SpanHalf::Due, tasks)
    }

    /// The start half of this task's split pair, looked up in `tasks`.
    pub fn start_ref<'a>(
        &self,
        tasks: &'a [Task]
    ) -> Option<&'a Task> {
        self.sibling_in(SpanHalf::Start, tasks)
    }

    pub(crate) fn with_single_context(
        &self,
        context: &str
    ) -> Task {
        let mut copy = self.clone();
        copy.record.contexts = vec![context.to_string()];
        copy
    }

    pub fn clean_description(&self) -> String {
        let mut text =
            self.record.description.as_str();
        for marker in DESCRIPTION_MARKERS {
            text = text
                .strip_prefix(marker)
                .unwrap_or(text);
        }
        text.to_string()
    }

    pub fn clean_project(&self) -> String {
        self.record
            .project
            .strip_suffix(PROJECT_SUFFIX)
            .unwrap_or(&self.record.project)
            .to_string()
    }

    pub fn clean_contexts(&self) -> Vec<String> {
        self.record
            .contexts
            .iter()
            .map(|c| {
                c.strip_prefix(CONTEXT_PREFIX)
                    .unwrap_or(c)
                    .to_string()
            })
            .collect()
    }

    pub fn contexts_with_none(&self) -> Vec<String> {
        if self.record.contexts.is_empty() {
            return vec![NO_CONTEXT.to_string()];
        }
        self.record.contexts.clone()
    }

    /// Identity used by the rendering layer to reconcile rows.
    ///
    /// Tasks identical in text and dates share a key.
    pub fn key(&self) -> String {
        let raw = |role| {
            self.record
                .dates
                .as_ref()
                .and_then(|d: &DateFields| d.raw(role))
                .unwrap_or_default()
        };
        format!(
            "{}{}{}{}{}",
            self.record.description,
            self.record.contexts.join(","),
            raw(DateRole::Due),
            raw(DateRole::Start),
            raw(DateRole::Visible)
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        SpanHalf,
        Task,
        TaskRecord,
        TaskShape,
        TaskStatus
    };
    use crate::calendar::DateRole;
    use crate::dates::DateFields;

    fn record(
        description: &str,
        start: Option<&str>,
        due: Option<&str>,
        visible: Option<&str>
    ) -> TaskRecord {
        TaskRecord {
            description: description.to_string(),
            project:     "home.md".to_string(),
            status:      TaskStatus::Todo,
            contexts:    vec![
                "#xphone".to_string(),
                "errand".to_string(),
            ],
            dates:       Some(DateFields {
                start:   start.map(str::to_string),
                due:     due.map(str::to_string),
                visible: visible.map(str::to_string)
            })
        }
    }

    #[test]
    fn classify_follows_role_precedence() {
        let cases = [
            (record("a", None, None, None), TaskShape::NoDates),
            (record("b", None, Some("20240105"), None), TaskShape::Due),
            (
                record("c", Some("20240101"), Some("20240105"), None),
                TaskShape::Due
            ),
            (record("d", Some("20240101"), None, None), TaskShape::Start),
            (
                record("e", Some("20240101"), None, Some("20231231")),
                TaskShape::Start
            ),
            (
                record("f", None, None, Some("20231231")),
                TaskShape::VisibleOnly
            ),
        ];
        for (rec, expected) in cases {
            let task = Task::new(rec);
            assert_eq!(
                task.classify().expect("classify"),
                expected,
                "{}",
                task.description()
            );
        }
    }

    #[test]
    fn split_produces_linked_anchors() {
        let task = Task::new(record(
            "- paint fence",
            Some("20240101"),
            Some("20240104"),
            None
        ));
        let halves = task.split_with_due().expect("split");
        assert_eq!(halves.len(), 2);

        let start = &halves[0];
        let due = &halves[1];
        assert_eq!(start.description(), "- paint fence (start)");
        assert_eq!(due.description(), "- paint fence (end)");
        assert_ne!(start.key(), due.key());
        assert!(!due.dates().has(DateRole::Start).expect("has"));
        assert!(start.dates().has(DateRole::Start).expect("has"));

        assert_eq!(
            start.classify().expect("classify"),
            TaskShape::StartWithDue
        );
        assert_eq!(
            due.classify().expect("classify"),
            TaskShape::DueWithStart
        );
        assert_eq!(
            due.link().map(|l| l.half),
            Some(SpanHalf::Due)
        );

        let back = start
            .due_ref(&halves)
            .and_then(|d| d.start_ref(&halves))
            .expect("round trip");
        assert_eq!(back.key(), start.key());
        assert_eq!(
            due.first_date(),
            NaiveDate::from_ymd_opt(2024, 1, 4)
        );
    }

    #[test]
    fn split_leaves_single_date_tasks_alone() {
        let task = Task::new(record(
            "call",
            None,
            Some("20240104"),
            None
        ));
        let out = task.split_with_due().expect("split");
        assert_eq!(out.len(), 1);
        assert!(out[0].link().is_none());
        assert_eq!(out[0].description(), "call");
    }

    #[test]
    fn split_happens_once() {
        let task = Task::new(record(
            "trip",
            Some("20240101"),
            Some("20240104"),
            None
        ));
        let halves = task.split_with_due().expect("split");
        let again = halves[0]
            .clone()
            .split_with_due()
            .expect("split");
        assert_eq!(again.len(), 1);
    }

    #[test]
    fn display_strings_are_cleaned() {
        let task = Task::new(record(
            "- * buy milk",
            None,
            None,
            None
        ));
        assert_eq!(task.clean_description(), "buy milk");
        assert_eq!(task.clean_project(), "home");
        assert_eq!(
            task.clean_contexts(),
            vec!["phone".to_string(), "errand".to_string()]
        );
    }

    #[test]
    fn contexts_with_none_fills_empty() {
        let mut rec = record("x", None, None, None);
        rec.contexts.clear();
        let task = Task::new(rec);
        assert_eq!(task.contexts_with_none(), vec!["(none)".to_string()]);
    }

    #[test]
    fn key_joins_text_and_raw_dates() {
        let task = Task::new(record(
            "x",
            Some("20240101"),
            Some("20240102"),
            Some("20231201")
        ));
        assert_eq!(
            task.key(),
            "x#xphone,errand202401022024010120231201"
        );
    }

    #[test]
    fn markers_are_synthetic() {
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7)
            .expect("date");
        let marker = Task::week_marker(sunday);
        assert!(marker.is_marker());
        assert_eq!(marker.status(), TaskStatus::Sunday);
        assert_eq!(marker.first_date(), Some(sunday));
        assert_eq!(marker.description(), "");
        assert_eq!(
            Task::today_marker(sunday).status(),
            TaskStatus::Today
        );
    }

    #[test]
    fn colliding_keys_keep_their_own_sibling() {
        let mut a = record(
            "standup",
            Some("20240101"),
            Some("20240104"),
            None
        );
        a.project = "a.md".to_string();
        let mut b = a.clone();
        b.project = "b.md".to_string();
        b.status = TaskStatus::Wip;

        let mut all = Task::new(a).split_with_due().expect("split");
        all.extend(Task::new(b).split_with_due().expect("split"));
        assert_eq!(all[0].key(), all[2].key());
        assert_ne!(all[0].link(), all[2].link());

        let b_start = &all[2];
        let b_due = b_start.due_ref(&all).expect("due half");
        assert_eq!(b_due.project(), "b.md");
        assert_eq!(b_due.status(), TaskStatus::Wip);
        let back = b_due.start_ref(&all).expect("start half");
        assert_eq!(back.project(), "b.md");
        assert_eq!(back.link(), b_start.link());
    }

    #[test]
    fn sunday_status_on_data_is_not_a_marker() {
        let mut rec = record("weekly review", None, Some("20240107"), None);
        rec.status = TaskStatus::Sunday;
        let task = Task::new(rec);
        assert!(!task.is_marker());
        assert_eq!(task.classify().expect("classify"), TaskShape::Due);
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(TaskStatus::parse("wip"), Some(TaskStatus::Wip));
        assert_eq!(TaskStatus::parse(" Review "), Some(TaskStatus::Review));
        assert_eq!(TaskStatus::parse("done"), None);
    }
}
