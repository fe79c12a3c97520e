//! One full derivation pass from raw records to calendar blocks.

use chrono::NaiveDate;
use tracing::debug;

use crate::error::EngineError;
use crate::filter::FilterState;
use crate::task::TaskRecord;
use crate::tasks::{
    Subdivision,
    Tasks
};
use crate::view::WeekBlock;

#[derive(Debug, Clone, Copy)]
pub struct DeriveOptions {
    pub week_markers: bool,
    pub today_marker: bool
}

impl Default for DeriveOptions {
    fn default() -> Self {
        Self {
            week_markers: true,
            today_marker: false
        }
    }
}

#[derive(Debug, Clone)]
pub struct CalendarView {
    pub as_of:       NaiveDate,
    pub subdivision: Subdivision,
    pub weeks:       Vec<WeekBlock>
}

/// Runs construct, split, filter, visibility, subdivide, markers and week
/// grouping with a single `as_of` day.
#[tracing::instrument(skip(records, filter), fields(records = records.len()))]
pub fn derive(
    records: Vec<TaskRecord>,
    filter: &FilterState,
    as_of: NaiveDate,
    options: DeriveOptions
) -> Result<CalendarView, EngineError> {
    let tasks = Tasks::from_records(records);
    let tasks = Tasks::split_spans(tasks.into_vec())?;
    let tasks = filter.apply(Tasks::tasks_by_first_date(tasks));
    let tasks = Tasks::visibility_filter(tasks, Some(as_of))?;
    let subdivision = Tasks::subdivide(tasks);

    let mut calendar = subdivision.has_date.clone();
    if options.week_markers {
        calendar = Tasks::add_meta_tasks(calendar);
    }
    if options.today_marker {
        calendar = Tasks::add_today_marker(calendar, as_of);
    }
    let weeks = WeekBlock::from_tasks(calendar);

    debug!(
        as_of = %as_of,
        weeks = weeks.len(),
        wip = subdivision.wip.len(),
        "derived calendar view"
    );
    Ok(CalendarView {
        as_of,
        subdivision,
        weeks
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        DeriveOptions,
        derive
    };
    use crate::dates::DateFields;
    use crate::filter::{
        FilterAction,
        FilterState
    };
    use crate::task::{
        TaskRecord,
        TaskStatus
    };

    fn record(
        description: &str,
        status: TaskStatus,
        dates: Option<DateFields>
    ) -> TaskRecord {
        TaskRecord {
            description: description.to_string(),
            project: "work.md".to_string(),
            status,
            contexts: vec!["#xdesk".to_string()],
            dates
        }
    }

    fn due(day: &str) -> Option<DateFields> {
        Some(DateFields {
            due: Some(day.to_string()),
            ..DateFields::default()
        })
    }

    #[test]
    fn pass_splits_filters_and_groups() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 10).expect("date");
        let records = vec![
            record(
                "trip",
                TaskStatus::Todo,
                Some(DateFields {
                    start: Some("20240304".to_string()),
                    due: Some("20240312".to_string()),
                    visible: None
                })
            ),
            record("hidden", TaskStatus::Todo, Some(DateFields {
                visible: Some("20240315".to_string()),
                due: Some("20240320".to_string()),
                ..DateFields::default()
            })),
            record("coding", TaskStatus::Wip, due("20240305")),
            record("someday", TaskStatus::NoStatus, None),
        ];

        let view = derive(
            records,
            &FilterState::default(),
            as_of,
            DeriveOptions::default()
        )
        .expect("derive");

        let names = |ts: &[crate::task::Task]| -> Vec<String> {
            ts.iter().map(|t| t.description().to_string()).collect()
        };
        assert_eq!(names(&view.subdivision.wip), vec!["coding"]);
        assert_eq!(
            names(&view.subdivision.has_date),
            vec!["trip (start)", "trip (end)"]
        );
        assert_eq!(names(&view.subdivision.no_date), vec!["someday"]);

        // 03-04 start, 03-10 marker, 03-12 end
        assert_eq!(view.weeks.len(), 2);
        assert_eq!(view.weeks[0].key(), "2024-03-042024-03-10");
        let first_week: Vec<bool> =
            view.weeks[0].tasks().map(|t| t.is_marker()).collect();
        assert_eq!(first_week, vec![false, true]);
    }

    #[test]
    fn filter_state_narrows_the_pass() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 10).expect("date");
        let filter = FilterState::default()
            .reduce(FilterAction::SetContext("home".to_string()));
        let view = derive(
            vec![record("a", TaskStatus::Todo, due("20240311"))],
            &filter,
            as_of,
            DeriveOptions::default()
        )
        .expect("derive");
        assert!(view.subdivision.tasks.is_empty());
        assert!(view.weeks.is_empty());
    }

    #[test]
    fn today_marker_is_optional() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 13).expect("date");
        let view = derive(
            vec![record("a", TaskStatus::Todo, due("20240311"))],
            &FilterState::default(),
            as_of,
            DeriveOptions {
                week_markers: false,
                today_marker: true
            }
        )
        .expect("derive");
        let statuses: Vec<TaskStatus> =
            view.weeks[0].tasks().map(|t| t.status()).collect();
        assert_eq!(statuses, vec![TaskStatus::Todo, TaskStatus::Today]);
    }
}
