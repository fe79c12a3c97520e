use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::calendar::TaskDate;
use crate::config::Config;
use crate::pipeline::CalendarView;
use crate::task::{NO_CONTEXT, Task, TaskStatus};
use crate::tasks::Tasks;
use crate::view::{group_by_context, group_by_project};

const RED: &str = "31";
const YELLOW: &str = "33";
const BOLD: &str = "1";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_flag("color")?.unwrap_or(true);

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    /// One table per week, each day labelled on its first row.
    #[tracing::instrument(skip_all, fields(weeks = view.weeks.len()))]
    pub fn write_weeks<W: Write>(&self, out: &mut W, view: &CalendarView) -> anyhow::Result<()> {
        if view.weeks.is_empty() {
            writeln!(out, "No dated tasks.")?;
            return Ok(());
        }

        for week in &view.weeks {
            let title = format!("Week {}", week.fmt_week_bookends().unwrap_or_default());
            writeln!(out, "{}", self.paint(&title, BOLD))?;

            let mut rows = Vec::new();
            for day in week.days() {
                for (idx, task) in day.tasks().iter().enumerate() {
                    let label = if idx == 0 {
                        day.fmt_day().unwrap_or_default()
                    } else {
                        String::new()
                    };
                    rows.push(self.task_row(task, label, view.as_of)?);
                }
            }
            write_table(&mut *out, headers(), rows)?;
            writeln!(out)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn write_status<W: Write>(&self, out: &mut W, view: &CalendarView) -> anyhow::Result<()> {
        let sections = [
            (
                "In progress",
                Tasks::tasks_by_status(view.subdivision.wip.clone()),
            ),
            ("Scheduled", view.subdivision.has_date.clone()),
            ("Unscheduled", view.subdivision.no_date.clone()),
        ];
        for (title, tasks) in sections {
            self.write_section(&mut *out, title, &tasks, view.as_of)?;
        }
        Ok(())
    }

    /// A task with several contexts is listed under each of them.
    #[tracing::instrument(skip_all)]
    pub fn write_context<W: Write>(&self, out: &mut W, view: &CalendarView) -> anyhow::Result<()> {
        let expanded = Tasks::tasks_by_context(view.subdivision.tasks.clone());
        for (_, tasks) in group_by_context(&expanded) {
            let title = tasks
                .first()
                .and_then(|t| t.clean_contexts().into_iter().next())
                .unwrap_or_else(|| NO_CONTEXT.to_string());
            self.write_section(&mut *out, &title, &tasks, view.as_of)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn write_project<W: Write>(&self, out: &mut W, view: &CalendarView) -> anyhow::Result<()> {
        let sorted = Tasks::tasks_by_project(view.subdivision.tasks.clone());
        for (_, tasks) in group_by_project(sorted) {
            let title = tasks
                .first()
                .map(Task::clean_project)
                .unwrap_or_default();
            self.write_section(&mut *out, &title, &tasks, view.as_of)?;
        }
        Ok(())
    }

    pub fn write_summary<W: Write>(&self, out: &mut W, view: &CalendarView) -> anyhow::Result<()> {
        let sub = &view.subdivision;
        writeln!(out, "as of        {}", view.as_of.format("%Y-%m-%d"))?;
        writeln!(out, "tasks        {}", sub.tasks.len())?;
        writeln!(out, "in progress  {}", sub.wip.len())?;
        writeln!(out, "scheduled    {}", sub.has_date.len())?;
        writeln!(out, "unscheduled  {}", sub.no_date.len())?;
        writeln!(out, "weeks        {}", view.weeks.len())?;
        Ok(())
    }

    fn write_section<W: Write>(
        &self,
        mut out: W,
        title: &str,
        tasks: &[Task],
        as_of: NaiveDate,
    ) -> anyhow::Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        writeln!(out, "{}", self.paint(title, BOLD))?;
        let rows = tasks
            .iter()
            .map(|task| {
                let day = task
                    .first()
                    .and_then(TaskDate::to_iso)
                    .unwrap_or_default();
                self.task_row(task, day, as_of)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        write_table(&mut out, headers(), rows)?;
        writeln!(out)?;
        Ok(())
    }

    fn task_row(&self, task: &Task, day: String, as_of: NaiveDate) -> anyhow::Result<Vec<String>> {
        let description = match task.status() {
            TaskStatus::Sunday if task.is_marker() => "end of week".to_string(),
            TaskStatus::Today if task.is_marker() => "today".to_string(),
            status if status.is_active() => self.paint(&task.clean_description(), YELLOW),
            _ => task.clean_description(),
        };
        let shape = if task.is_marker() {
            String::new()
        } else {
            task.classify()?.as_str().to_string()
        };

        let away = task
            .first()
            .and_then(|d| d.diff_in_days(&TaskDate::from_date(as_of, d.role())));
        let away = match away {
            Some(_) if task.is_marker() => String::new(),
            Some(0) => "today".to_string(),
            Some(days) if days < 0 => self.paint(&format!("{days}d"), RED),
            Some(days) => format!("+{days}d"),
            None => String::new(),
        };

        Ok(vec![
            day,
            task.status().as_str().to_string(),
            shape,
            description,
            task.clean_project(),
            task.clean_contexts().join(" "),
            away,
        ])
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn headers() -> Vec<String> {
    ["Day", "Status", "Shape", "Description", "Project", "Contexts", "Away"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ", width = *width)?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Renderer, strip_ansi, write_table};
    use crate::config::Config;
    use crate::dates::DateFields;
    use crate::filter::{FilterAction, FilterState};
    use crate::pipeline::{CalendarView, DeriveOptions, derive};
    use crate::task::{TaskRecord, TaskStatus};

    fn record(description: &str, status: TaskStatus, due: Option<&str>, contexts: &[&str]) -> TaskRecord {
        TaskRecord {
            description: description.to_string(),
            project: "work.md".to_string(),
            status,
            contexts: contexts.iter().map(|c| c.to_string()).collect(),
            dates: due.map(|d| DateFields {
                due: Some(d.to_string()),
                ..DateFields::default()
            }),
        }
    }

    fn sample() -> CalendarView {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 10).expect("date");
        derive(
            vec![
                record("- late", TaskStatus::Todo, Some("20240308"), &["#xdesk"]),
                record("soon", TaskStatus::Todo, Some("20240312"), &["#xphone", "#xdesk"]),
                record("coding", TaskStatus::Wip, Some("20240305"), &[]),
                record("someday", TaskStatus::NoStatus, None, &[]),
            ],
            &FilterState::default(),
            as_of,
            DeriveOptions::default(),
        )
        .expect("derive")
    }

    fn plain() -> Renderer {
        Renderer { color: false }
    }

    fn render(f: impl FnOnce(&Renderer, &mut Vec<u8>) -> anyhow::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&plain(), &mut buf).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn color_setting_is_strict() {
        let mut cfg = Config::default();
        cfg.apply_overrides([("color".to_string(), "maybe".to_string())]);
        assert!(Renderer::new(&cfg).is_err());
        cfg.apply_overrides([("color".to_string(), "off".to_string())]);
        assert!(!Renderer::new(&cfg).expect("renderer").color);
    }

    #[test]
    fn weeks_view_labels_weeks_and_days() {
        let text = render(|r, out| r.write_weeks(out, &sample()));
        assert!(text.contains("Week 03/04 - 03/10"));
        assert!(text.contains("Week 03/11 - 03/17"));
        assert!(text.contains("Fr 8 Mar"));
        assert!(text.contains("end of week"));
        assert!(text.contains("-2d"));
        assert!(text.contains("+2d"));
        // cleaned description
        assert!(text.contains(" late "));
        assert!(!text.contains("- late"));
    }

    #[test]
    fn status_view_orders_sections() {
        let text = render(|r, out| r.write_status(out, &sample()));
        let progress = text.find("In progress").expect("wip section");
        let scheduled = text.find("Scheduled").expect("dated section");
        let unscheduled = text.find("Unscheduled").expect("undated section");
        assert!(progress < scheduled && scheduled < unscheduled);
        assert!(text.contains("coding"));
    }

    #[test]
    fn context_view_repeats_multi_context_tasks() {
        let text = render(|r, out| r.write_context(out, &sample()));
        assert_eq!(text.matches("soon").count(), 2);
        let desk = text.find("desk\n").expect("desk group");
        let phone = text.find("phone\n").expect("phone group");
        let none = text.find("(none)\n").expect("no-context group");
        assert!(desk < phone && phone < none);
    }

    #[test]
    fn sunday_status_on_data_renders_as_a_task() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 10).expect("date");
        let filter = FilterState::default().reduce(FilterAction::ToggleStatus(TaskStatus::Sunday));
        let view = derive(
            vec![record("weekly review", TaskStatus::Sunday, Some("20240310"), &[])],
            &filter,
            as_of,
            DeriveOptions {
                week_markers: false,
                today_marker: false,
            },
        )
        .expect("derive");
        let text = render(|r, out| r.write_weeks(out, &view));
        assert!(text.contains("weekly review"));
        assert!(!text.contains("end of week"));
        assert!(text.contains("DUE"));
    }

    #[test]
    fn summary_counts_partitions() {
        let text = render(|r, out| r.write_summary(out, &sample()));
        assert!(text.contains("tasks        4"));
        assert!(text.contains("in progress  1"));
        assert!(text.contains("unscheduled  1"));
    }

    #[test]
    fn table_pads_by_visible_width() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["A".to_string(), "B".to_string()],
            vec![vec!["\x1b[31mxy\x1b[0m".to_string(), "z".to_string()]],
        )
        .expect("table");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "A  B ");
        assert_eq!(strip_ansi(lines[2]), "xy z ");
    }
}
