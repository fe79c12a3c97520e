//! Calendar days tagged with the role they play on a task.
//!
//! Dates travel through the boundary as compact `YYYYMMDD` strings. A string
//! that is missing or does not name a real calendar day yields an absent
//! date; parsing never fails loudly.

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use chrono::{
    Datelike,
    Days,
    NaiveDate,
    Weekday
};
use regex::Regex;
use serde::{
    Deserialize,
    Serialize
};

const WEEKDAY_LABELS: [&str; 7] =
    ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Which of a task's dates a [`TaskDate`] represents.
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
#[serde(rename_all = "UPPERCASE")]
pub enum DateRole {
    Start,
    Due,
    Visible
}

impl DateRole {
    pub const ALL: [DateRole; 3] = [
        DateRole::Start,
        DateRole::Due,
        DateRole::Visible
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            | DateRole::Start => "START",
            | DateRole::Due => "DUE",
            | DateRole::Visible => "VISIBLE"
        }
    }
}

impl fmt::Display for DateRole {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn compact_date_re()
-> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> =
        OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{8}$").ok()
    })
    .as_ref()
}

/// Parses a `YYYYMMDD` string into a calendar day.
#[must_use]
pub fn parse_compact(
    raw: &str
) -> Option<NaiveDate> {
    if !compact_date_re()?.is_match(raw) {
        return None;
    }
    let year = raw[0..4].parse::<i32>().ok()?;
    let month =
        raw[4..6].parse::<u32>().ok()?;
    let day = raw[6..8].parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[must_use]
pub fn format_compact(
    date: NaiveDate
) -> String {
    date.format("%Y%m%d").to_string()
}

/// Orders optional days with absence sorting after every present day.
pub fn cmp_absent_last(
    a: Option<NaiveDate>,
    b: Option<NaiveDate>
) -> Ordering {
    match (a, b) {
        | (Some(a), Some(b)) => a.cmp(&b),
        | (Some(_), None) => Ordering::Less,
        | (None, Some(_)) => {
            Ordering::Greater
        }
        | (None, None) => Ordering::Equal
    }
}

/// The Monday and Sunday of the week containing a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekBookends {
    pub monday: NaiveDate,
    pub sunday: NaiveDate
}

impl WeekBookends {
    /// Weeks run Monday through Sunday, so a Sunday closes the week that
    /// began six days earlier.
    pub fn containing(
        date: NaiveDate
    ) -> Option<Self> {
        let back = date
            .weekday()
            .num_days_from_monday();
        let monday = date.checked_sub_days(
            Days::new(u64::from(back))
        )?;
        let sunday = monday
            .checked_add_days(Days::new(6))?;
        Some(Self {
            monday,
            sunday
        })
    }

    pub fn contains(
        &self,
        date: NaiveDate
    ) -> bool {
        date >= self.monday
            && date <= self.sunday
    }
}

/// An optional calendar day with a fixed role.
///
/// Equality and ordering look at the day only; the role is ignored. An
/// absent day compares after every present one.
#[derive(Debug, Clone, Copy)]
pub struct TaskDate {
    date: Option<NaiveDate>,
    role: DateRole
}

impl TaskDate {
    pub fn new(
        raw: Option<&str>,
        role: DateRole
    ) -> Self {
        Self {
            date: raw.and_then(parse_compact),
            role
        }
    }

    pub fn from_date(
        date: NaiveDate,
        role: DateRole
    ) -> Self {
        Self {
            date: Some(date),
            role
        }
    }

    pub fn absent(role: DateRole) -> Self {
        Self {
            date: None,
            role
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn role(&self) -> DateRole {
        self.role
    }

    pub fn is_present(&self) -> bool {
        self.date.is_some()
    }

    pub fn to_compact(
        &self
    ) -> Option<String> {
        self.date.map(format_compact)
    }

    pub fn to_iso(&self) -> Option<String> {
        self.date.map(|d| {
            d.format("%Y-%m-%d").to_string()
        })
    }

    pub fn to_month_day(
        &self
    ) -> Option<String> {
        self.date.map(|d| {
            d.format("%m/%d").to_string()
        })
    }

    pub fn weekday(&self) -> Option<Weekday> {
        self.date.map(|d| d.weekday())
    }

    pub fn weekday_label(
        &self
    ) -> Option<&'static str> {
        self.weekday().map(|w| {
            WEEKDAY_LABELS[w.num_days_from_sunday()
                as usize]
        })
    }

    pub fn is_weekday(
        &self,
        weekday: Weekday
    ) -> bool {
        self.weekday() == Some(weekday)
    }

    pub fn week_bookends(
        &self
    ) -> Option<WeekBookends> {
        WeekBookends::containing(self.date?)
    }

    /// Days from `other` to `self`, positive when `self` is later.
    ///
    /// Both sides are whole calendar days, so the ceiling of the elapsed
    /// span is the exact day count and no rounding takes place.
    pub fn diff_in_days(
        &self,
        other: &TaskDate
    ) -> Option<i64> {
        let (this, that) =
            (self.date?, other.date?);
        Some(
            this.signed_duration_since(that)
                .num_days()
        )
    }
}

impl PartialEq for TaskDate {
    fn eq(&self, other: &Self) -> bool {
        self.date == other.date
    }
}

impl Eq for TaskDate {}

impl PartialOrd for TaskDate {
    fn partial_cmp(
        &self,
        other: &Self
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TaskDate {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_absent_last(self.date, other.date)
    }
}
