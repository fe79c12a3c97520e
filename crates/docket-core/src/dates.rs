//! The set of dates attached to one task, at most one per role.

use chrono::NaiveDate;
use serde::{
    Deserialize,
    Serialize
};

use crate::calendar::{
    DateRole,
    TaskDate
};
use crate::error::EngineError;

/// Raw date fields of a task record, each a compact `YYYYMMDD` string.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
)]
pub struct DateFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start:   Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due:     Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<String>
}

impl DateFields {
    pub fn raw(
        &self,
        role: DateRole
    ) -> Option<&str> {
        match role {
            | DateRole::Start => self.start.as_deref(),
            | DateRole::Due => self.due.as_deref(),
            | DateRole::Visible => {
                self.visible.as_deref()
            }
        }
    }
}

/// Up to three present dates, one per role.
#[derive(Debug, Clone, Default)]
pub struct TaskDates {
    dates: Vec<TaskDate>
}

impl TaskDates {
    /// Builds the set from optional raw fields, dropping absent roles.
    pub fn from_fields(
        fields: Option<&DateFields>
    ) -> Self {
        let dates = DateRole::ALL
            .iter()
            .map(|role| {
                TaskDate::new(
                    fields.and_then(|f| f.raw(*role)),
                    *role
                )
            })
            .filter(TaskDate::is_present)
            .collect();
        Self {
            dates
        }
    }

    /// Builds the set from explicit entries. Absent entries are dropped and
    /// a repeated role is rejected.
    pub fn from_entries(
        entries: Vec<TaskDate>
    ) -> Result<Self, EngineError> {
        let dates: Vec<TaskDate> = entries
            .into_iter()
            .filter(TaskDate::is_present)
            .collect();
        for role in DateRole::ALL {
            if dates
                .iter()
                .filter(|d| d.role() == role)
                .count()
                > 1
            {
                return Err(
                    EngineError::DuplicateDateRole {
                        role
                    }
                );
            }
        }
        Ok(Self {
            dates
        })
    }

    pub fn iter(
        &self
    ) -> impl Iterator<Item = &TaskDate> {
        self.dates.iter()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn get(
        &self,
        role: DateRole
    ) -> Result<Option<&TaskDate>, EngineError>
    {
        let mut matches = self
            .dates
            .iter()
            .filter(|d| d.role() == role);
        let found = matches.next();
        if matches.next().is_some() {
            return Err(
                EngineError::DuplicateDateRole {
                    role
                }
            );
        }
        Ok(found)
    }

    pub fn has(
        &self,
        role: DateRole
    ) -> Result<bool, EngineError> {
        Ok(self.get(role)?.is_some())
    }

    /// The earliest entry. Ties keep the first entry in role order.
    pub fn first(&self) -> Option<&TaskDate> {
        self.dates.iter().min()
    }

    /// True unless a visible date lies after `as_of`.
    pub fn is_visible(
        &self,
        as_of: Option<NaiveDate>
    ) -> Result<bool, EngineError> {
        let Some(visible) =
            self.get(DateRole::Visible)?
        else {
            return Ok(true);
        };
        let Some(as_of) = as_of else {
            return Ok(true);
        };
        Ok(visible
            .date()
            .is_none_or(|day| day <= as_of))
    }

    /// Days from the `to` role's date to the `from` role's date.
    pub fn diff(
        &self,
        from: DateRole,
        to: DateRole
    ) -> Result<Option<i64>, EngineError> {
        let (Some(a), Some(b)) =
            (self.get(from)?, self.get(to)?)
        else {
            return Ok(None);
        };
        Ok(a.diff_in_days(b))
    }

    pub fn duration_days(
        &self
    ) -> Result<Option<i64>, EngineError> {
        self.diff(DateRole::Due, DateRole::Start)
    }

    pub(crate) fn remove_date(
        &mut self,
        role: DateRole
    ) {
        self.dates.retain(|d| d.role() != role);
    }
}
