//! The active project/context/status selection.
//!
//! State never changes in place: [`FilterState::reduce`] returns the next
//! state for an action and leaves the current one untouched.

use tracing::trace;

use crate::task::{
    Task,
    TaskStatus
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAction {
    SetProject(String),
    SetContext(String),
    UnsetProject,
    UnsetContext,
    ToggleStatus(TaskStatus)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub project:  Option<String>,
    pub context:  Option<String>,
    pub statuses: Vec<TaskStatus>
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            project:  None,
            context:  None,
            statuses: TaskStatus::DATA.to_vec()
        }
    }
}

impl FilterState {
    #[must_use]
    pub fn reduce(
        &self,
        action: FilterAction
    ) -> FilterState {
        trace!(?action, "reducing filter state");
        let mut next = self.clone();
        match action {
            | FilterAction::SetProject(p) => {
                next.project = Some(p);
            }
            | FilterAction::SetContext(c) => {
                next.context = Some(c);
            }
            | FilterAction::UnsetProject => {
                next.project = None;
            }
            | FilterAction::UnsetContext => {
                next.context = None;
            }
            | FilterAction::ToggleStatus(status) => {
                if next.statuses.contains(&status) {
                    next.statuses.retain(|s| *s != status);
                } else {
                    next.statuses.push(status);
                }
            }
        }
        next
    }

    /// Folds a sequence of actions from this state.
    #[must_use]
    pub fn reduce_all<I>(
        &self,
        actions: I
    ) -> FilterState
    where
        I: IntoIterator<Item = FilterAction>
    {
        actions
            .into_iter()
            .fold(self.clone(), |state, action| {
                state.reduce(action)
            })
    }

    pub fn matches(&self, task: &Task) -> bool {
        if task.is_marker() {
            return true;
        }
        if let Some(project) = &self.project
            && task.project() != project
            && task.clean_project() != *project
        {
            return false;
        }
        if let Some(context) = &self.context {
            let raw = task.contexts().iter().any(|c| c == context);
            let clean = task
                .clean_contexts()
                .iter()
                .any(|c| c == context);
            if !raw && !clean {
                return false;
            }
        }
        self.statuses.contains(&task.status())
    }

    pub fn apply(&self, tasks: Vec<Task>) -> Vec<Task> {
        tasks
            .into_iter()
            .filter(|t| self.matches(t))
            .collect()
    }
}
