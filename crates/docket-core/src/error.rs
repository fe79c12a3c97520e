//! Error types for the task engine.

use thiserror::Error;

use crate::calendar::DateRole;

/// Invariant violations raised by the engine.
///
/// These indicate a construction bug rather than bad input data: malformed
/// or missing date strings resolve to an absent role and never surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A task date set holds more than one entry for the same role
    #[error("more than one entry for date role {role}")]
    DuplicateDateRole {
        /// The role that appears twice
        role: DateRole,
    },
}
