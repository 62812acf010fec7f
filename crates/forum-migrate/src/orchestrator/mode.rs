//! Run modes and their preconditions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ModeSelection;
use crate::driver::Detection;
use crate::error::{MigrateError, Result};
use crate::schema::DESTINATION_REVISION;

/// How a run treats the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Fresh destination schema, new ids.
    Copy,
    /// Import into an existing forum; destination-only entities are skipped.
    Merge,
    /// Fresh destination schema, ids copied verbatim.
    ExactCopy,
}

impl RunMode {
    /// Whether step 0 creates the destination schema.
    pub fn creates_schema(self) -> bool {
        matches!(self, RunMode::Copy | RunMode::ExactCopy)
    }

    /// Whether source ids are written as destination ids.
    pub fn preserves_ids(self) -> bool {
        self == RunMode::ExactCopy
    }

    pub fn is_merge(self) -> bool {
        self == RunMode::Merge
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunMode::Copy => "copy",
            RunMode::Merge => "merge",
            RunMode::ExactCopy => "exact_copy",
        })
    }
}

/// What is known about the destination when a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationState {
    /// The destination already holds a forum (`users` exists).
    pub populated: bool,
    /// `i_fork_revision` of a populated destination.
    pub revision: Option<i64>,
}

/// Resolve the requested mode against the destination and the detected
/// source, enforcing each mode's preconditions.
pub fn resolve(
    selection: ModeSelection,
    dest: DestinationState,
    detection: &Detection,
) -> Result<RunMode> {
    let mode = match selection {
        ModeSelection::Auto if dest.populated => RunMode::Merge,
        ModeSelection::Auto if detection.exact => RunMode::ExactCopy,
        ModeSelection::Auto | ModeSelection::Copy => RunMode::Copy,
        ModeSelection::Merge => RunMode::Merge,
        ModeSelection::ExactCopy => RunMode::ExactCopy,
    };

    match mode {
        RunMode::Copy | RunMode::ExactCopy if dest.populated => {
            return Err(MigrateError::DestinationNotEmpty {
                table: "users".to_string(),
            });
        }
        RunMode::ExactCopy if !detection.exact => {
            return Err(MigrateError::Precondition(format!(
                "exact_copy needs a forkbb source at revision {}; found {} {}",
                DESTINATION_REVISION, detection.driver, detection.version
            )));
        }
        RunMode::Merge if !dest.populated => {
            return Err(MigrateError::Precondition(
                "merge needs an existing destination forum; the destination is empty".to_string(),
            ));
        }
        RunMode::Merge if dest.revision != Some(DESTINATION_REVISION) => {
            return Err(MigrateError::Precondition(format!(
                "merge needs a destination at revision {}; found {}",
                DESTINATION_REVISION,
                dest.revision
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "none".to_string())
            )));
        }
        _ => {}
    }
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fluxbb() -> Detection {
        Detection {
            driver: "fluxbb".into(),
            version: "1.5.10".into(),
            exact: false,
        }
    }

    fn forkbb() -> Detection {
        Detection {
            driver: "forkbb".into(),
            version: DESTINATION_REVISION.to_string(),
            exact: true,
        }
    }

    const EMPTY: DestinationState = DestinationState {
        populated: false,
        revision: None,
    };

    const CURRENT: DestinationState = DestinationState {
        populated: true,
        revision: Some(DESTINATION_REVISION),
    };

    #[test]
    fn test_auto_mode() {
        assert_eq!(resolve(ModeSelection::Auto, EMPTY, &fluxbb()).unwrap(), RunMode::Copy);
        assert_eq!(
            resolve(ModeSelection::Auto, EMPTY, &forkbb()).unwrap(),
            RunMode::ExactCopy
        );
        assert_eq!(
            resolve(ModeSelection::Auto, CURRENT, &forkbb()).unwrap(),
            RunMode::Merge
        );
    }

    #[test]
    fn test_explicit_modes_check_destination() {
        assert!(matches!(
            resolve(ModeSelection::Copy, CURRENT, &fluxbb()),
            Err(MigrateError::DestinationNotEmpty { .. })
        ));
        assert!(matches!(
            resolve(ModeSelection::Merge, EMPTY, &fluxbb()),
            Err(MigrateError::Precondition(_))
        ));
        assert!(matches!(
            resolve(ModeSelection::ExactCopy, EMPTY, &fluxbb()),
            Err(MigrateError::Precondition(_))
        ));
        let old = DestinationState {
            populated: true,
            revision: Some(42),
        };
        assert!(resolve(ModeSelection::Merge, old, &fluxbb()).is_err());
        assert_eq!(
            resolve(ModeSelection::Copy, EMPTY, &forkbb()).unwrap(),
            RunMode::Copy
        );
    }
}
