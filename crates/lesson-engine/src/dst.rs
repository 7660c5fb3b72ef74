//! DST transition policies for slot generation.

use serde::{Deserialize, Serialize};

/// Policy for candidate slot starts whose local wall-clock time falls in a DST
/// gap (e.g. 02:30 on a spring-forward night).
///
/// Ambiguous local times (fall-back overlap) always resolve to the earlier
/// instant regardless of policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Drop candidates that do not exist in local time.
    #[default]
    Skip,
    /// Move the candidate to the first valid instant after the gap.
    ShiftForward,
}
