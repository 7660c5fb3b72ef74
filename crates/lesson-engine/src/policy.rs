//! Booking-window, cancellation and modification rules.
//!
//! Every check is a pure function of its inputs and an explicit `now`; none of
//! them touch the calendar. A check that fails reports *which* rule blocked the
//! action so callers can surface it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LessonPolicy;

/// The rule that rejected a booking, cancellation or modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PolicyViolation {
    /// Start is earlier than `now + min_hours`.
    TooSoon { min_hours: u32 },
    /// Start is later than `now + max_days`.
    TooFar { max_days: u32 },
    /// `now` is past the cancellation deadline.
    CancelDeadlinePassed { hours: u32 },
    /// The booking was already modified the maximum number of times.
    ModificationLimitReached { max: u32 },
    /// `now` is past the modification deadline.
    ModifyDeadlinePassed { hours: u32 },
}

impl std::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyViolation::TooSoon { min_hours } => {
                write!(f, "Please book at least {min_hours} hours in advance")
            }
            PolicyViolation::TooFar { max_days } => {
                write!(f, "Lessons can only be booked within the next {max_days} days")
            }
            PolicyViolation::CancelDeadlinePassed { hours } => {
                write!(f, "Lessons cannot be cancelled within {hours} hours of the start")
            }
            PolicyViolation::ModificationLimitReached { max } => {
                write!(f, "A booking can be modified at most {max} times")
            }
            PolicyViolation::ModifyDeadlinePassed { hours } => {
                write!(f, "Lessons cannot be modified within {hours} hours of the start")
            }
        }
    }
}

/// Outcome of a policy check: allowed, or blocked with a reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub reason: Option<PolicyViolation>,
}

impl PolicyDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: PolicyViolation) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }

    /// `Ok(())` when allowed, otherwise the violated rule.
    pub fn into_result(self) -> Result<(), PolicyViolation> {
        match self.reason {
            Some(reason) if !self.allowed => Err(reason),
            _ => Ok(()),
        }
    }
}

/// A start time is bookable iff `now + min_advance <= start <= now + max_advance`.
///
/// Both bounds are inclusive: a start exactly at either edge is valid.
pub fn is_booking_time_valid(
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    policy: &LessonPolicy,
) -> PolicyDecision {
    if start < now + policy.min_advance() {
        return PolicyDecision::deny(PolicyViolation::TooSoon {
            min_hours: policy.min_advance_booking_hours,
        });
    }
    if start > now + policy.max_advance() {
        return PolicyDecision::deny(PolicyViolation::TooFar {
            max_days: policy.max_advance_booking_days,
        });
    }
    PolicyDecision::allow()
}

/// Cancellation is blocked iff `now > lesson_start - cancel_deadline`.
pub fn can_cancel(
    lesson_start: DateTime<Utc>,
    now: DateTime<Utc>,
    policy: &LessonPolicy,
) -> PolicyDecision {
    if now > lesson_start - policy.cancel_deadline() {
        return PolicyDecision::deny(PolicyViolation::CancelDeadlinePassed {
            hours: policy.cancel_deadline_hours,
        });
    }
    PolicyDecision::allow()
}

/// Modification is blocked when the count is exhausted or the deadline passed.
///
/// The count is checked first, so it is the reported reason when both apply.
pub fn can_modify(
    lesson_start: DateTime<Utc>,
    modification_count: u32,
    now: DateTime<Utc>,
    policy: &LessonPolicy,
) -> PolicyDecision {
    if modification_count >= policy.max_modifications {
        return PolicyDecision::deny(PolicyViolation::ModificationLimitReached {
            max: policy.max_modifications,
        });
    }
    if now > lesson_start - policy.modify_deadline() {
        return PolicyDecision::deny(PolicyViolation::ModifyDeadlinePassed {
            hours: policy.modify_deadline_hours,
        });
    }
    PolicyDecision::allow()
}
