// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// One experimental condition that a participant can be assigned to.
///
/// The key is the machine identifier used in registries and file names
/// ("premium"). The label is the human-readable name shown to the
/// participant.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Group {
    pub key: String,
    pub label: String,
}

// ******** Output data structures *********

/// The condition handed to a new participant. Immutable once produced.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Assignment {
    pub group_key: String,
    pub label: String,
}

/// The outcome of requesting a slot for a new participant.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AssignmentOutcome {
    Assigned(Assignment),
    /// Every group is at capacity. This is a normal terminal outcome of a
    /// fully enrolled study, not an error.
    Exhausted,
}

/// Errors that prevent an assignment from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum BalanceErrors {
    EmptyGroupSet,
    ZeroCapacity,
    UnknownGroup(String),
}

impl Error for BalanceErrors {}

impl Display for BalanceErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BalanceErrors::EmptyGroupSet => write!(f, "BalanceError: empty group set"),
            BalanceErrors::ZeroCapacity => write!(f, "BalanceError: capacity must be positive"),
            BalanceErrors::UnknownGroup(key) => {
                write!(f, "BalanceError: unknown group {:?}", key)
            }
        }
    }
}

// ********* Configuration **********

/// How a tie between least-filled groups is resolved.
///
/// Both modes pick uniformly at random among the tied groups. A
/// deterministic break (always the first group) would bias group sizes
/// across cohorts enrolling in parallel and is not offered.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TieBreakMode {
    /// Seeded from OS entropy.
    Uniform,
    /// Reproducible selection, for tests and auditable reruns.
    Seeded(u64),
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct BalanceRules {
    /// Maximum number of participants per group.
    pub capacity: u32,
    pub tie_break: TieBreakMode,
}

impl BalanceRules {
    pub const DEFAULT_RULES: BalanceRules = BalanceRules {
        capacity: 15,
        tie_break: TieBreakMode::Uniform,
    };
}
