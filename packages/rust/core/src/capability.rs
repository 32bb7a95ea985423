//! Optional walker branches.
//!
//! Lessons are always processed. Assessments exist upstream but nothing is
//! built from them yet; practice problems are built only on request.

use std::fmt;

/// A branch of the traversal that can be switched on per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Lessons,
    Assessments,
    PracticeProblems,
}

/// Implementation state of a [`Capability`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityStatus {
    /// Fully implemented and always on.
    Active,
    /// Endpoints are fetched but no nodes are built.
    Stub { reason: &'static str },
    /// Implemented, off unless enabled.
    Dormant,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Lessons,
        Capability::Assessments,
        Capability::PracticeProblems,
    ];

    pub fn status(self) -> CapabilityStatus {
        match self {
            Capability::Lessons => CapabilityStatus::Active,
            Capability::Assessments => CapabilityStatus::Stub {
                reason: "assessment records have no document mapping",
            },
            Capability::PracticeProblems => CapabilityStatus::Dormant,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Capability::Lessons => "lessons",
            Capability::Assessments => "assessments",
            Capability::PracticeProblems => "practice_problems",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The optional branches enabled for one run. Lessons are implied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub assessments: bool,
    pub practice_problems: bool,
}

impl Capabilities {
    pub fn is_enabled(&self, capability: Capability) -> bool {
        match capability {
            Capability::Lessons => true,
            Capability::Assessments => self.assessments,
            Capability::PracticeProblems => self.practice_problems,
        }
    }

    /// Enabled capabilities, in declaration order.
    pub fn enabled(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.is_enabled(*c))
    }
}
