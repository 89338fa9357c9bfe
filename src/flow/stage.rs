//! Stage variants and their results.
//!
//! A stage is the smallest unit of progress and always ends in a produced
//! result: a logic stage halts with an instruction mid-sub-phase, a hook
//! stage delegates to the hook dispatcher, and a navigation stage ends the
//! sub-phase with an explicit transition. A transition with no instruction
//! is "silent" — the flow keeps looping without a moderator round-trip.

use std::fmt;

use crate::error::FatalError;
use crate::hooks::HookId;
use crate::instruction::{InputSlot, Instruction};
use crate::session::Session;

use super::{MainPhase, SubPhaseId};

// ============================================================================
// Transitions
// ============================================================================

/// An explicit transition produced by a navigation stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Move to another sub-phase of the same main phase
    ToSubPhase {
        /// Destination sub-phase
        dest: SubPhaseId,
        /// Instruction to halt with, or `None` for a silent move
        instruction: Option<Instruction>,
    },
    /// Move to another main phase
    ToMainPhase {
        /// Destination main phase
        dest: MainPhase,
        /// Instruction to halt with, or `None` for a silent move
        instruction: Option<Instruction>,
    },
}

impl Transition {
    /// A silent sub-phase move.
    #[must_use]
    pub fn sub(dest: SubPhaseId) -> Self {
        Self::ToSubPhase {
            dest,
            instruction: None,
        }
    }

    /// A sub-phase move halting with an instruction.
    #[must_use]
    pub fn sub_with(dest: SubPhaseId, instruction: Instruction) -> Self {
        Self::ToSubPhase {
            dest,
            instruction: Some(instruction),
        }
    }

    /// A silent main-phase move.
    #[must_use]
    pub const fn main(dest: MainPhase) -> Self {
        Self::ToMainPhase {
            dest,
            instruction: None,
        }
    }

    /// A main-phase move halting with an instruction.
    #[must_use]
    pub const fn main_with(dest: MainPhase, instruction: Instruction) -> Self {
        Self::ToMainPhase {
            dest,
            instruction: Some(instruction),
        }
    }
}

// ============================================================================
// Stage Traits
// ============================================================================

/// A stage that runs side-effecting work and always halts with an
/// instruction, staying in the sub-phase (more stages follow).
pub trait LogicStage: Send + Sync {
    /// Runs the stage.
    ///
    /// # Errors
    ///
    /// Propagates [`FatalError`] from kernel commands.
    fn run(
        &self,
        session: &mut Session,
        input: &mut InputSlot,
    ) -> Result<Instruction, FatalError>;
}

impl<F> LogicStage for F
where
    F: Fn(&mut Session, &mut InputSlot) -> Result<Instruction, FatalError> + Send + Sync,
{
    fn run(
        &self,
        session: &mut Session,
        input: &mut InputSlot,
    ) -> Result<Instruction, FatalError> {
        self(session, input)
    }
}

/// The final stage of a sub-phase: produces an explicit transition.
pub trait NavigationStage: Send + Sync {
    /// Decides where the flow goes next.
    ///
    /// # Errors
    ///
    /// Propagates [`FatalError`] from kernel commands.
    fn navigate(
        &self,
        session: &mut Session,
        input: &mut InputSlot,
    ) -> Result<Transition, FatalError>;
}

impl<F> NavigationStage for F
where
    F: Fn(&mut Session, &mut InputSlot) -> Result<Transition, FatalError> + Send + Sync,
{
    fn navigate(
        &self,
        session: &mut Session,
        input: &mut InputSlot,
    ) -> Result<Transition, FatalError> {
        self(session, input)
    }
}

// ============================================================================
// Stage
// ============================================================================

/// One stage in a sub-phase's ordered list.
pub enum Stage {
    /// Side-effecting work that halts with an instruction
    Logic(Box<dyn LogicStage>),
    /// Delegation to the hook dispatcher
    Hook(HookId),
    /// End of sub-phase: an explicit transition
    Navigation(Box<dyn NavigationStage>),
}

impl Stage {
    /// Wraps a logic stage.
    #[must_use]
    pub fn logic(stage: impl LogicStage + 'static) -> Self {
        Self::Logic(Box::new(stage))
    }

    /// A hook stage firing the given hook.
    #[must_use]
    pub const fn hook(hook: HookId) -> Self {
        Self::Hook(hook)
    }

    /// Wraps a navigation stage.
    #[must_use]
    pub fn navigation(stage: impl NavigationStage + 'static) -> Self {
        Self::Navigation(Box::new(stage))
    }

    /// Returns `true` for navigation stages.
    #[must_use]
    pub const fn is_navigation(&self) -> bool {
        matches!(self, Self::Navigation(_))
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logic(_) => f.write_str("Stage::Logic"),
            Self::Hook(hook) => write!(f, "Stage::Hook({hook})"),
            Self::Navigation(_) => f.write_str("Stage::Navigation"),
        }
    }
}

/// Result of running one stage.
#[derive(Debug)]
pub enum StagePass {
    /// Halt the round-trip with an instruction
    Instruction(Instruction),
    /// A completed hook stage: keep looping in this sub-phase
    Continue,
    /// A navigation stage's transition, not yet validated or applied
    Transition(Transition),
}

// ============================================================================
// Tests
// ============================================================================
