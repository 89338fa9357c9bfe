//! The nested phase / sub-phase / stage state machine.
//!
//! # Architecture
//!
//! - [`Stage`] — the smallest unit of progress (logic, hook, or navigation)
//! - [`SubPhaseManager`] — an ordered stage list plus a declared
//!   transition allow-set, validated at construction
//! - [`PhaseManager`] — one per main phase; loops sub-phases until an
//!   instruction is produced or the phase goes stale under it
//! - [`FlowRouter`] — the top-level entry point feeding moderator input
//!   into the current phase and re-entering on silent cross-phase moves

pub mod phase;
pub mod router;
pub mod stage;
pub mod subphase;

pub use phase::PhaseManager;
pub use router::FlowRouter;
pub use stage::{LogicStage, NavigationStage, Stage, StagePass, Transition};
pub use subphase::SubPhaseManager;

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

/// The game's top-level phases.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MainPhase {
    /// Night: role actions resolve in secret
    Night,
    /// Day: discussion and the vote
    Day,
    /// Terminal phase after a win condition
    GameOver,
}

impl fmt::Display for MainPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Night => f.write_str("night"),
            Self::Day => f.write_str("day"),
            Self::GameOver => f.write_str("game_over"),
        }
    }
}

/// Opaque string-encoded sub-phase identifier.
///
/// Each phase defines its own sub-phase vocabulary; the engine only
/// compares and stores these.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubPhaseId(String);

impl SubPhaseId {
    /// Creates a sub-phase id from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubPhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for one stage within a sub-phase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(String);

impl StageId {
    /// Creates a stage id from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
