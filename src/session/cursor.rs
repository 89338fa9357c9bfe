//! The flow cursor — the session's serializable program counter.
//!
//! Everything needed to resume a suspended round-trip lives here as plain
//! data: current main phase, current sub-phase, which stages of that
//! sub-phase have been entered, the active hook, and the one listener
//! paused awaiting input together with its encoded internal state.
//!
//! Entering a new *main* phase unconditionally clears every transient
//! field; nothing may leak across a main-phase boundary.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::flow::{MainPhase, StageId, SubPhaseId};
use crate::hooks::{HookId, ListenerId, StateToken};

/// The one listener currently paused awaiting moderator input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PausedListener {
    /// Which listener is paused
    pub listener: ListenerId,
    /// Its encoded internal state, resumed on the next input
    pub state: StateToken,
}

/// Serializable record of exactly where execution is paused.
///
/// Mutated only by the phase/stage managers and the hook dispatcher;
/// listener logic never touches it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCursor {
    phase: MainPhase,
    sub_phase: Option<SubPhaseId>,
    entered: BTreeSet<StageId>,
    active_hook: Option<HookId>,
    paused: Option<PausedListener>,
}

impl Default for FlowCursor {
    fn default() -> Self {
        Self::new(MainPhase::Night)
    }
}

impl FlowCursor {
    /// A fresh cursor positioned at the start of the given main phase.
    #[must_use]
    pub const fn new(phase: MainPhase) -> Self {
        Self {
            phase,
            sub_phase: None,
            entered: BTreeSet::new(),
            active_hook: None,
            paused: None,
        }
    }

    /// Current main phase.
    #[must_use]
    pub const fn phase(&self) -> MainPhase {
        self.phase
    }

    /// Current sub-phase, if one has been entered.
    #[must_use]
    pub const fn sub_phase(&self) -> Option<&SubPhaseId> {
        self.sub_phase.as_ref()
    }

    /// Returns `true` if the stage has been entered during the current
    /// sub-phase activation.
    #[must_use]
    pub fn stage_entered(&self, stage: &StageId) -> bool {
        self.entered.contains(stage)
    }

    /// The hook currently mid-dispatch, if any.
    #[must_use]
    pub const fn active_hook(&self) -> Option<&HookId> {
        self.active_hook.as_ref()
    }

    /// The listener currently paused awaiting input, if any.
    #[must_use]
    pub const fn paused(&self) -> Option<&PausedListener> {
        self.paused.as_ref()
    }

    /// Crosses a main-phase boundary, clearing every transient field.
    pub(crate) fn enter_main_phase(&mut self, to: MainPhase) {
        self.phase = to;
        self.sub_phase = None;
        self.entered.clear();
        self.active_hook = None;
        self.paused = None;
    }

    /// Activates a sub-phase, resetting the entered-stage flags.
    pub(crate) fn enter_sub_phase(&mut self, to: SubPhaseId) {
        self.sub_phase = Some(to);
        self.entered.clear();
    }

    /// Marks a stage entered for the current sub-phase activation.
    pub(crate) fn mark_entered(&mut self, stage: StageId) {
        self.entered.insert(stage);
    }

    /// Records the hook a hook stage has begun dispatching.
    pub(crate) fn set_active_hook(&mut self, hook: HookId) {
        self.active_hook = Some(hook);
    }

    /// Records a paused listener under the active hook.
    pub(crate) fn pause(&mut self, hook: HookId, listener: ListenerId, state: StateToken) {
        self.active_hook = Some(hook);
        self.paused = Some(PausedListener { listener, state });
    }

    /// Clears only the paused-listener record (the hook keeps dispatching).
    pub(crate) fn clear_pause(&mut self) {
        self.paused = None;
    }

    /// Clears the active hook and any pause under it (hook complete).
    pub(crate) fn clear_hook(&mut self) {
        self.active_hook = None;
        self.paused = None;
    }
}

// ============================================================================
// Tests
// ============================================================================
