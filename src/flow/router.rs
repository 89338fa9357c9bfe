//! Top-level flow router.
//!
//! The router is the engine's single entry point for "advance the game".
//! Each call threads at most one moderator input through the current phase
//! manager and returns the next instruction to relay. Silent cross-phase
//! transitions re-enter the new phase's manager with the *same* input slot,
//! so input that nothing in the old phase consumed is still available to
//! the new one.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::FatalError;
use crate::hooks::HookDispatcher;
use crate::instruction::{InputSlot, Instruction, ModeratorInput};
use crate::session::Session;

use super::phase::PhaseManager;
use super::MainPhase;

/// Cap on silent cross-phase re-entries within one dispatch.
///
/// Any legitimate flow settles within a couple of hops; exceeding this
/// means two navigation stages are silently bouncing the phase back and
/// forth forever.
const SILENT_REENTRY_BUDGET: u32 = 8;

/// The top-level router over all phase managers.
pub struct FlowRouter {
    phases: HashMap<MainPhase, PhaseManager>,
    dispatcher: HookDispatcher,
}

impl FlowRouter {
    /// Builds a router from the full set of phase managers.
    ///
    /// # Errors
    ///
    /// [`FatalError::DuplicatePhase`] if two managers claim the same main
    /// phase.
    pub fn new(
        managers: Vec<PhaseManager>,
        dispatcher: HookDispatcher,
    ) -> Result<Self, FatalError> {
        let mut phases = HashMap::new();
        for manager in managers {
            let phase = manager.phase();
            if phases.insert(phase, manager).is_some() {
                return Err(FatalError::DuplicatePhase(phase));
            }
        }
        Ok(Self { phases, dispatcher })
    }

    /// Advances the session until the next instruction.
    ///
    /// `input` answers the session's pending instruction (already
    /// shape-checked by
    /// [`validate_response`](crate::instruction::validate_response)), or is
    /// `None` for the very first dispatch of a fresh session.
    ///
    /// On success the returned instruction is also recorded as the
    /// session's pending instruction.
    ///
    /// # Errors
    ///
    /// - [`FatalError::UnknownPhase`] if no manager covers the current phase
    /// - [`FatalError::RouterLoop`] if silent cross-phase transitions
    ///   exceed the re-entry budget
    /// - anything the phase managers raise
    pub fn dispatch(
        &self,
        session: &mut Session,
        input: Option<ModeratorInput>,
    ) -> Result<Instruction, FatalError> {
        let mut slot = InputSlot::new(input);

        for attempt in 0..SILENT_REENTRY_BUDGET {
            let phase = session.phase();
            let manager = self
                .phases
                .get(&phase)
                .ok_or(FatalError::UnknownPhase(phase))?;

            debug!(session = %session.id(), %phase, "entering phase manager");
            match manager.process(session, &self.dispatcher, &mut slot)? {
                Some(instruction) => {
                    info!(
                        session = %session.id(),
                        phase = %session.phase(),
                        prompt = %instruction.prompt,
                        "halting with instruction"
                    );
                    session.set_pending(instruction.clone());
                    return Ok(instruction);
                }
                None => {
                    // The manager only hands back on a phase change.
                    if session.phase() == phase {
                        return Err(FatalError::FlowStalled { phase });
                    }
                    if attempt >= SILENT_REENTRY_BUDGET / 2 {
                        warn!(
                            session = %session.id(),
                            from = %phase,
                            to = %session.phase(),
                            attempt,
                            "unusually long silent phase re-entry chain"
                        );
                    }
                }
            }
        }

        Err(FatalError::RouterLoop {
            phase: session.phase(),
            budget: SILENT_REENTRY_BUDGET,
        })
    }
}

impl std::fmt::Debug for FlowRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowRouter")
            .field("num_phases", &self.phases.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
