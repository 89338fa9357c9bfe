//! Phase managers: one per main phase.
//!
//! A phase manager owns an entry sub-phase and a table of sub-phase
//! managers. Its `process` loop keeps resolving and executing the current
//! sub-phase until an instruction is produced — or until a stage silently
//! retargets the main phase, at which point this manager is *stale*:
//! the cursor's sub-phase now belongs to a different phase's vocabulary,
//! so control is handed back up instead of misreading it.
//!
//! Managers receive their own phase identity at construction; they never
//! look themselves up in a table to discover it.

use indexmap::IndexMap;

use tracing::debug;

use crate::error::FatalError;
use crate::hooks::HookDispatcher;
use crate::instruction::{InputSlot, Instruction};
use crate::session::{LogEvent, Session};

use super::stage::{StagePass, Transition};
use super::subphase::SubPhaseManager;
use super::{MainPhase, SubPhaseId};

/// Cap on silent sub-phase transitions within one `process` pass.
///
/// Sub-phases legitimately chain a few silent moves; exceeding this means
/// navigation stages are cycling inside the phase without ever producing
/// an instruction or leaving it.
const SILENT_SUBPHASE_BUDGET: u32 = 32;

/// The manager for one main phase.
pub struct PhaseManager {
    phase: MainPhase,
    entry: SubPhaseId,
    subs: IndexMap<SubPhaseId, SubPhaseManager>,
}

impl PhaseManager {
    /// Builds a phase manager from its sub-phase managers.
    ///
    /// # Errors
    ///
    /// - [`FatalError::DuplicateSubPhase`] if two managers share an id
    /// - [`FatalError::UnknownSubPhase`] if the entry sub-phase has no
    ///   manager
    pub fn new(
        phase: MainPhase,
        entry: SubPhaseId,
        sub_managers: Vec<SubPhaseManager>,
    ) -> Result<Self, FatalError> {
        let mut subs = IndexMap::new();
        for manager in sub_managers {
            let id = manager.id().clone();
            if subs.insert(id.clone(), manager).is_some() {
                return Err(FatalError::DuplicateSubPhase { phase, sub: id });
            }
        }
        if !subs.contains_key(&entry) {
            return Err(FatalError::UnknownSubPhase { phase, sub: entry });
        }
        Ok(Self { phase, entry, subs })
    }

    /// The main phase this manager owns.
    #[must_use]
    pub const fn phase(&self) -> MainPhase {
        self.phase
    }

    /// Drives the phase until an instruction is produced or the phase
    /// goes stale.
    ///
    /// Returns `Ok(None)` only when a stage silently moved the session to
    /// a different main phase; the router then re-enters with the new
    /// phase's manager.
    ///
    /// # Errors
    ///
    /// - [`FatalError::SubPhaseLoop`] if silent sub-phase transitions
    ///   exceed the budget within one pass
    /// - anything the stages, validation, or the kernel raise
    pub(crate) fn process(
        &self,
        session: &mut Session,
        dispatcher: &HookDispatcher,
        input: &mut InputSlot,
    ) -> Result<Option<Instruction>, FatalError> {
        let mut silent_moves = 0_u32;
        loop {
            // Resolve the current sub-phase: cache value, or the entry
            // default on first activation of this phase. The cursor itself
            // is only committed once a stage makes real progress.
            let sub = session
                .cursor()
                .sub_phase()
                .cloned()
                .unwrap_or_else(|| self.entry.clone());

            let manager = self.subs.get(&sub).ok_or_else(|| FatalError::UnknownSubPhase {
                phase: self.phase,
                sub: sub.clone(),
            })?;

            match manager.execute(session, dispatcher, input)? {
                StagePass::Instruction(instruction) => return Ok(Some(instruction)),
                StagePass::Continue => {}
                StagePass::Transition(transition) => {
                    let silent_sub = matches!(
                        transition,
                        Transition::ToSubPhase {
                            instruction: None,
                            ..
                        }
                    );
                    if let Some(instruction) = self.apply(session, transition)? {
                        return Ok(Some(instruction));
                    }
                    if silent_sub {
                        silent_moves += 1;
                        if silent_moves > SILENT_SUBPHASE_BUDGET {
                            return Err(FatalError::SubPhaseLoop {
                                phase: self.phase,
                                budget: SILENT_SUBPHASE_BUDGET,
                            });
                        }
                    }
                }
            }

            // A stage may have silently retargeted the main phase; this
            // manager must not keep interpreting a cursor that now speaks
            // another phase's sub-phase vocabulary.
            if session.phase() != self.phase {
                debug!(owned = %self.phase, current = %session.phase(), "phase manager stale, handing back");
                return Ok(None);
            }
        }
    }

    fn apply(
        &self,
        session: &mut Session,
        transition: Transition,
    ) -> Result<Option<Instruction>, FatalError> {
        match transition {
            Transition::ToSubPhase { dest, instruction } => {
                debug!(phase = %self.phase, to = %dest, "sub-phase transition");
                session.cursor_mut().enter_sub_phase(dest);
                Ok(instruction)
            }
            Transition::ToMainPhase { dest, instruction } => {
                session.append_and_apply(|s| LogEvent::PhaseChanged {
                    from: s.phase(),
                    to: dest,
                })?;
                Ok(instruction)
            }
        }
    }
}

impl std::fmt::Debug for PhaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseManager")
            .field("phase", &self.phase)
            .field("entry", &self.entry)
            .field("num_sub_phases", &self.subs.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
