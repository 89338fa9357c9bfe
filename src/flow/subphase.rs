//! Sub-phase managers: ordered stage lists with declared transition
//! allow-sets.
//!
//! Construction is where authoring mistakes die: duplicate stage ids and a
//! non-navigation final stage are rejected before a session ever runs, and
//! any transition a stage produces at runtime is checked against the
//! declared allow-set *before* the cursor changes. A miswired destination
//! can therefore never be committed.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::FatalError;
use crate::hooks::{HookDispatcher, HookOutcome};
use crate::instruction::InputSlot;
use crate::session::Session;

use super::stage::{Stage, StagePass, Transition};
use super::{MainPhase, StageId, SubPhaseId};

/// One sub-phase: an ordered stage list plus its transition allow-set.
pub struct SubPhaseManager {
    id: SubPhaseId,
    stages: Vec<(StageId, Stage)>,
    allowed_sub: BTreeSet<SubPhaseId>,
    allowed_main: BTreeSet<MainPhase>,
}

impl SubPhaseManager {
    /// Builds a sub-phase manager, validating the stage list.
    ///
    /// # Errors
    ///
    /// - [`FatalError::DuplicateStage`] if two stages share an id
    /// - [`FatalError::MissingNavigation`] if the list is empty or its
    ///   final stage is not a navigation stage
    pub fn new(
        id: SubPhaseId,
        stages: Vec<(StageId, Stage)>,
        allowed_sub: impl IntoIterator<Item = SubPhaseId>,
        allowed_main: impl IntoIterator<Item = MainPhase>,
    ) -> Result<Self, FatalError> {
        let mut seen = BTreeSet::new();
        for (stage_id, _) in &stages {
            if !seen.insert(stage_id.clone()) {
                return Err(FatalError::DuplicateStage {
                    sub: id,
                    stage: stage_id.clone(),
                });
            }
        }
        if !stages.last().is_some_and(|(_, s)| s.is_navigation()) {
            return Err(FatalError::MissingNavigation { sub: id });
        }
        Ok(Self {
            id,
            stages,
            allowed_sub: allowed_sub.into_iter().collect(),
            allowed_main: allowed_main.into_iter().collect(),
        })
    }

    /// This sub-phase's id.
    #[must_use]
    pub const fn id(&self) -> &SubPhaseId {
        &self.id
    }

    /// Checks a produced transition against the declared allow-set.
    ///
    /// Called before any cursor mutation; an undeclared destination is an
    /// authoring bug surfaced at the moment the stage misbehaves.
    ///
    /// # Errors
    ///
    /// [`FatalError::UndeclaredTransition`] for destinations outside the
    /// allow-set.
    pub fn validate(&self, transition: &Transition) -> Result<(), FatalError> {
        let ok = match transition {
            Transition::ToSubPhase { dest, .. } => self.allowed_sub.contains(dest),
            Transition::ToMainPhase { dest, .. } => self.allowed_main.contains(dest),
        };
        if ok {
            Ok(())
        } else {
            let dest = match transition {
                Transition::ToSubPhase { dest, .. } => dest.to_string(),
                Transition::ToMainPhase { dest, .. } => dest.to_string(),
            };
            Err(FatalError::UndeclaredTransition {
                sub: self.id.clone(),
                dest,
            })
        }
    }

    /// Runs one step of this sub-phase.
    ///
    /// If the cursor names an active hook, the dispatch is resumed first —
    /// the owning hook stage is already marked entered, so resumption must
    /// not fall through stage iteration. Otherwise the first un-entered
    /// stage runs: logic and hook stages are marked entered first, while a
    /// navigation stage's transition is validated before the cursor is
    /// touched at all.
    ///
    /// # Errors
    ///
    /// - [`FatalError::StageExhausted`] if every stage is already entered
    /// - anything the stage or dispatcher raises
    pub(crate) fn execute(
        &self,
        session: &mut Session,
        dispatcher: &HookDispatcher,
        input: &mut InputSlot,
    ) -> Result<StagePass, FatalError> {
        if let Some(hook) = session.cursor().active_hook().cloned() {
            debug!(sub = %self.id, %hook, "resuming active hook");
            match dispatcher.fire(&hook, session, input)? {
                HookOutcome::NeedInput(instruction) => {
                    return Ok(StagePass::Instruction(instruction));
                }
                HookOutcome::Complete => {
                    session.cursor_mut().clear_hook();
                }
            }
        }
        self.run_next(session, dispatcher, input)
    }

    fn run_next(
        &self,
        session: &mut Session,
        dispatcher: &HookDispatcher,
        input: &mut InputSlot,
    ) -> Result<StagePass, FatalError> {
        let Some((stage_id, stage)) = self
            .stages
            .iter()
            .find(|(id, _)| !session.cursor().stage_entered(id))
        else {
            return Err(FatalError::StageExhausted {
                sub: self.id.clone(),
            });
        };

        match stage {
            Stage::Logic(logic) => {
                debug!(sub = %self.id, stage = %stage_id, "entering stage");
                self.activate(session);
                session.cursor_mut().mark_entered(stage_id.clone());
                logic.run(session, input).map(StagePass::Instruction)
            }
            Stage::Hook(hook) => {
                debug!(sub = %self.id, stage = %stage_id, "entering stage");
                self.activate(session);
                session.cursor_mut().mark_entered(stage_id.clone());
                session.cursor_mut().set_active_hook(hook.clone());
                match dispatcher.fire(hook, session, input)? {
                    HookOutcome::NeedInput(instruction) => {
                        Ok(StagePass::Instruction(instruction))
                    }
                    HookOutcome::Complete => {
                        session.cursor_mut().clear_hook();
                        Ok(StagePass::Continue)
                    }
                }
            }
            Stage::Navigation(nav) => {
                debug!(sub = %self.id, stage = %stage_id, "running navigation");
                let transition = nav.navigate(session, input)?;
                self.validate(&transition)?;
                Ok(StagePass::Transition(transition))
            }
        }
    }

    /// Commits the cursor to this sub-phase if it is not there yet.
    ///
    /// Called only when a stage is about to leave a mark on the cursor; a
    /// navigation stage whose transition fails validation therefore leaves
    /// the cursor exactly as it found it, entry activation included.
    fn activate(&self, session: &mut Session) {
        if session.cursor().sub_phase() != Some(&self.id) {
            session.cursor_mut().enter_sub_phase(self.id.clone());
        }
    }
}

impl std::fmt::Debug for SubPhaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubPhaseManager")
            .field("id", &self.id)
            .field("num_stages", &self.stages.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
