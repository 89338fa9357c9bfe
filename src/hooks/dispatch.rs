//! The hook dispatcher.
//!
//! Fires a hook's listeners in their registered order. Ineligible
//! listeners are skipped silently (no log entry, no cursor change), the
//! first listener that needs input pauses the whole dispatch, and a resumed
//! dispatch picks up at the paused listener without re-running its
//! predecessors. A paused listener is always resumed, even if the event
//! that made it eligible has since been undone; it owes the moderator an
//! answer to the question it already asked.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::FatalError;
use crate::instruction::{InputSlot, Instruction};
use crate::session::{Session, StatusEffect};

use super::listener::{HookListener, ListenerId, ListenerStep};
use super::registry::HookDispatcherBuilder;
use super::HookId;

/// Result of firing one hook.
#[derive(Debug)]
pub enum HookOutcome {
    /// A listener paused; relay this instruction and re-fire on the answer
    NeedInput(Instruction),
    /// Every eligible listener ran to completion
    Complete,
}

/// Dispatches hooks to their ordered listeners.
///
/// Construction goes through [`HookDispatcher::builder`], which validates
/// the order and implementation tables against each other.
pub struct HookDispatcher {
    order: IndexMap<HookId, Vec<ListenerId>>,
    impls: HashMap<ListenerId, Box<dyn HookListener>>,
}

impl HookDispatcher {
    /// Starts building a dispatcher.
    #[must_use]
    pub fn builder() -> HookDispatcherBuilder {
        HookDispatcherBuilder::new()
    }

    pub(super) fn from_parts(
        order: IndexMap<HookId, Vec<ListenerId>>,
        impls: HashMap<ListenerId, Box<dyn HookListener>>,
    ) -> Self {
        Self { order, impls }
    }

    /// Fires `hook`, resuming a paused listener if the cursor records one.
    ///
    /// # Errors
    ///
    /// - [`FatalError::UnknownHook`] if no order is registered for the hook
    /// - [`FatalError::PausedListenerMissing`] if the cursor's paused
    ///   listener is not in the hook's order
    /// - anything a listener raises
    pub(crate) fn fire(
        &self,
        hook: &HookId,
        session: &mut Session,
        input: &mut InputSlot,
    ) -> Result<HookOutcome, FatalError> {
        let order = self
            .order
            .get(hook)
            .ok_or_else(|| FatalError::UnknownHook(hook.clone()))?;

        let paused = session.cursor().paused().cloned();
        let start = match &paused {
            Some(p) => order.iter().position(|l| *l == p.listener).ok_or_else(|| {
                FatalError::PausedListenerMissing {
                    hook: hook.clone(),
                    listener: p.listener.clone(),
                }
            })?,
            None => 0,
        };

        for (idx, listener_id) in order.iter().enumerate().skip(start) {
            let resuming = paused.is_some() && idx == start;

            // A paused listener bypasses the eligibility check; it already
            // asked its question and must consume the answer.
            if resuming {
                if !self.eligible(session, listener_id)? {
                    warn!(
                        %hook,
                        listener = %listener_id,
                        "resuming paused listener that is no longer eligible"
                    );
                }
            } else if !self.eligible(session, listener_id)? {
                debug!(%hook, listener = %listener_id, "skipping ineligible listener");
                continue;
            }

            let listener = self
                .impls
                .get(listener_id)
                .ok_or_else(|| FatalError::UnknownListener(listener_id.clone()))?;
            let state = if resuming {
                paused.as_ref().map(|p| &p.state)
            } else {
                None
            };

            debug!(%hook, listener = %listener_id, resuming, "stepping listener");
            match listener.step(session, hook, state, input)? {
                ListenerStep::NeedInput {
                    instruction,
                    resume,
                } => {
                    session
                        .cursor_mut()
                        .pause(hook.clone(), listener_id.clone(), resume);
                    return Ok(HookOutcome::NeedInput(instruction));
                }
                ListenerStep::Complete => {
                    if resuming {
                        session.cursor_mut().clear_pause();
                    }
                }
            }
        }

        Ok(HookOutcome::Complete)
    }

    fn eligible(&self, session: &Session, listener: &ListenerId) -> Result<bool, FatalError> {
        match listener {
            ListenerId::Role(role) => Ok(!session.living_players_with_role(role).is_empty()),
            ListenerId::Effect(effect) => {
                let status = StatusEffect::from_name(effect.as_str())
                    .ok_or_else(|| FatalError::UnknownEffect(effect.clone()))?;
                Ok(!session.living_players_with_status(status).is_empty())
            }
        }
    }
}

impl std::fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookDispatcher")
            .field("num_hooks", &self.order.len())
            .field("num_listeners", &self.impls.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
