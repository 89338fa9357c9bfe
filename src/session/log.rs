//! The append-only event log.
//!
//! A [`LogEntry`] is the immutable record of one non-deterministic event.
//! Entries are created by commands, pushed through the mutation gateway
//! exactly once, then appended forever. Replaying a session's entries from
//! an empty kernel reproduces its derived state exactly — the apply step
//! reads nothing but the entry itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FatalError;
use crate::flow::MainPhase;
use crate::hooks::ListenerId;

use super::kernel::Mutator;
use super::player::{Health, PlayerId, RoleId, StatusEffect};

// ============================================================================
// Events
// ============================================================================

/// Why a player left the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    /// Killed during the night
    NightKill,
    /// Eliminated by the day vote
    Vote,
    /// Succumbed to poison
    Poison,
    /// Removed by the moderator
    Moderator,
}

/// Type-specific payload of one log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEvent {
    /// A role was dealt to a player during setup
    RoleAssigned {
        /// Receiving player
        player: PlayerId,
        /// Assigned role
        role: RoleId,
    },
    /// A player was eliminated
    Eliminated {
        /// Eliminated player
        player: PlayerId,
        /// Why
        cause: DeathCause,
    },
    /// A status effect was applied or cleared
    StatusChanged {
        /// Affected player
        player: PlayerId,
        /// Which effect
        effect: StatusEffect,
        /// `true` to apply, `false` to clear
        active: bool,
    },
    /// The day vote concluded
    VoteOutcome {
        /// Eliminated player, if the vote carried
        eliminated: Option<PlayerId>,
        /// Number of votes on the outcome
        votes: u32,
    },
    /// The main phase changed
    PhaseChanged {
        /// Phase before
        from: MainPhase,
        /// Phase after
        to: MainPhase,
    },
    /// A raw night action, recorded for history but applying nothing itself
    NightAction {
        /// Acting listener
        listener: ListenerId,
        /// Targeted player, if any
        target: Option<PlayerId>,
        /// Listener-defined payload
        payload: serde_json::Value,
    },
    /// A raw day action, recorded for history but applying nothing itself
    DayAction {
        /// Acting listener
        listener: ListenerId,
        /// Targeted player, if any
        target: Option<PlayerId>,
        /// Listener-defined payload
        payload: serde_json::Value,
    },
}

// ============================================================================
// Entries
// ============================================================================

/// One immutable record in the session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Wall-clock time the entry was created
    pub timestamp: DateTime<Utc>,
    /// Turn number at (or caused by) this entry
    pub turn: u32,
    /// Main phase at the time of the event
    pub phase: MainPhase,
    /// Type-specific payload
    pub event: LogEvent,
}

impl LogEntry {
    /// Stamps a new entry with the current context.
    #[must_use]
    pub fn record(turn: u32, phase: MainPhase, event: LogEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            turn,
            phase,
            event,
        }
    }

    /// Pushes the entry through the mutation gateway.
    ///
    /// The entry may rewrite itself before being appended — a phase change
    /// records the turn number it *caused*, not the one it was created
    /// under. The apply step is deterministic: it reads only the entry.
    ///
    /// # Errors
    ///
    /// [`FatalError::UnknownPlayer`] if the entry references a player the
    /// kernel does not hold; no mutation is committed in that case.
    pub(super) fn apply(mut self, m: &mut Mutator<'_>) -> Result<Self, FatalError> {
        match &self.event {
            LogEvent::RoleAssigned { player, role } => {
                m.set_role(*player, role.clone())?;
            }
            LogEvent::Eliminated { player, .. } => {
                m.set_health(*player, Health::Dead)?;
            }
            LogEvent::StatusChanged {
                player,
                effect,
                active,
            } => {
                m.set_status(*player, *effect, *active)?;
            }
            LogEvent::VoteOutcome {
                eliminated: Some(player),
                ..
            } => {
                m.set_health(*player, Health::Dead)?;
            }
            LogEvent::PhaseChanged { to, .. } => {
                self.turn = m.set_phase(*to);
            }
            LogEvent::VoteOutcome {
                eliminated: None, ..
            }
            | LogEvent::NightAction { .. }
            | LogEvent::DayAction { .. } => {}
        }
        Ok(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
