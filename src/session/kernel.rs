//! The session kernel and its mutation gateway.
//!
//! [`Session`] owns the players, the append-only log, the flow cursor, and
//! the single pending instruction. Derived state changes **iff** some log
//! entry's apply step requested it: [`Session::append_and_apply`] is the
//! only path in, and the apply step receives a [`Mutator`] — an opaque
//! handle over a fixed set of semantic operations, constructible nowhere
//! else. The [`GateKey`] it carries is the unforgeable capability demanded
//! by every setter on player internals.

use std::fmt;
use std::ops::RangeBounds;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::FatalError;
use crate::flow::MainPhase;
use crate::instruction::Instruction;

use super::cursor::FlowCursor;
use super::log::{LogEntry, LogEvent};
use super::player::{Health, Player, PlayerId, PlayerView, RoleId, StatusEffect};

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for one game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh session id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// Capability Key
// ============================================================================

/// Unforgeable capability demanded by every mutating method on player and
/// kernel internals.
///
/// The private field makes construction possible only inside this module;
/// holding a `&GateKey` is proof the call originated from a log entry's
/// apply step.
pub struct GateKey(());

// ============================================================================
// Mutation Gateway
// ============================================================================

/// Opaque mutator handle passed to a log entry's apply step.
///
/// Exposes exactly the semantic operations an entry may request — nothing
/// reaches raw storage. Constructible only by the kernel.
pub struct Mutator<'a> {
    key: GateKey,
    players: &'a mut Vec<Player>,
    cursor: &'a mut FlowCursor,
    turn: &'a mut u32,
}

impl Mutator<'_> {
    /// Sets a player's life state.
    ///
    /// # Errors
    ///
    /// [`FatalError::UnknownPlayer`] if the id is not in this session.
    pub fn set_health(&mut self, id: PlayerId, health: Health) -> Result<(), FatalError> {
        player_slot(self.players, id)?.set_health(&self.key, health);
        Ok(())
    }

    /// Assigns a player's role.
    ///
    /// # Errors
    ///
    /// [`FatalError::UnknownPlayer`] if the id is not in this session.
    pub fn set_role(&mut self, id: PlayerId, role: RoleId) -> Result<(), FatalError> {
        player_slot(self.players, id)?.set_role(&self.key, role);
        Ok(())
    }

    /// Applies or clears a status effect on a player.
    ///
    /// # Errors
    ///
    /// [`FatalError::UnknownPlayer`] if the id is not in this session.
    pub fn set_status(
        &mut self,
        id: PlayerId,
        effect: StatusEffect,
        active: bool,
    ) -> Result<(), FatalError> {
        player_slot(self.players, id)?.set_status(&self.key, effect, active);
        Ok(())
    }

    /// Crosses a main-phase boundary and returns the (possibly advanced)
    /// turn number.
    ///
    /// Entering night begins a new turn. The cursor's transient fields are
    /// unconditionally cleared.
    pub fn set_phase(&mut self, to: MainPhase) -> u32 {
        let from = self.cursor.phase();
        if to == MainPhase::Night {
            *self.turn += 1;
        }
        self.cursor.enter_main_phase(to);
        info!(%from, %to, turn = *self.turn, "main phase transition");
        *self.turn
    }
}

// Free function so the setters can borrow `players` and `key` as disjoint
// fields in one expression.
fn player_slot(players: &mut [Player], id: PlayerId) -> Result<&mut Player, FatalError> {
    players
        .iter_mut()
        .find(|p| p.id() == id)
        .ok_or(FatalError::UnknownPlayer(id))
}

// ============================================================================
// Session
// ============================================================================

/// The kernel for one game.
///
/// Created once per game, mutated only through the gateway, serializable
/// wholesale: log, players, cursor and pending instruction round-trip
/// through storage and resume at the exact paused point.
#[derive(Debug, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    players: Vec<Player>,
    log: Vec<LogEntry>,
    cursor: FlowCursor,
    pending: Option<Instruction>,
    turn: u32,
}

impl Session {
    /// Creates a fresh session with the given players in seating order.
    ///
    /// The game opens on night 1 with no sub-phase entered.
    #[must_use]
    pub fn new(seating: Vec<PlayerId>) -> Self {
        let players = seating
            .into_iter()
            .enumerate()
            .map(|(seat, id)| Player::new(id, u32::try_from(seat).unwrap_or(u32::MAX)))
            .collect();
        Self {
            id: SessionId::generate(),
            players,
            log: Vec::new(),
            cursor: FlowCursor::new(MainPhase::Night),
            pending: None,
            turn: 1,
        }
    }

    /// This session's id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Current main phase.
    #[must_use]
    pub const fn phase(&self) -> MainPhase {
        self.cursor.phase()
    }

    /// Current turn number (a turn spans one night and the following day).
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// The flow cursor (read-only).
    #[must_use]
    pub const fn cursor(&self) -> &FlowCursor {
        &self.cursor
    }

    pub(crate) const fn cursor_mut(&mut self) -> &mut FlowCursor {
        &mut self.cursor
    }

    /// The full event log, oldest first.
    #[must_use]
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// The single pending outbound instruction, if any.
    #[must_use]
    pub const fn pending_instruction(&self) -> Option<&Instruction> {
        self.pending.as_ref()
    }

    pub(crate) fn set_pending(&mut self, instruction: Instruction) {
        self.pending = Some(instruction);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Looks up a player.
    ///
    /// # Errors
    ///
    /// [`FatalError::UnknownPlayer`] — callers are expected to have
    /// validated ids already; an unknown id here is an engine bug.
    pub fn player(&self, id: PlayerId) -> Result<PlayerView<'_>, FatalError> {
        self.try_player(id).ok_or(FatalError::UnknownPlayer(id))
    }

    /// Looks up a player, returning `None` for unknown ids.
    #[must_use]
    pub fn try_player(&self, id: PlayerId) -> Option<PlayerView<'_>> {
        self.players
            .iter()
            .find(|p| p.id() == id)
            .map(PlayerView::new)
    }

    /// All players in seating order.
    pub fn players(&self) -> impl Iterator<Item = PlayerView<'_>> {
        self.players.iter().map(PlayerView::new)
    }

    /// Living players in seating order.
    pub fn living_players(&self) -> impl Iterator<Item = PlayerView<'_>> {
        self.players().filter(PlayerView::is_alive)
    }

    /// Living players holding the given role.
    #[must_use]
    pub fn living_players_with_role(&self, role: &RoleId) -> Vec<PlayerId> {
        self.living_players()
            .filter(|p| p.role() == Some(role))
            .map(|p| p.id())
            .collect()
    }

    /// Living players carrying the given status effect.
    #[must_use]
    pub fn living_players_with_status(&self, effect: StatusEffect) -> Vec<PlayerId> {
        self.living_players()
            .filter(|p| p.has_status(effect))
            .map(|p| p.id())
            .collect()
    }

    /// Distinct roles currently dealt, in seating order of first holder.
    #[must_use]
    pub fn roles_in_play(&self) -> Vec<RoleId> {
        let mut roles: Vec<RoleId> = Vec::new();
        for player in &self.players {
            if let Some(role) = player.role() {
                if !roles.contains(role) {
                    roles.push(role.clone());
                }
            }
        }
        roles
    }

    /// Filters log entries by turn range, phase, and an event predicate.
    #[must_use]
    pub fn find_entries<R, P>(
        &self,
        turns: R,
        phase: Option<MainPhase>,
        predicate: P,
    ) -> Vec<&LogEntry>
    where
        R: RangeBounds<u32>,
        P: Fn(&LogEvent) -> bool,
    {
        self.log
            .iter()
            .filter(|e| turns.contains(&e.turn))
            .filter(|e| phase.is_none_or(|p| p == e.phase))
            .filter(|e| predicate(&e.event))
            .collect()
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Atomically records and applies one event.
    ///
    /// The factory builds the event from current session context; the
    /// kernel stamps it into a [`LogEntry`], pushes it through the
    /// gateway (where it may rewrite itself), and appends the final form.
    /// No partial application is observable: apply steps validate before
    /// mutating, and a failed entry is never appended.
    ///
    /// # Errors
    ///
    /// Propagates [`FatalError`] from the apply step.
    pub fn append_and_apply<F>(&mut self, factory: F) -> Result<(), FatalError>
    where
        F: FnOnce(&Self) -> LogEvent,
    {
        let event = factory(self);
        let entry = LogEntry::record(self.turn, self.cursor.phase(), event);
        self.apply_entry(entry)
    }

    fn apply_entry(&mut self, entry: LogEntry) -> Result<(), FatalError> {
        let mut mutator = Mutator {
            key: GateKey(()),
            players: &mut self.players,
            cursor: &mut self.cursor,
            turn: &mut self.turn,
        };
        let entry = entry.apply(&mut mutator)?;
        debug!(turn = entry.turn, phase = %entry.phase, "log entry applied");
        self.log.push(entry);
        Ok(())
    }

    /// Rebuilds a kernel by replaying an entry sequence from scratch.
    ///
    /// Given the same seating and the same entries a live session
    /// produced, the replayed kernel's derived state (player fields,
    /// phase, turn) is identical to the live one.
    ///
    /// # Errors
    ///
    /// Propagates [`FatalError`] from any entry's apply step.
    pub fn replay(seating: Vec<PlayerId>, entries: Vec<LogEntry>) -> Result<Self, FatalError> {
        let mut session = Self::new(seating);
        for entry in entries {
            session.apply_entry(entry)?;
        }
        Ok(session)
    }
}

// ============================================================================
// Tests
// ============================================================================
