//! Per-player derived state.
//!
//! Every field here is *derived*: it changes only when a log entry's apply
//! step requests it through the mutation gateway. The setters therefore
//! demand a [`GateKey`](super::kernel::GateKey), which only the kernel can
//! mint.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::kernel::GateKey;

// ============================================================================
// Identifiers
// ============================================================================

/// Stable identifier for one seat at the table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Identifier for a role, e.g. `"seer"` or `"werewolf"`.
///
/// The engine treats roles as opaque names; concrete role rules live in
/// listener implementations supplied by rule authors.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(String);

impl RoleId {
    /// Creates a role id from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The role name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Health & Status
// ============================================================================

/// A player's life state.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    /// Still in the game
    #[default]
    Alive,
    /// Eliminated
    Dead,
}

/// Status effects a player can carry.
///
/// The set is fixed so [`StatusFlags`] has stable bits across save/load;
/// the *rules* reacting to an effect are authored externally as effect
/// listeners keyed by the matching name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEffect {
    /// Will die unless cured
    Poisoned,
    /// Shielded from elimination tonight
    Protected,
    /// May not speak during the day
    Silenced,
    /// May not vote
    Shunned,
}

impl StatusEffect {
    /// All effects in bit order.
    pub const ALL: [Self; 4] = [
        Self::Poisoned,
        Self::Protected,
        Self::Silenced,
        Self::Shunned,
    ];

    /// The effect's bit in a [`StatusFlags`] value.
    #[must_use]
    pub const fn bit(self) -> u32 {
        match self {
            Self::Poisoned => 1,
            Self::Protected => 1 << 1,
            Self::Silenced => 1 << 2,
            Self::Shunned => 1 << 3,
        }
    }

    /// Stable name, matching the effect-listener id vocabulary.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Poisoned => "poisoned",
            Self::Protected => "protected",
            Self::Silenced => "silenced",
            Self::Shunned => "shunned",
        }
    }

    /// Resolves a stable name back to an effect.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }
}

impl fmt::Display for StatusEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bitset of active status effects.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StatusFlags(u32);

impl StatusFlags {
    /// No effects active.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns `true` if the effect is active.
    #[must_use]
    pub const fn contains(self, effect: StatusEffect) -> bool {
        self.0 & effect.bit() != 0
    }

    /// Returns `true` if no effect is active.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    const fn set(&mut self, effect: StatusEffect, active: bool) {
        if active {
            self.0 |= effect.bit();
        } else {
            self.0 &= !effect.bit();
        }
    }
}

// ============================================================================
// Player
// ============================================================================

/// One seat's derived state.
///
/// Fields are private; reads go through the getters and writes demand the
/// kernel's [`GateKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    seat: u32,
    role: Option<RoleId>,
    health: Health,
    status: StatusFlags,
}

impl Player {
    pub(super) const fn new(id: PlayerId, seat: u32) -> Self {
        Self {
            id,
            seat,
            role: None,
            health: Health::Alive,
            status: StatusFlags::empty(),
        }
    }

    /// The player's id.
    #[must_use]
    pub const fn id(&self) -> PlayerId {
        self.id
    }

    /// Seating order position (0-based).
    #[must_use]
    pub const fn seat(&self) -> u32 {
        self.seat
    }

    /// The player's assigned role, if any.
    #[must_use]
    pub const fn role(&self) -> Option<&RoleId> {
        self.role.as_ref()
    }

    /// The player's life state.
    #[must_use]
    pub const fn health(&self) -> Health {
        self.health
    }

    /// Returns `true` while the player is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health == Health::Alive
    }

    /// Active status effects.
    #[must_use]
    pub const fn status(&self) -> StatusFlags {
        self.status
    }

    /// Returns `true` if the given effect is active on this player.
    #[must_use]
    pub const fn has_status(&self, effect: StatusEffect) -> bool {
        self.status.contains(effect)
    }

    pub(super) fn set_role(&mut self, _key: &GateKey, role: RoleId) {
        self.role = Some(role);
    }

    pub(super) const fn set_health(&mut self, _key: &GateKey, health: Health) {
        self.health = health;
    }

    pub(super) const fn set_status(
        &mut self,
        _key: &GateKey,
        effect: StatusEffect,
        active: bool,
    ) {
        self.status.set(effect, active);
    }
}

/// Read-only projection of one player, handed out by session queries.
#[derive(Debug, Clone, Copy)]
pub struct PlayerView<'a> {
    inner: &'a Player,
}

impl<'a> PlayerView<'a> {
    pub(super) const fn new(inner: &'a Player) -> Self {
        Self { inner }
    }

    /// The player's id.
    #[must_use]
    pub const fn id(&self) -> PlayerId {
        self.inner.id()
    }

    /// Seating order position (0-based).
    #[must_use]
    pub const fn seat(&self) -> u32 {
        self.inner.seat()
    }

    /// The player's assigned role, if any.
    #[must_use]
    pub const fn role(&self) -> Option<&'a RoleId> {
        self.inner.role.as_ref()
    }

    /// The player's life state.
    #[must_use]
    pub const fn health(&self) -> Health {
        self.inner.health()
    }

    /// Returns `true` while the player is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    /// Returns `true` if the given effect is active.
    #[must_use]
    pub const fn has_status(&self, effect: StatusEffect) -> bool {
        self.inner.has_status(effect)
    }
}

// ============================================================================
// Tests
// ============================================================================
