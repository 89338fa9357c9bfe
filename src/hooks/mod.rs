//! Hook dispatch and listener state machines.
//!
//! A *hook* is a named extension point fired by a hook stage; an ordered
//! list of *listeners* runs under it. Listeners that need moderator input
//! pause the whole dispatch; the next input resumes the paused listener
//! exactly where it left off and then continues down the order.
//!
//! Listener logic is written as small state machines
//! ([`ListenerMachine`]) whose per-state stages declare where they are
//! allowed to pause, so a buggy stage cannot wedge a session in a state
//! no resume table covers.

pub mod dispatch;
pub mod listener;
pub mod registry;

pub use dispatch::{HookDispatcher, HookOutcome};
pub use listener::{
    EndSet, HookListener, HookProgram, ListenerId, ListenerMachine, ListenerStep, MachineStage,
    MachineState, StateToken, StepResult,
};
pub use registry::HookDispatcherBuilder;

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier for one hook extension point.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookId(String);

impl HookId {
    /// Creates a hook id from a name.
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

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for an effect-driven listener.
///
/// Must name a known status effect; the registry rejects anything else at
/// build time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectId(String);

impl EffectId {
    /// Creates an effect id from a name.
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

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
