//! Error types for `Nocturne`
//!
//! Two taxonomies with very different audiences:
//!
//! - [`FatalError`] — authoring or engine-invariant violations. These abort
//!   the in-flight operation before any cache mutation and indicate a bug
//!   in the static phase/hook tables, not bad moderator input.
//! - [`Rejection`] — a moderator response whose shape does not match the
//!   pending instruction. Raised before the router runs; session state and
//!   the pending instruction are unchanged and the caller may resubmit.

use thiserror::Error;

use crate::flow::{MainPhase, StageId, SubPhaseId};
use crate::hooks::{EffectId, HookId, ListenerId};
use crate::session::PlayerId;

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `Nocturne` operations.
///
/// Aggregates both taxonomies plus serialization failures so embedders
/// can hold a single error type at their boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Authoring or engine-invariant violation
    #[error(transparent)]
    Fatal(#[from] FatalError),

    /// Recoverable moderator-input rejection
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// JSON serialization error during persistence
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Returns `true` if the error is recoverable by resubmitting input.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

// ============================================================================
// Fatal Errors
// ============================================================================

/// Authoring or engine-invariant violations.
///
/// None of these are intended to be caught by rule authors; every variant
/// points at a miswired static table or a broken engine invariant. They are
/// raised before the offending mutation is committed.
#[derive(Debug, Error)]
pub enum FatalError {
    /// No phase manager is registered for the session's current main phase
    #[error("no phase manager registered for main phase '{0}'")]
    UnknownPhase(MainPhase),

    /// A second phase manager claimed an already-registered main phase
    #[error("duplicate phase manager for main phase '{0}'")]
    DuplicatePhase(MainPhase),

    /// The cached sub-phase has no manager under the current main phase
    #[error("unknown sub-phase '{sub}' under main phase '{phase}'")]
    UnknownSubPhase {
        /// Main phase whose table was consulted
        phase: MainPhase,
        /// The sub-phase id that failed to resolve
        sub: SubPhaseId,
    },

    /// Two sub-phase managers under one phase share an id
    #[error("duplicate sub-phase '{sub}' under main phase '{phase}'")]
    DuplicateSubPhase {
        /// Main phase owning the colliding table
        phase: MainPhase,
        /// The colliding sub-phase id
        sub: SubPhaseId,
    },

    /// Two stages in one sub-phase share an id
    #[error("duplicate stage '{stage}' in sub-phase '{sub}'")]
    DuplicateStage {
        /// Sub-phase owning the colliding stage list
        sub: SubPhaseId,
        /// The colliding stage id
        stage: StageId,
    },

    /// A sub-phase's final stage is not a navigation stage
    #[error("sub-phase '{sub}' does not terminate in a navigation stage")]
    MissingNavigation {
        /// The offending sub-phase
        sub: SubPhaseId,
    },

    /// Every stage of a sub-phase is already marked entered
    #[error("sub-phase '{sub}' ran out of stages without navigating")]
    StageExhausted {
        /// The offending sub-phase
        sub: SubPhaseId,
    },

    /// A stage produced a transition outside its sub-phase's allow-set
    #[error("sub-phase '{sub}' produced undeclared transition to '{dest}'")]
    UndeclaredTransition {
        /// Sub-phase whose allow-set was violated
        sub: SubPhaseId,
        /// Destination (sub-phase or main phase) that was not declared
        dest: String,
    },

    /// No listener order is registered for a fired hook
    #[error("no listener order registered for hook '{0}'")]
    UnknownHook(HookId),

    /// A hook was registered twice
    #[error("duplicate hook registration for '{0}'")]
    DuplicateHook(HookId),

    /// A listener id has no registered implementation
    #[error("no implementation registered for listener '{0}'")]
    UnknownListener(ListenerId),

    /// A listener id was registered twice, or appears twice in one hook order
    #[error("duplicate listener registration for '{0}'")]
    DuplicateListener(ListenerId),

    /// An effect listener names a status effect the engine does not know
    #[error("effect listener '{0}' does not name a known status effect")]
    UnknownEffect(EffectId),

    /// The cursor names a paused listener absent from the hook's order
    #[error("paused listener '{listener}' is not in the order for hook '{hook}'")]
    PausedListenerMissing {
        /// Hook being fired
        hook: HookId,
        /// Listener the cursor claims is paused
        listener: ListenerId,
    },

    /// A listener was dispatched on a hook it declared no program for
    #[error("listener '{listener}' has no program for hook '{hook}'")]
    MissingProgram {
        /// Hook being fired
        hook: HookId,
        /// Listener with the missing program
        listener: ListenerId,
    },

    /// The persisted internal-state token did not decode, or decoded to a
    /// state with no resume stage
    #[error("listener '{listener}' holds unresolvable state token '{token}'")]
    UnknownListenerState {
        /// Listener owning the state
        listener: ListenerId,
        /// The token that failed to resolve
        token: String,
    },

    /// A listener stage paused on a state outside its declared end-set
    #[error(
        "listener '{listener}' landed on '{landed}', outside the declared \
         end-set of its stage for state '{from}'"
    )]
    EndStateViolation {
        /// Listener whose declaration was violated
        listener: ListenerId,
        /// State the stage was entered with (`<initial>` for first activation)
        from: String,
        /// State the stage tried to land on
        landed: String,
    },

    /// An advancing stage paused without changing state
    #[error("listener '{listener}' failed to advance out of state '{from}'")]
    ListenerStalled {
        /// Listener that stalled
        listener: ListenerId,
        /// State it failed to leave
        from: String,
    },

    /// An idling stage changed state
    #[error("idling stage of listener '{listener}' advanced from '{from}' to '{to}'")]
    IdleStageAdvanced {
        /// Listener whose idling stage advanced
        listener: ListenerId,
        /// State before the step
        from: String,
        /// State it illegally moved to
        to: String,
    },

    /// A log entry's apply step referenced a player the kernel does not hold.
    /// Callers are expected to have validated ids before creating entries.
    #[error("unknown player id '{0}'")]
    UnknownPlayer(PlayerId),

    /// The router exceeded its silent cross-phase re-entry budget
    #[error("router exceeded {budget} silent phase re-entries (last phase '{phase}')")]
    RouterLoop {
        /// Phase the router was about to re-enter when the budget ran out
        phase: MainPhase,
        /// The configured budget
        budget: u32,
    },

    /// A phase's sub-phases silently cycled past the transition budget
    #[error("phase '{phase}' exceeded {budget} silent sub-phase transitions in one pass")]
    SubPhaseLoop {
        /// The cycling phase
        phase: MainPhase,
        /// The configured budget
        budget: u32,
    },

    /// A phase manager pass produced neither an instruction nor a phase change
    #[error("phase manager for '{phase}' yielded neither instruction nor transition")]
    FlowStalled {
        /// The stalled phase
        phase: MainPhase,
    },
}

// ============================================================================
// Rejections
// ============================================================================

/// Recoverable rejection of a moderator response.
///
/// Raised by [`validate_response`](crate::instruction::validate_response)
/// before the router is invoked; the session is untouched and the caller
/// may retry with corrected input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The session has no pending instruction to answer
    #[error("no instruction is pending for this session")]
    NoPendingInstruction,

    /// Response shape does not match the pending instruction's expectation
    #[error("response shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Shape the pending instruction expects
        expected: String,
        /// Shape the response actually carried
        got: String,
    },

    /// A referenced player does not exist in this session
    #[error("player '{0}' does not exist in this session")]
    UnknownPlayer(PlayerId),

    /// A referenced player is dead
    #[error("player '{0}' is dead")]
    DeadPlayer(PlayerId),

    /// A choice answer is not among the offered options
    #[error("'{got}' is not one of the offered choices")]
    ChoiceNotOffered {
        /// The rejected choice
        got: String,
    },

    /// A multi-player selection is outside the instruction's count bounds
    #[error("expected between {min} and {max} players, got {got}")]
    SelectionCount {
        /// Minimum selection size
        min: usize,
        /// Maximum selection size
        max: usize,
        /// Size actually supplied
        got: usize,
    },
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `Nocturne` operations.
pub type Result<T> = std::result::Result<T, EngineError>;

// ============================================================================
// Tests
// ============================================================================
