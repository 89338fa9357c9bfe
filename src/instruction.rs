//! Moderator-facing instructions and response validation.
//!
//! The engine never speaks to players directly: every halt produces an
//! [`Instruction`] telling the moderator what to do at the table and what
//! shape of answer to bring back. [`validate_response`] shape-checks that
//! answer *before* the router runs, so a malformed response can never touch
//! session state.

use serde::{Deserialize, Serialize};

use crate::error::Rejection;
use crate::session::{PlayerId, Session};

// ============================================================================
// Instructions
// ============================================================================

/// The shape of answer an instruction expects back from the moderator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseShape {
    /// A bare acknowledgement that the step was performed
    Ack,
    /// Exactly one living player
    OnePlayer,
    /// Between `min` and `max` living players
    Players {
        /// Minimum selection size
        min: usize,
        /// Maximum selection size
        max: usize,
    },
    /// One of a fixed list of options
    Choice {
        /// The offered options
        options: Vec<String>,
    },
    /// A yes/no answer
    YesNo,
}

impl ResponseShape {
    /// Short label used in rejection messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ack => "ack",
            Self::OnePlayer => "one-player",
            Self::Players { .. } => "players",
            Self::Choice { .. } => "choice",
            Self::YesNo => "yes-no",
        }
    }
}

/// A single outbound instruction to the moderator.
///
/// The prompt text is authored by the rule layer; the engine only carries
/// it. At most one instruction is pending per session at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Prompt text for the moderator (authored externally)
    pub prompt: String,
    /// Shape of the answer this instruction expects
    pub expects: ResponseShape,
    /// Players the instruction concerns, if any (e.g. who to wake up)
    pub targets: Vec<PlayerId>,
}

impl Instruction {
    /// An instruction expecting a bare acknowledgement.
    #[must_use]
    pub fn ack(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            expects: ResponseShape::Ack,
            targets: Vec::new(),
        }
    }

    /// An instruction expecting exactly one living player.
    #[must_use]
    pub fn one_player(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            expects: ResponseShape::OnePlayer,
            targets: Vec::new(),
        }
    }

    /// An instruction expecting between `min` and `max` living players.
    #[must_use]
    pub fn players(prompt: impl Into<String>, min: usize, max: usize) -> Self {
        Self {
            prompt: prompt.into(),
            expects: ResponseShape::Players { min, max },
            targets: Vec::new(),
        }
    }

    /// An instruction expecting one of the given options.
    #[must_use]
    pub fn choice(prompt: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            prompt: prompt.into(),
            expects: ResponseShape::Choice { options },
            targets: Vec::new(),
        }
    }

    /// An instruction expecting a yes/no answer.
    #[must_use]
    pub fn yes_no(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            expects: ResponseShape::YesNo,
            targets: Vec::new(),
        }
    }

    /// Attaches the players this instruction concerns.
    #[must_use]
    pub fn with_targets(mut self, targets: Vec<PlayerId>) -> Self {
        self.targets = targets;
        self
    }
}

// ============================================================================
// Moderator Input
// ============================================================================

/// One discrete moderator answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModeratorInput {
    /// Acknowledgement
    Ack,
    /// A single player
    Player(PlayerId),
    /// A set of players
    Players(Vec<PlayerId>),
    /// A named choice
    Choice(String),
    /// A yes/no answer
    YesNo(bool),
}

impl ModeratorInput {
    /// Short label used in rejection messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ack => "ack",
            Self::Player(_) => "one-player",
            Self::Players(_) => "players",
            Self::Choice(_) => "choice",
            Self::YesNo(_) => "yes-no",
        }
    }
}

/// Single-consumption carrier for the moderator input threaded through one
/// router pass.
///
/// Exactly one component may [`take`](Self::take) the input; everything
/// downstream of the consumer sees an empty slot. This is what lets the
/// router re-enter a new phase manager after a silent cross-phase
/// transition "with the same input" when nothing in the old phase wanted it.
#[derive(Debug, Default)]
pub struct InputSlot(Option<ModeratorInput>);

impl InputSlot {
    /// Wraps an optional input.
    #[must_use]
    pub const fn new(input: Option<ModeratorInput>) -> Self {
        Self(input)
    }

    /// An empty slot.
    #[must_use]
    pub const fn empty() -> Self {
        Self(None)
    }

    /// Consumes and returns the input, leaving the slot empty.
    pub const fn take(&mut self) -> Option<ModeratorInput> {
        self.0.take()
    }

    /// Returns `true` if the input has been consumed (or never existed).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

// ============================================================================
// Response Validation
// ============================================================================

/// Shape-checks a moderator response against the session's pending
/// instruction.
///
/// Runs *before* the router and never mutates the session: on mismatch the
/// pending instruction is untouched and the caller may resubmit.
///
/// # Errors
///
/// Returns a [`Rejection`] describing the mismatch.
pub fn validate_response(session: &Session, input: &ModeratorInput) -> Result<(), Rejection> {
    let Some(pending) = session.pending_instruction() else {
        return Err(Rejection::NoPendingInstruction);
    };

    match (&pending.expects, input) {
        (ResponseShape::Ack, ModeratorInput::Ack)
        | (ResponseShape::YesNo, ModeratorInput::YesNo(_)) => Ok(()),
        (ResponseShape::OnePlayer, ModeratorInput::Player(id)) => {
            check_living(session, *id)
        }
        (ResponseShape::Players { min, max }, ModeratorInput::Players(ids)) => {
            if ids.len() < *min || ids.len() > *max {
                return Err(Rejection::SelectionCount {
                    min: *min,
                    max: *max,
                    got: ids.len(),
                });
            }
            for id in ids {
                check_living(session, *id)?;
            }
            Ok(())
        }
        (ResponseShape::Choice { options }, ModeratorInput::Choice(choice)) => {
            if options.iter().any(|o| o == choice) {
                Ok(())
            } else {
                Err(Rejection::ChoiceNotOffered {
                    got: choice.clone(),
                })
            }
        }
        (expected, got) => Err(Rejection::ShapeMismatch {
            expected: expected.label().to_string(),
            got: got.label().to_string(),
        }),
    }
}

fn check_living(session: &Session, id: PlayerId) -> Result<(), Rejection> {
    let Some(view) = session.try_player(id) else {
        return Err(Rejection::UnknownPlayer(id));
    };
    if view.is_alive() {
        Ok(())
    } else {
        Err(Rejection::DeadPlayer(id))
    }
}

// ============================================================================
// Tests
// ============================================================================
