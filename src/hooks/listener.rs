//! Listener state machines.
//!
//! A listener's multi-step logic is modelled as a tiny state machine over a
//! listener-private state enum. Each state maps to one [`MachineStage`]
//! that either finishes the listener's work or pauses with an instruction
//! and the state to resume from. Pause states are persisted on the cursor
//! as opaque [`StateToken`]s, so a session can be serialized mid-question
//! and resumed in another process.
//!
//! Every stage declares up front where it may pause ([`EndSet`]), and the
//! machine enforces the declaration at runtime: an advancing stage must
//! leave its entry state and land inside the declared set, an idling stage
//! must stay put. Either violation is a [`FatalError`], raised before the
//! bad state reaches the cursor.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::FatalError;
use crate::instruction::{InputSlot, Instruction};
use crate::session::{RoleId, Session};

use super::{EffectId, HookId};

// ============================================================================
// Listener Identity
// ============================================================================

/// Identity of one hook listener.
///
/// Role listeners run while a living player holds the role; effect
/// listeners run while a living player carries the status effect.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ListenerId {
    /// Driven by a role being in play
    Role(RoleId),
    /// Driven by a status effect being present
    Effect(EffectId),
}

impl ListenerId {
    /// A role-driven listener id.
    #[must_use]
    pub fn role(name: impl Into<String>) -> Self {
        Self::Role(RoleId::new(name))
    }

    /// An effect-driven listener id.
    #[must_use]
    pub fn effect(name: impl Into<String>) -> Self {
        Self::Effect(EffectId::new(name))
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role(role) => write!(f, "role:{}", role.as_str()),
            Self::Effect(effect) => write!(f, "effect:{}", effect.as_str()),
        }
    }
}

// ============================================================================
// State Tokens
// ============================================================================

/// Opaque, serializable encoding of a listener's internal state.
///
/// Only the owning listener interprets the token; the engine just stores
/// and returns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateToken(String);

impl StateToken {
    /// Wraps an encoded state name.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A listener-private state enum, convertible to and from [`StateToken`]s.
pub trait MachineState: Copy + Eq + Hash + Send + Sync + 'static {
    /// Stable string encoding of this state.
    fn encode(self) -> &'static str;

    /// Decodes a token produced by [`encode`](Self::encode).
    fn decode(token: &str) -> Option<Self>;
}

// ============================================================================
// Listener Trait
// ============================================================================

/// One step of a listener: either everything is done, or the listener
/// pauses awaiting input.
#[derive(Debug)]
pub enum ListenerStep {
    /// Pause the dispatch; resume this listener with the given state once
    /// the instruction is answered
    NeedInput {
        /// The instruction to relay to the moderator
        instruction: Instruction,
        /// Encoded state to resume from
        resume: StateToken,
    },
    /// This listener's work under the hook is finished
    Complete,
}

/// A hook listener implementation.
///
/// Most listeners should be a [`ListenerMachine`] rather than a hand-rolled
/// impl; the machine enforces the end-set declarations uniformly.
pub trait HookListener: Send + Sync {
    /// The listener's identity, used for ordering and eligibility.
    fn id(&self) -> &ListenerId;

    /// Runs one step.
    ///
    /// `state` is `None` on first activation under the hook and the
    /// previously returned resume token afterwards.
    ///
    /// # Errors
    ///
    /// Propagates [`FatalError`] from kernel commands or enforcement.
    fn step(
        &self,
        session: &mut Session,
        hook: &HookId,
        state: Option<&StateToken>,
        input: &mut InputSlot,
    ) -> Result<ListenerStep, FatalError>;
}

// ============================================================================
// Machine Stages
// ============================================================================

/// Result of running one machine stage, in terms of the typed state enum.
#[derive(Debug)]
pub enum StepResult<S> {
    /// Pause with an instruction; resume in state `next`
    NeedInput {
        /// The instruction to relay to the moderator
        instruction: Instruction,
        /// Typed state to resume from
        next: S,
    },
    /// The listener is finished under this hook
    Done,
}

type StageFn<S> =
    Box<dyn Fn(&mut Session, &mut InputSlot) -> Result<StepResult<S>, FatalError> + Send + Sync>;

/// Where a stage is allowed to pause.
pub enum EndSet<S> {
    /// The stage must leave its entry state and land in this set
    Advance(HashSet<S>),
    /// The stage may pause only on its entry state (e.g. re-asking after
    /// an unusable answer)
    Idle,
}

/// One stage of a listener machine: the work plus its pause declaration.
pub struct MachineStage<S> {
    run: StageFn<S>,
    ends: EndSet<S>,
}

impl<S: MachineState> MachineStage<S> {
    /// A stage that must advance into one of `ends` when it pauses.
    #[must_use]
    pub fn advance<F>(ends: impl IntoIterator<Item = S>, run: F) -> Self
    where
        F: Fn(&mut Session, &mut InputSlot) -> Result<StepResult<S>, FatalError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            run: Box::new(run),
            ends: EndSet::Advance(ends.into_iter().collect()),
        }
    }

    /// A stage that may pause only on its entry state.
    #[must_use]
    pub fn idle<F>(run: F) -> Self
    where
        F: Fn(&mut Session, &mut InputSlot) -> Result<StepResult<S>, FatalError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            run: Box::new(run),
            ends: EndSet::Idle,
        }
    }
}

impl<S> fmt::Debug for MachineStage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ends = match &self.ends {
            EndSet::Advance(set) => format!("Advance({})", set.len()),
            EndSet::Idle => "Idle".to_string(),
        };
        f.debug_struct("MachineStage").field("ends", &ends).finish()
    }
}

/// A listener's program for one hook: the initial stage plus a resume
/// stage per pause state.
pub struct HookProgram<S> {
    initial: MachineStage<S>,
    resume: HashMap<S, MachineStage<S>>,
}

impl<S: MachineState> HookProgram<S> {
    /// A program whose first activation runs `initial`.
    #[must_use]
    pub fn new(initial: MachineStage<S>) -> Self {
        Self {
            initial,
            resume: HashMap::new(),
        }
    }

    /// Adds the resume stage for `state`.
    #[must_use]
    pub fn on(mut self, state: S, stage: MachineStage<S>) -> Self {
        self.resume.insert(state, stage);
        self
    }
}

impl<S> fmt::Debug for HookProgram<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookProgram")
            .field("num_resume_states", &self.resume.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Listener Machine
// ============================================================================

/// Marker used for the initial activation in enforcement errors.
const INITIAL: &str = "<initial>";

/// A [`HookListener`] built from per-hook [`HookProgram`]s over one state
/// enum.
pub struct ListenerMachine<S> {
    id: ListenerId,
    programs: HashMap<HookId, HookProgram<S>>,
}

impl<S: MachineState> ListenerMachine<S> {
    /// An empty machine for the given listener.
    #[must_use]
    pub fn new(id: ListenerId) -> Self {
        Self {
            id,
            programs: HashMap::new(),
        }
    }

    /// Registers this machine's program for `hook`.
    #[must_use]
    pub fn program(mut self, hook: HookId, program: HookProgram<S>) -> Self {
        self.programs.insert(hook, program);
        self
    }

    fn bad_state(&self, token: &str) -> FatalError {
        FatalError::UnknownListenerState {
            listener: self.id.clone(),
            token: token.to_string(),
        }
    }
}

impl<S: MachineState> HookListener for ListenerMachine<S> {
    fn id(&self) -> &ListenerId {
        &self.id
    }

    fn step(
        &self,
        session: &mut Session,
        hook: &HookId,
        state: Option<&StateToken>,
        input: &mut InputSlot,
    ) -> Result<ListenerStep, FatalError> {
        let program = self
            .programs
            .get(hook)
            .ok_or_else(|| FatalError::MissingProgram {
                hook: hook.clone(),
                listener: self.id.clone(),
            })?;

        let (from, stage) = match state {
            None => (None, &program.initial),
            Some(token) => {
                let decoded =
                    S::decode(token.as_str()).ok_or_else(|| self.bad_state(token.as_str()))?;
                let stage = program
                    .resume
                    .get(&decoded)
                    .ok_or_else(|| self.bad_state(token.as_str()))?;
                (Some(decoded), stage)
            }
        };

        match (stage.run)(session, input)? {
            StepResult::Done => Ok(ListenerStep::Complete),
            StepResult::NeedInput { instruction, next } => {
                let from_label = from.map_or(INITIAL, MachineState::encode);
                match &stage.ends {
                    EndSet::Advance(ends) => {
                        if from == Some(next) {
                            return Err(FatalError::ListenerStalled {
                                listener: self.id.clone(),
                                from: from_label.to_string(),
                            });
                        }
                        if !ends.contains(&next) {
                            return Err(FatalError::EndStateViolation {
                                listener: self.id.clone(),
                                from: from_label.to_string(),
                                landed: next.encode().to_string(),
                            });
                        }
                    }
                    EndSet::Idle => {
                        if from != Some(next) {
                            return Err(FatalError::IdleStageAdvanced {
                                listener: self.id.clone(),
                                from: from_label.to_string(),
                                to: next.encode().to_string(),
                            });
                        }
                    }
                }
                // A pause state with no resume stage would wedge the
                // session on the next input; refuse it now.
                if !program.resume.contains_key(&next) {
                    return Err(self.bad_state(next.encode()));
                }
                Ok(ListenerStep::NeedInput {
                    instruction,
                    resume: StateToken::new(next.encode()),
                })
            }
        }
    }
}

impl<S> fmt::Debug for ListenerMachine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerMachine")
            .field("id", &self.id)
            .field("num_programs", &self.programs.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::ModeratorInput;
    use crate::session::PlayerId;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum PickState {
        Picking,
        Confirming,
    }

    impl MachineState for PickState {
        fn encode(self) -> &'static str {
            match self {
                Self::Picking => "picking",
                Self::Confirming => "confirming",
            }
        }

        fn decode(token: &str) -> Option<Self> {
            match token {
                "picking" => Some(Self::Picking),
                "confirming" => Some(Self::Confirming),
                _ => None,
            }
        }
    }

    fn hook() -> HookId {
        HookId::new("night_actions")
    }

    fn two_step_machine() -> ListenerMachine<PickState> {
        ListenerMachine::new(ListenerId::role("seer")).program(
            hook(),
            HookProgram::new(MachineStage::advance([PickState::Picking], |_s, _i| {
                Ok(StepResult::NeedInput {
                    instruction: Instruction::one_player("seer picks"),
                    next: PickState::Picking,
                })
            }))
            .on(
                PickState::Picking,
                MachineStage::advance([], |_s, input: &mut InputSlot| {
                    input.take();
                    Ok(StepResult::Done)
                }),
            ),
        )
    }

    #[test]
    fn listener_id_display() {
        assert_eq!(ListenerId::role("seer").to_string(), "role:seer");
        assert_eq!(ListenerId::effect("poisoned").to_string(), "effect:poisoned");
    }

    #[test]
    fn pause_and_resume() {
        let machine = two_step_machine();
        let mut session = Session::new(vec![PlayerId(1)]);

        let step = machine
            .step(&mut session, &hook(), None, &mut InputSlot::empty())
            .unwrap();
        let ListenerStep::NeedInput { resume, .. } = step else {
            panic!("expected a pause");
        };
        assert_eq!(resume, StateToken::new("picking"));

        let mut input = InputSlot::new(Some(ModeratorInput::Player(PlayerId(1))));
        let step = machine
            .step(&mut session, &hook(), Some(&resume), &mut input)
            .unwrap();
        assert!(matches!(step, ListenerStep::Complete));
        assert!(input.is_empty());
    }

    #[test]
    fn missing_program_is_fatal() {
        let machine = two_step_machine();
        let mut session = Session::new(vec![PlayerId(1)]);
        let err = machine
            .step(
                &mut session,
                &HookId::new("dawn"),
                None,
                &mut InputSlot::empty(),
            )
            .unwrap_err();
        assert!(matches!(err, FatalError::MissingProgram { .. }));
    }

    #[test]
    fn garbage_token_is_fatal() {
        let machine = two_step_machine();
        let mut session = Session::new(vec![PlayerId(1)]);
        let err = machine
            .step(
                &mut session,
                &hook(),
                Some(&StateToken::new("daydreaming")),
                &mut InputSlot::empty(),
            )
            .unwrap_err();
        assert!(matches!(err, FatalError::UnknownListenerState { .. }));
    }

    #[test]
    fn landing_outside_end_set_is_fatal() {
        let machine = ListenerMachine::new(ListenerId::role("seer")).program(
            hook(),
            HookProgram::new(MachineStage::advance([PickState::Picking], |_s, _i| {
                Ok(StepResult::NeedInput {
                    instruction: Instruction::ack("hm"),
                    next: PickState::Confirming,
                })
            }))
            .on(PickState::Confirming, MachineStage::idle(|_s, _i| Ok(StepResult::Done))),
        );
        let mut session = Session::new(vec![PlayerId(1)]);
        let err = machine
            .step(&mut session, &hook(), None, &mut InputSlot::empty())
            .unwrap_err();
        assert!(matches!(err, FatalError::EndStateViolation { .. }));
    }

    #[test]
    fn advancing_stage_must_leave_its_state() {
        let machine = ListenerMachine::new(ListenerId::role("seer")).program(
            hook(),
            HookProgram::new(MachineStage::advance([PickState::Picking], |_s, _i| {
                Ok(StepResult::NeedInput {
                    instruction: Instruction::one_player("pick"),
                    next: PickState::Picking,
                })
            }))
            .on(
                PickState::Picking,
                MachineStage::advance([PickState::Picking], |_s, _i| {
                    Ok(StepResult::NeedInput {
                        instruction: Instruction::one_player("pick again"),
                        next: PickState::Picking,
                    })
                }),
            ),
        );
        let mut session = Session::new(vec![PlayerId(1)]);

        // First activation may land on Picking; the resume stage may not
        // stay there, because it declared itself advancing.
        let token = StateToken::new("picking");
        let err = machine
            .step(&mut session, &hook(), Some(&token), &mut InputSlot::empty())
            .unwrap_err();
        assert!(matches!(err, FatalError::ListenerStalled { .. }));
    }

    #[test]
    fn idle_stage_may_repeat_its_state() {
        let machine = ListenerMachine::new(ListenerId::role("seer")).program(
            hook(),
            HookProgram::new(MachineStage::advance([PickState::Picking], |_s, _i| {
                Ok(StepResult::NeedInput {
                    instruction: Instruction::one_player("pick"),
                    next: PickState::Picking,
                })
            }))
            .on(
                PickState::Picking,
                MachineStage::idle(|_s, _i| {
                    Ok(StepResult::NeedInput {
                        instruction: Instruction::one_player("that one is dead, pick again"),
                        next: PickState::Picking,
                    })
                }),
            ),
        );
        let mut session = Session::new(vec![PlayerId(1)]);

        let token = StateToken::new("picking");
        let step = machine
            .step(&mut session, &hook(), Some(&token), &mut InputSlot::empty())
            .unwrap();
        let ListenerStep::NeedInput { resume, .. } = step else {
            panic!("expected a pause");
        };
        assert_eq!(resume, token);
    }

    #[test]
    fn idle_stage_moving_on_is_fatal() {
        let machine = ListenerMachine::new(ListenerId::role("seer")).program(
            hook(),
            HookProgram::new(MachineStage::advance([PickState::Picking], |_s, _i| {
                Ok(StepResult::NeedInput {
                    instruction: Instruction::one_player("pick"),
                    next: PickState::Picking,
                })
            }))
            .on(
                PickState::Picking,
                MachineStage::idle(|_s, _i| {
                    Ok(StepResult::NeedInput {
                        instruction: Instruction::yes_no("sure?"),
                        next: PickState::Confirming,
                    })
                }),
            )
            .on(PickState::Confirming, MachineStage::idle(|_s, _i| Ok(StepResult::Done))),
        );
        let mut session = Session::new(vec![PlayerId(1)]);

        let token = StateToken::new("picking");
        let err = machine
            .step(&mut session, &hook(), Some(&token), &mut InputSlot::empty())
            .unwrap_err();
        assert!(matches!(err, FatalError::IdleStageAdvanced { .. }));
    }

    #[test]
    fn pause_state_without_resume_stage_is_fatal() {
        let machine = ListenerMachine::new(ListenerId::role("seer")).program(
            hook(),
            HookProgram::new(MachineStage::advance([PickState::Picking], |_s, _i| {
                Ok(StepResult::NeedInput {
                    instruction: Instruction::one_player("pick"),
                    next: PickState::Picking,
                })
            })),
        );
        let mut session = Session::new(vec![PlayerId(1)]);
        let err = machine
            .step(&mut session, &hook(), None, &mut InputSlot::empty())
            .unwrap_err();
        assert!(matches!(err, FatalError::UnknownListenerState { .. }));
    }
}
