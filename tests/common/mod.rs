//! Shared integration-test fixture: a minimal four-seat werewolf table.
//!
//! Night fires the `night_actions` hook (seer, then wolf, then the
//! poisoned-effect listener) and silently rolls into day. Day announces,
//! runs the vote, applies the outcome, and either ends the game or
//! silently rolls into the next night. Game over loops on a final prompt.

#![allow(dead_code)]

use serde_json::json;

use nocturne::error::FatalError;
use nocturne::flow::{
    FlowRouter, MainPhase, PhaseManager, Stage, StageId, SubPhaseId, SubPhaseManager, Transition,
};
use nocturne::hooks::{
    HookDispatcher, HookId, HookProgram, ListenerId, ListenerMachine, MachineStage, MachineState,
    StepResult,
};
use nocturne::instruction::{InputSlot, Instruction, ModeratorInput};
use nocturne::session::{
    DeathCause, Health, LogEvent, PlayerId, RoleId, Session, StatusEffect,
};

pub const SEER: PlayerId = PlayerId(1);
pub const WOLF: PlayerId = PlayerId(2);
pub const VILLAGER_A: PlayerId = PlayerId(3);
pub const VILLAGER_B: PlayerId = PlayerId(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NightState {
    Picking,
}

impl MachineState for NightState {
    fn encode(self) -> &'static str {
        match self {
            Self::Picking => "picking",
        }
    }

    fn decode(token: &str) -> Option<Self> {
        match token {
            "picking" => Some(Self::Picking),
            _ => None,
        }
    }
}

pub fn night_hook() -> HookId {
    HookId::new("night_actions")
}

fn take_player(input: &mut InputSlot) -> Option<PlayerId> {
    match input.take() {
        Some(ModeratorInput::Player(id)) => Some(id),
        _ => None,
    }
}

/// Two-step seer: asks for a target, then records the inspection.
fn seer_machine() -> ListenerMachine<NightState> {
    let id = ListenerId::role("seer");
    let record_as = id.clone();
    ListenerMachine::new(id).program(
        night_hook(),
        HookProgram::new(MachineStage::advance([NightState::Picking], |_s, _i| {
            Ok(StepResult::NeedInput {
                instruction: Instruction::one_player("Wake the seer; have them point at a player"),
                next: NightState::Picking,
            })
        }))
        .on(
            NightState::Picking,
            MachineStage::advance([], move |session: &mut Session, input: &mut InputSlot| {
                if let Some(target) = take_player(input) {
                    let listener = record_as.clone();
                    session.append_and_apply(|_| LogEvent::NightAction {
                        listener,
                        target: Some(target),
                        payload: json!({"action": "inspect"}),
                    })?;
                }
                Ok(StepResult::Done)
            }),
        ),
    )
}

/// Two-step wolf: asks for a victim, then kills unless they are protected.
fn wolf_machine() -> ListenerMachine<NightState> {
    let id = ListenerId::role("wolf");
    let record_as = id.clone();
    ListenerMachine::new(id).program(
        night_hook(),
        HookProgram::new(MachineStage::advance([NightState::Picking], |_s, _i| {
            Ok(StepResult::NeedInput {
                instruction: Instruction::one_player("Wake the wolf; have them pick a victim"),
                next: NightState::Picking,
            })
        }))
        .on(
            NightState::Picking,
            MachineStage::advance([], move |session: &mut Session, input: &mut InputSlot| {
                if let Some(target) = take_player(input) {
                    let protected = session
                        .try_player(target)
                        .is_some_and(|p| p.has_status(StatusEffect::Protected));
                    if protected {
                        let listener = record_as.clone();
                        session.append_and_apply(|_| LogEvent::NightAction {
                            listener,
                            target: Some(target),
                            payload: json!({"action": "blocked"}),
                        })?;
                    } else {
                        session.append_and_apply(|_| LogEvent::Eliminated {
                            player: target,
                            cause: DeathCause::NightKill,
                        })?;
                    }
                }
                Ok(StepResult::Done)
            }),
        ),
    )
}

/// Stateless poison resolution: every poisoned living player dies.
fn poison_machine() -> ListenerMachine<NightState> {
    ListenerMachine::new(ListenerId::effect("poisoned")).program(
        night_hook(),
        HookProgram::new(MachineStage::advance(
            [],
            |session: &mut Session, _i: &mut InputSlot| {
                for player in session.living_players_with_status(StatusEffect::Poisoned) {
                    session.append_and_apply(|_| LogEvent::Eliminated {
                        player,
                        cause: DeathCause::Poison,
                    })?;
                }
                Ok(StepResult::Done)
            },
        )),
    )
}

fn night_phase() -> PhaseManager {
    let actions = SubPhaseManager::new(
        SubPhaseId::new("actions"),
        vec![
            (StageId::new("calls"), Stage::hook(night_hook())),
            (
                StageId::new("dawn"),
                Stage::navigation(|_s: &mut Session, _i: &mut InputSlot| {
                    Ok(Transition::main(MainPhase::Day))
                }),
            ),
        ],
        [],
        [MainPhase::Day],
    )
    .expect("night sub-phase");
    PhaseManager::new(MainPhase::Night, SubPhaseId::new("actions"), vec![actions])
        .expect("night phase")
}

fn wolves_have_won_or_lost(session: &Session) -> bool {
    let wolves = session.living_players_with_role(&RoleId::new("wolf")).len();
    let total = session.living_players().count();
    wolves == 0 || wolves * 2 >= total
}

fn day_phase() -> PhaseManager {
    let discussion = SubPhaseManager::new(
        SubPhaseId::new("discussion"),
        vec![
            (
                StageId::new("announce"),
                Stage::logic(|_s: &mut Session, _i: &mut InputSlot| {
                    Ok(Instruction::ack("Announce the night's deaths"))
                }),
            ),
            (
                StageId::new("vote"),
                Stage::logic(|_s: &mut Session, _i: &mut InputSlot| {
                    Ok(Instruction::one_player("Run the vote; report who was eliminated"))
                }),
            ),
            (
                StageId::new("close"),
                Stage::navigation(|session: &mut Session, input: &mut InputSlot| {
                    let eliminated = match input.take() {
                        Some(ModeratorInput::Player(id)) => Some(id),
                        _ => None,
                    };
                    session.append_and_apply(|s| LogEvent::VoteOutcome {
                        eliminated,
                        votes: u32::try_from(s.living_players().count()).unwrap_or(u32::MAX),
                    })?;
                    if wolves_have_won_or_lost(session) {
                        Ok(Transition::main(MainPhase::GameOver))
                    } else {
                        Ok(Transition::main(MainPhase::Night))
                    }
                }),
            ),
        ],
        [],
        [MainPhase::Night, MainPhase::GameOver],
    )
    .expect("day sub-phase");
    PhaseManager::new(MainPhase::Day, SubPhaseId::new("discussion"), vec![discussion])
        .expect("day phase")
}

fn game_over_phase() -> PhaseManager {
    let end = SubPhaseManager::new(
        SubPhaseId::new("end"),
        vec![
            (
                StageId::new("final"),
                Stage::logic(|_s: &mut Session, _i: &mut InputSlot| {
                    Ok(Instruction::ack("The game is over; reveal all roles"))
                }),
            ),
            (
                StageId::new("hold"),
                Stage::navigation(|_s: &mut Session, _i: &mut InputSlot| {
                    Ok(Transition::sub(SubPhaseId::new("end")))
                }),
            ),
        ],
        [SubPhaseId::new("end")],
        [],
    )
    .expect("game-over sub-phase");
    PhaseManager::new(MainPhase::GameOver, SubPhaseId::new("end"), vec![end])
        .expect("game-over phase")
}

fn dispatcher() -> Result<HookDispatcher, FatalError> {
    HookDispatcher::builder()
        .listener(Box::new(seer_machine()))?
        .listener(Box::new(wolf_machine()))?
        .listener(Box::new(poison_machine()))?
        .hook(
            night_hook(),
            vec![
                ListenerId::role("seer"),
                ListenerId::role("wolf"),
                ListenerId::effect("poisoned"),
            ],
        )?
        .build()
}

/// The full fixture router: night, day, and game over.
pub fn fixture_router() -> FlowRouter {
    FlowRouter::new(
        vec![night_phase(), day_phase(), game_over_phase()],
        dispatcher().expect("fixture dispatcher"),
    )
    .expect("fixture router")
}

/// A fresh four-player session with roles dealt.
pub fn fixture_session() -> Session {
    fixture_session_with_villagers(2)
}

/// A session with one seer, one wolf, and `villagers` villagers.
///
/// The seer is p1 and the wolf p2; villagers fill p3 onward.
pub fn fixture_session_with_villagers(villagers: u32) -> Session {
    let mut seating = vec![SEER, WOLF];
    seating.extend((0..villagers).map(|i| PlayerId(3 + i)));

    let mut session = Session::new(seating.clone());
    for player in seating {
        let role = match player {
            SEER => "seer",
            WOLF => "wolf",
            _ => "villager",
        };
        session
            .append_and_apply(|_| LogEvent::RoleAssigned {
                player,
                role: RoleId::new(role),
            })
            .expect("role assignment");
    }
    session
}

/// Convenience predicate for assertions.
pub fn is_dead(session: &Session, player: PlayerId) -> bool {
    session
        .try_player(player)
        .is_some_and(|p| p.health() == Health::Dead)
}
