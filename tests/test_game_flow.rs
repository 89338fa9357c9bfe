//! End-to-end flow through the fixture game: night questions, the silent
//! roll into day, the vote, and the terminal phase.

mod common;

use common::{
    fixture_router, fixture_session, fixture_session_with_villagers, is_dead, SEER, VILLAGER_A,
    VILLAGER_B, WOLF,
};
use nocturne::flow::MainPhase;
use nocturne::instruction::{validate_response, ModeratorInput, ResponseShape};
use nocturne::session::PlayerId;

#[test]
fn full_game_to_wolf_elimination() {
    let router = fixture_router();
    let mut session = fixture_session();

    // Night 1: the seer is asked first.
    let instruction = router.dispatch(&mut session, None).unwrap();
    assert_eq!(instruction.expects, ResponseShape::OnePlayer);
    assert!(instruction.prompt.contains("seer"));
    assert_eq!(session.phase(), MainPhase::Night);
    assert_eq!(session.turn(), 1);

    // Seer inspects the wolf; the wolf is asked next.
    let answer = ModeratorInput::Player(WOLF);
    validate_response(&session, &answer).unwrap();
    let instruction = router.dispatch(&mut session, Some(answer)).unwrap();
    assert!(instruction.prompt.contains("wolf"));

    // Wolf kills a villager; night resolves and day opens with the
    // announcement. The phase boundary must clear all hook state.
    let instruction = router
        .dispatch(&mut session, Some(ModeratorInput::Player(VILLAGER_A)))
        .unwrap();
    assert_eq!(session.phase(), MainPhase::Day);
    assert!(is_dead(&session, VILLAGER_A));
    assert_eq!(instruction.expects, ResponseShape::Ack);
    assert!(session.cursor().active_hook().is_none());
    assert!(session.cursor().paused().is_none());

    // Announcement acknowledged; the vote is requested.
    let instruction = router
        .dispatch(&mut session, Some(ModeratorInput::Ack))
        .unwrap();
    assert_eq!(instruction.expects, ResponseShape::OnePlayer);

    // The table votes out the wolf: game over.
    let instruction = router
        .dispatch(&mut session, Some(ModeratorInput::Player(WOLF)))
        .unwrap();
    assert_eq!(session.phase(), MainPhase::GameOver);
    assert!(is_dead(&session, WOLF));
    assert_eq!(instruction.expects, ResponseShape::Ack);
    assert!(instruction.prompt.contains("over"));

    // The terminal phase keeps re-issuing its final prompt.
    let again = router
        .dispatch(&mut session, Some(ModeratorInput::Ack))
        .unwrap();
    assert_eq!(again, instruction);
    assert_eq!(session.phase(), MainPhase::GameOver);
}

#[test]
fn surviving_day_rolls_into_second_night() {
    let router = fixture_router();
    // Six seats: enough villagers that one night kill and one mislynch do
    // not end the game.
    let mut session = fixture_session_with_villagers(4);

    router.dispatch(&mut session, None).unwrap();
    router
        .dispatch(&mut session, Some(ModeratorInput::Player(VILLAGER_B)))
        .unwrap();
    // Wolf kills p3; day opens.
    router
        .dispatch(&mut session, Some(ModeratorInput::Player(PlayerId(3))))
        .unwrap();
    assert_eq!(session.phase(), MainPhase::Day);
    assert_eq!(session.turn(), 1);

    router
        .dispatch(&mut session, Some(ModeratorInput::Ack))
        .unwrap();
    // The table votes out a villager; the game goes on.
    let instruction = router
        .dispatch(&mut session, Some(ModeratorInput::Player(PlayerId(4))))
        .unwrap();

    assert_eq!(session.phase(), MainPhase::Night);
    assert_eq!(session.turn(), 2);
    // Night 2 starts clean and asks the seer again.
    assert!(instruction.prompt.contains("seer"));
    assert!(session.cursor().paused().is_some());
}

#[test]
fn malformed_answer_leaves_session_untouched() {
    let router = fixture_router();
    let mut session = fixture_session();

    let instruction = router.dispatch(&mut session, None).unwrap();
    let log_len = session.log().len();

    // Wrong shape entirely.
    let err = validate_response(&session, &ModeratorInput::Ack).unwrap_err();
    assert!(err.to_string().contains("mismatch"));

    // Dead or unknown targets are rejected too.
    validate_response(&session, &ModeratorInput::Player(PlayerId(99))).unwrap_err();

    // Nothing moved: same pending instruction, same log, same cursor.
    assert_eq!(session.pending_instruction(), Some(&instruction));
    assert_eq!(session.log().len(), log_len);
    assert_eq!(session.phase(), MainPhase::Night);

    // A corrected answer still works.
    let answer = ModeratorInput::Player(SEER);
    validate_response(&session, &answer).unwrap();
    router.dispatch(&mut session, Some(answer)).unwrap();
}
