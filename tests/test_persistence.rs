//! Mid-pause persistence: a session serialized while a listener is
//! awaiting input must deserialize and resume at the exact paused point.

mod common;

use common::{fixture_router, fixture_session, is_dead, VILLAGER_A, WOLF};
use nocturne::flow::MainPhase;
use nocturne::hooks::ListenerId;
use nocturne::instruction::ModeratorInput;
use nocturne::session::Session;

#[test]
fn paused_session_round_trips_and_resumes() {
    let router = fixture_router();
    let mut session = fixture_session();

    // Pause on the wolf's question.
    router.dispatch(&mut session, None).unwrap();
    let pending = router
        .dispatch(&mut session, Some(ModeratorInput::Player(WOLF)))
        .unwrap();

    let json = serde_json::to_string(&session).unwrap();
    drop(session);

    // A different process with the same static tables picks it back up.
    let mut restored: Session = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.pending_instruction(), Some(&pending));
    assert_eq!(
        restored.cursor().paused().unwrap().listener,
        ListenerId::role("wolf")
    );

    let router = fixture_router();
    router
        .dispatch(&mut restored, Some(ModeratorInput::Player(VILLAGER_A)))
        .unwrap();
    assert_eq!(restored.phase(), MainPhase::Day);
    assert!(is_dead(&restored, VILLAGER_A));
}

#[test]
fn fresh_session_round_trips() {
    let session = fixture_session();
    let json = serde_json::to_string(&session).unwrap();
    let restored: Session = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.id(), session.id());
    assert_eq!(restored.phase(), session.phase());
    assert_eq!(restored.turn(), session.turn());
    assert_eq!(restored.log(), session.log());
}
