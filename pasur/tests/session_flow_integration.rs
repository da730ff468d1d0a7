/// Integration tests for complete session lifecycles
///
/// These tests drive real session actors through the manager, using the
/// in-memory repository and a channel notifier to observe what clients
/// would have been sent.
use std::{sync::Arc, time::Duration};

use pasur::{
    SessionConfig, SessionManager,
    db::InMemorySessionRepository,
    game::{DECK_SIZE, PlayOutcome, RoundScore, RoundWinner, SessionId, TerminationReason, UserId},
    session::{
        ChannelNotifier, ContinueOutcome, Notification, SessionEvent, SessionHandle,
        SessionServices, UserStatus,
    },
};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

const ALICE: UserId = 101;
const BOB: UserId = 202;

fn setup() -> (
    SessionManager,
    InMemorySessionRepository,
    UnboundedReceiver<Notification>,
) {
    let repository = InMemorySessionRepository::new();
    let (notifier, rx) = ChannelNotifier::new();
    let notifier = Arc::new(notifier);
    let services = SessionServices {
        repository: Arc::new(repository.clone()),
        notifier: notifier.clone(),
        presence: notifier,
    };
    (
        SessionManager::new(SessionConfig::default(), services),
        repository,
        rx,
    )
}

async fn wait_until_gone(manager: &SessionManager, session_id: SessionId) {
    for _ in 0..200 {
        if manager.handle(session_id).await.is_err() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session {session_id} never unregistered");
}

fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}

/// Plays the first card of the current hand until the round ends.
async fn play_out(handle: &SessionHandle) -> (usize, RoundScore) {
    let mut plays = 0;
    loop {
        let current = handle.view(ALICE).await.unwrap().current_turn;
        let card = handle.player_cards(current).await.unwrap()[0];

        match handle.play_card(current, card.id, None).await.unwrap() {
            PlayOutcome::Accepted(resolution) => assert_eq!(resolution.card.id, card.id),
            PlayOutcome::AwaitingSelection { candidates, .. } => {
                assert!(candidates.len() > 1);
                let chosen = candidates[0].iter().map(|c| c.id).collect();
                let resolution = handle
                    .select_combination(current, card.id, chosen)
                    .await
                    .unwrap();
                assert!(resolution.is_capture());
            }
        }
        plays += 1;

        match handle.continue_game(current).await.unwrap() {
            ContinueOutcome::Continued { current: next, .. } => assert_ne!(next, current),
            ContinueOutcome::GameOver(score) => return (plays, score),
            ContinueOutcome::AlreadyContinued => panic!("continuation was not pending"),
        }
    }
}

#[tokio::test]
async fn test_full_round_plays_every_card() {
    let (manager, repository, mut rx) = setup();
    let session_id = Uuid::new_v4();
    let handle = manager
        .create_session(session_id, 12, &[ALICE, BOB])
        .await
        .unwrap();

    assert!(!handle.initial_animation_complete(ALICE).await.unwrap());
    assert!(handle.initial_animation_complete(BOB).await.unwrap());

    let (plays, score) = play_out(&handle).await;

    // 52 cards, four on the table, eight per deal
    assert_eq!(plays, DECK_SIZE - 4);
    assert_eq!(score.scores.len(), 2);
    let total: usize = score.scores.iter().map(|s| s.control_count).sum();
    assert_eq!(total, 13);

    wait_until_gone(&manager, session_id).await;
    assert!(repository.is_empty().await);

    // A finished game accepts nothing more
    let err = manager
        .submit_play(session_id, ALICE, Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert!(err.is_gone());
    let err = handle.continue_game(BOB).await.unwrap_err();
    assert!(err.is_gone());
    assert!(manager.request_hand(session_id, BOB).await.unwrap_err().is_gone());
    assert!(repository.is_empty().await);

    let notifications = drain(&mut rx);
    let played = notifications
        .iter()
        .filter(|n| matches!(n, Notification::Broadcast { event: SessionEvent::PlayedCard { .. }, .. }))
        .count();
    assert_eq!(played, plays);

    let game_over: Vec<&SessionEvent> = notifications
        .iter()
        .filter_map(|n| match n {
            Notification::Broadcast { event, .. } if event.kind() == "game_over" => Some(event),
            _ => None,
        })
        .collect();
    assert_eq!(game_over.len(), 1);
    if let SessionEvent::GameOver {
        players, game_over, ..
    } = game_over[0]
    {
        assert!(*game_over);
        let collected: usize = players.iter().map(|p| p.collected.len()).sum();
        assert_eq!(collected, DECK_SIZE);
        assert!(players.iter().all(|p| p.card_count == 0));
    }

    for user in [ALICE, BOB] {
        let last_status = notifications.iter().rev().find_map(|n| match n {
            Notification::Status { user_id, status } if *user_id == user => Some(*status),
            _ => None,
        });
        assert_eq!(last_status, Some(UserStatus::Online));
        assert!(notifications.iter().any(|n| matches!(
            n,
            Notification::Left { user_id, .. } if *user_id == user
        )));
    }
}

#[tokio::test]
async fn test_round_winner_matches_totals() {
    let (manager, _repository, _rx) = setup();
    let handle = manager
        .create_session(Uuid::new_v4(), 1, &[ALICE, BOB])
        .await
        .unwrap();
    handle.initial_animation_complete(ALICE).await.unwrap();
    handle.initial_animation_complete(BOB).await.unwrap();

    let (_, score) = play_out(&handle).await;
    let alice = score.scores.iter().find(|s| s.user_id == ALICE).unwrap();
    let bob = score.scores.iter().find(|s| s.user_id == BOB).unwrap();
    let expected = match alice.total.cmp(&bob.total) {
        std::cmp::Ordering::Greater => RoundWinner::Player(ALICE),
        std::cmp::Ordering::Less => RoundWinner::Player(BOB),
        std::cmp::Ordering::Equal => RoundWinner::Tie,
    };
    assert_eq!(score.winner, expected);
}

#[tokio::test]
async fn test_out_of_turn_play_is_rejected_without_side_effects() {
    let (manager, _repository, _rx) = setup();
    let session_id = Uuid::new_v4();
    let handle = manager
        .create_session(session_id, 1, &[ALICE, BOB])
        .await
        .unwrap();
    handle.initial_animation_complete(ALICE).await.unwrap();
    handle.initial_animation_complete(BOB).await.unwrap();

    let before = handle.view(ALICE).await.unwrap();
    let waiting = if before.current_turn == ALICE { BOB } else { ALICE };
    let card = handle.player_cards(waiting).await.unwrap()[0];

    let err = handle.play_card(waiting, card.id, None).await.unwrap_err();
    assert_eq!(err.client_message(), "not your turn");

    let after = handle.view(ALICE).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_disconnect_mid_game_terminates_for_both() {
    let (manager, repository, mut rx) = setup();
    let session_id = Uuid::new_v4();
    manager
        .create_session(session_id, 3, &[ALICE, BOB])
        .await
        .unwrap();
    manager.acknowledge_ready(session_id, ALICE).await.unwrap();
    manager.acknowledge_ready(session_id, BOB).await.unwrap();

    let forfeits = manager.handle_disconnect(ALICE).await;
    assert_eq!(forfeits.len(), 1);
    assert_eq!(forfeits[0].winner, BOB);

    wait_until_gone(&manager, session_id).await;
    assert!(!repository.contains(session_id).await);

    let notifications = drain(&mut rx);
    let terminated = notifications.iter().find_map(|n| match n {
        Notification::Broadcast {
            event: SessionEvent::GameTerminated { winner, reason, .. },
            ..
        } => Some((*winner, *reason)),
        _ => None,
    });
    assert_eq!(terminated, Some((BOB, TerminationReason::Disconnected)));
    assert!(notifications.contains(&Notification::Status {
        user_id: ALICE,
        status: UserStatus::Offline,
    }));

    let err = manager.request_hand(session_id, BOB).await.unwrap_err();
    assert!(err.is_gone());
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let (manager, _repository, _rx) = setup();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    manager.create_session(first, 1, &[ALICE, BOB]).await.unwrap();
    manager.create_session(second, 2, &[ALICE, 303]).await.unwrap();

    let mut alice_sessions = manager.sessions_for(ALICE).await;
    alice_sessions.sort();
    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(alice_sessions, expected);

    manager.handle_disconnect(BOB).await;
    wait_until_gone(&manager, first).await;

    assert!(manager.handle(second).await.is_ok());
    assert_eq!(manager.sessions_for(ALICE).await, vec![second]);
}
