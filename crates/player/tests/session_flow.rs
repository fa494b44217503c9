//! End-to-end session flows over the in-memory loopback transport.

use serde_json::json;

use battlemap_player::coords::{RenderPoint, Size};
use battlemap_player::infrastructure::testing::{LoopbackConnector, LoopbackServer};
use battlemap_player::infrastructure::{ConnectionState, CorrelationPolicy};
use battlemap_player::state::LogColor;
use battlemap_player::{ClientConfig, ClientError, Intent, PlayerAction, Session, SessionHandle};
use battlemap_shared::ResponseResult;

fn config(correlation: CorrelationPolicy) -> ClientConfig {
    ClientConfig {
        correlation,
        surface: Some(Size::new(1000, 683)),
        ..ClientConfig::default()
    }
}

/// A connected session whose bootstrap requests have been answered with the
/// given roster.
fn connected(
    correlation: CorrelationPolicy,
    roster: serde_json::Value,
) -> (Session, SessionHandle, LoopbackServer) {
    let (connector, server) = LoopbackConnector::new();
    let (mut session, handle) = Session::new(&config(correlation), Box::new(connector));
    session.connect();
    session.pump();

    for frame in server.take_frames() {
        let result = match frame.event.as_str() {
            "info" => ResponseResult::success(
                json!({"player": {"role": "player", "character": "c1", "name": "Ana"}}),
            ),
            "getCharacters" => ResponseResult::success(roster.clone()),
            other => panic!("unexpected bootstrap request {other}"),
        };
        server.respond(&frame, result);
    }
    session.pump();
    (session, handle, server)
}

fn two_fighters() -> serde_json::Value {
    json!([
        {"id": "c1", "name": "Ana", "hp": 10, "maxHp": 10, "pos": {"x": 400, "y": 300}},
        {"id": "c2", "name": "Bo", "hp": 12, "maxHp": 12, "pos": {"x": 100, "y": 100}}
    ])
}

#[test]
fn bootstrap_loads_identity_and_roster() {
    let (session, handle, _server) = connected(CorrelationPolicy::PerRequest, two_fighters());

    assert_eq!(handle.status().state, ConnectionState::Connected);
    assert_eq!(session.context().player.character_id.as_deref(), Some("c1"));
    assert_eq!(session.context().player.name, "Ana");
    assert_eq!(session.pending_requests(), 0);

    let state = handle.state();
    assert_eq!(state.characters.len(), 2);
    assert_eq!(
        state.character("c1").map(|c| c.position),
        Some(RenderPoint::new(376, 276))
    );
}

#[test]
fn pushed_game_events_update_the_snapshot() {
    let (mut session, handle, server) =
        connected(CorrelationPolicy::PerRequest, two_fighters());

    server.push(
        "gameEvent",
        json!({"type": "characterAttack", "attacker": "c1", "victim": "c2", "hit": "sword", "damage": 5}),
    );
    server.push("gameStatus", json!({"activeCharacterId": "c2", "round": 2}));
    session.pump();

    let state = handle.state();
    assert_eq!(state.character("c2").map(|c| c.hp.current), Some(7));
    assert_eq!(state.round, 2);
    assert_eq!(state.active_character().map(|c| c.id.as_str()), Some("c2"));
    let last = state.log.back().expect("attack logged");
    assert_eq!(last.message, "Ana hit Bo with a sword for 5 damage!");
    assert_eq!(last.color, LogColor::White);
}

#[test]
fn rejected_attack_shows_reason_in_log() {
    let (mut session, handle, server) =
        connected(CorrelationPolicy::PerRequest, two_fighters());

    handle.send(PlayerAction::select("c2")).expect("alive");
    handle.send(PlayerAction::attack()).expect("alive");
    session.pump();

    let frames = server.take_frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].data, json!({"target": "c2"}));
    server.respond(&frames[0], ResponseResult::failure("Not your turn"));
    session.pump();

    let last = handle.state().log.back().cloned().expect("log entry");
    assert_eq!(last.color, LogColor::Orange);
    assert_eq!(last.message, "attack failed: Not your turn");
}

#[test]
fn reconnect_ignores_the_previous_channel() {
    let (mut session, handle, server) =
        connected(CorrelationPolicy::PerRequest, two_fighters());
    let old = server.latest_generation().expect("a channel");

    handle.send(PlayerAction::Dash).expect("alive");
    session.pump();
    let stale_request = server.take_frames().remove(0);
    assert_eq!(session.pending_requests(), 1);

    handle.send(Intent::Reconnect).expect("alive");
    session.pump();
    assert_eq!(server.channels_opened(), 2);
    assert_ne!(server.latest_generation(), Some(old));
    assert_eq!(server.take_frames().len(), 2, "bootstrap runs again");

    server.push_on(
        old,
        "characterJoin",
        json!({"id": "ghost", "name": "Ghost", "hp": 1}),
    );
    session.pump();
    assert!(handle.state().character("ghost").is_none());

    // The dash callback went away with the old channel.
    server.respond(&stale_request, ResponseResult::failure("late"));
    session.pump();
    assert!(handle
        .state()
        .log
        .iter()
        .all(|entry| !entry.message.contains("late")));
}

#[test]
fn players_cannot_drop_other_tokens() {
    let (mut session, handle, server) =
        connected(CorrelationPolicy::PerRequest, two_fighters());

    let refused = session.apply(PlayerAction::drop_token("c2", 0, 0).into());
    assert!(matches!(refused, Err(ClientError::NotPermitted(_))));
    assert!(server.take_frames().is_empty());

    session
        .apply(PlayerAction::drop_token("c1", 476, 276).into())
        .expect("own token");
    let frames = server.take_frames();
    assert_eq!(frames[0].event, "move");
    assert_eq!(frames[0].data, json!({"pos": [500, 300]}));

    let last = handle.state().log.back().cloned().expect("refusal logged");
    assert_eq!(last.color, LogColor::Orange);
}

#[test]
fn per_action_policy_keeps_only_latest_callback() {
    let (mut session, handle, server) = connected(CorrelationPolicy::PerAction, two_fighters());

    session
        .apply(PlayerAction::drop_token("c1", 10, 10).into())
        .expect("first move");
    session
        .apply(PlayerAction::drop_token("c1", 20, 20).into())
        .expect("second move");
    let frames = server.take_frames();
    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|f| f.request_id.is_none()));

    server.respond(&frames[0], ResponseResult::failure("blocked"));
    server.respond(&frames[1], ResponseResult::failure("blocked"));
    session.pump();

    let failures = handle
        .state()
        .log
        .iter()
        .filter(|entry| entry.message == "move failed: blocked")
        .count();
    assert_eq!(failures, 1);
}

#[test]
fn resize_reprojects_every_token() {
    let (mut session, handle, _server) =
        connected(CorrelationPolicy::PerRequest, two_fighters());

    session
        .apply(PlayerAction::Resize(Size::new(500, 341)).into())
        .expect("resize");

    let state = handle.state();
    assert_eq!(
        state.character("c1").map(|c| c.position),
        Some(RenderPoint::new(176, 125))
    );
}

#[test]
fn server_going_away_publishes_decoded_reason() {
    let (mut session, handle, server) =
        connected(CorrelationPolicy::PerRequest, two_fighters());

    server.close(1001);
    session.pump();

    let status = handle.status();
    assert_eq!(status.state, ConnectionState::Failed);
    let reason = status.last_error.expect("reason recorded");
    assert_eq!(reason.code, 1001);
    assert!(reason.description.starts_with("Going away"));
    assert!(matches!(
        session.apply(PlayerAction::Dash.into()),
        Err(ClientError::NotConnected)
    ));
}
