//! Translates inbound wire payloads into store events.
//!
//! This is the only place that knows how each push event's payload is shaped.
//! Payloads that do not decode are logged and dropped; they never reach the
//! reducer and never fail a handler.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use battlemap_shared::{
    events, CharacterData, GameEvent, GameEventKind, GameStatusData, NpcBatch, ResponseResult,
};

use crate::state::StoreEvent;

/// Translate a push event into a store event.
///
/// Returns `None` for event names the store does not consume and for
/// payloads that cannot be decoded.
pub fn translate(event: &str, payload: &Value) -> Option<StoreEvent> {
    match event {
        events::CHARACTER_JOIN => decode::<CharacterData>(event, payload)
            .map(|character| StoreEvent::game(GameEventKind::CharacterJoin { character })),
        events::CHARACTER_UPDATE => {
            decode::<CharacterData>(event, payload).map(StoreEvent::CharacterUpdate)
        }
        events::GAME_STATUS => decode::<GameStatusData>(event, payload).map(StoreEvent::GameStatus),
        events::GAME_EVENT => translate_game_event(payload),
        events::CREATE_NPCS => translate_npc_batch(payload),
        events::RESET => (!is_rejection(payload)).then_some(StoreEvent::Reset),
        _ => None,
    }
}

/// A `success: false` response that arrived under a push event's name.
fn is_rejection(payload: &Value) -> bool {
    ResponseResult::is_response_shaped(payload) && payload["success"] == Value::Bool(false)
}

fn translate_game_event(payload: &Value) -> Option<StoreEvent> {
    match serde_json::from_value::<GameEvent>(payload.clone()) {
        Ok(GameEvent {
            kind: GameEventKind::Unknown,
            ..
        }) => {
            tracing::debug!(tag = %GameEvent::tag_of(payload), "Ignoring unknown game event");
            Some(StoreEvent::game(GameEventKind::Unknown))
        }
        Ok(game_event) => Some(StoreEvent::Game(game_event)),
        Err(e) => {
            tracing::warn!(
                tag = %GameEvent::tag_of(payload),
                error = %e,
                "Malformed game event"
            );
            None
        }
    }
}

/// NPC batches arrive either bare (`{"villagers": [...]}`) when broadcast, or
/// wrapped in a response (`{"success": true, "data": {...}}`).
fn translate_npc_batch(payload: &Value) -> Option<StoreEvent> {
    let groups = if ResponseResult::is_response_shaped(payload) {
        let result = ResponseResult::from_payload(payload);
        if !result.success {
            return None;
        }
        result.data.unwrap_or(Value::Null)
    } else {
        payload.clone()
    };
    if groups.is_null() {
        return None;
    }
    decode::<NpcBatch>(events::CREATE_NPCS, &groups).map(|batch| {
        StoreEvent::game(GameEventKind::CharactersSpawned {
            characters: batch.into_characters(),
        })
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RosterPayload {
    List(Vec<CharacterData>),
    ById(BTreeMap<String, CharacterData>),
}

/// Translate a roster response (`getCharacters`) into a full snapshot load.
///
/// The roster may be a list or an object keyed by id.
pub fn translate_roster(result: &ResponseResult) -> Option<StoreEvent> {
    let data = result.data.as_ref()?;
    let characters = match decode::<RosterPayload>("getCharacters", data)? {
        RosterPayload::List(list) => list,
        RosterPayload::ById(map) => map.into_values().collect(),
    };
    Some(StoreEvent::game(GameEventKind::SetAllCharacters { characters }))
}

fn decode<T: for<'de> Deserialize<'de>>(event: &str, payload: &Value) -> Option<T> {
    match serde_json::from_value(payload.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(event = %event, error = %e, "Failed to decode payload");
            None
        }
    }
}
