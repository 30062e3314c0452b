use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::types::{Direction, LobbyState, Snapshot};

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    JoinLobby { slot_id: usize },
    StartGame,
    Move { direction: Direction },
    Dash,
    RequestSpectate,
    SetGameSpeed { speed: f32 },
}

/// Inbound frames look like `{"event": "...", "payload": {...}}`.
pub fn parse_client_message(raw: &str) -> Result<ParsedClientMessage, ProtocolError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| ProtocolError::InvalidJson)?;
    let object = value.as_object().ok_or(ProtocolError::NotAnObject)?;
    let event = object
        .get("event")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingEvent)?;
    let payload = object.get("payload").and_then(Value::as_object);

    match event {
        "joinLobby" => {
            let slot = require(payload, "slotId")?;
            let slot_id = slot
                .as_u64()
                .and_then(|slot| usize::try_from(slot).ok())
                .ok_or(ProtocolError::InvalidField("slotId"))?;
            Ok(ParsedClientMessage::JoinLobby { slot_id })
        }
        "startGame" => Ok(ParsedClientMessage::StartGame),
        "playerInput" => {
            let action = require(payload, "action")?
                .as_str()
                .ok_or(ProtocolError::InvalidField("action"))?;
            match action {
                "move" => {
                    let direction = parse_direction(require(payload, "direction")?)?;
                    Ok(ParsedClientMessage::Move { direction })
                }
                "dash" => Ok(ParsedClientMessage::Dash),
                _ => Err(ProtocolError::InvalidField("action")),
            }
        }
        "requestSpectate" => Ok(ParsedClientMessage::RequestSpectate),
        "setGameSpeed" => {
            let speed = require(payload, "speed")?
                .as_f64()
                .filter(|speed| speed.is_finite())
                .ok_or(ProtocolError::InvalidField("speed"))?;
            Ok(ParsedClientMessage::SetGameSpeed {
                speed: speed as f32,
            })
        }
        other => Err(ProtocolError::UnknownEvent(other.to_string())),
    }
}

fn require<'a>(
    payload: Option<&'a Map<String, Value>>,
    field: &'static str,
) -> Result<&'a Value, ProtocolError> {
    payload
        .and_then(|payload| payload.get(field))
        .filter(|value| !value.is_null())
        .ok_or(ProtocolError::MissingField(field))
}

fn parse_direction(value: &Value) -> Result<Direction, ProtocolError> {
    let component = |name: &str| {
        let number = value.get(name)?.as_f64()?;
        (number.is_finite() && number.fract() == 0.0).then_some(number as i64)
    };
    let (Some(dx), Some(dy)) = (component("dx"), component("dy")) else {
        return Err(ProtocolError::InvalidField("direction"));
    };
    Direction::from_delta(dx, dy).ok_or(ProtocolError::InvalidField("direction"))
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ServerEvent {
    Connected {
        #[serde(rename = "clientId")]
        client_id: String,
        #[serde(rename = "lobbyState")]
        lobby_state: LobbyState,
    },
    /// Sent to connections that are not part of the running match.
    GameInProgress {},
    LobbyStateUpdate(LobbyState),
    GameStarted(Snapshot),
    GameStateUpdate(Snapshot),
    ReturnToLobby(LobbyState),
}
