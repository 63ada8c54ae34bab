//! Request-level protocol: the closed set of signaling operations and how a raw request
//! (verb, path, query, JSON body) becomes one of them.

use std::collections::HashMap;

use axum::http::Method;
use serde::Serialize;
use serde_json::Value;

use crate::candidates::{CandidateBatch, Role};
use crate::error::{RelayError, RelayResult};
use crate::room::{RoomId, RoomStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    CreateRoom,
    RoomStatus { room: RoomId },
    FetchOffer { room: RoomId },
    PublishOffer { room: RoomId, sdp: Value },
    FetchAnswer { room: RoomId },
    PublishAnswer { room: RoomId, sdp: Value },
    PublishCandidate {
        room: RoomId,
        role: Role,
        candidate: Value,
    },
    FetchCandidates { room: RoomId, role: Role },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Room,
    Offer,
    Answer,
    Candidate,
    Candidates,
}

impl Resource {
    fn from_path(path: &str) -> Option<Self> {
        let path = path.strip_prefix("/api").unwrap_or(path);
        match path {
            "/room" => Some(Resource::Room),
            "/offer" => Some(Resource::Offer),
            "/answer" => Some(Resource::Answer),
            "/candidate" => Some(Resource::Candidate),
            "/candidates" => Some(Resource::Candidates),
            _ => None,
        }
    }
}

impl Operation {
    /// Maps a request onto an operation, validating every required parameter up front.
    ///
    /// GET parameters come from `query`, POST parameters from `body`, which should be
    /// `Value::Null` when the request had no usable JSON body.
    pub fn parse(
        method: &Method,
        path: &str,
        query: &HashMap<String, String>,
        body: &Value,
    ) -> RelayResult<Self> {
        let resource = Resource::from_path(path).ok_or(RelayError::NotFound)?;
        let op = match (resource, method) {
            (Resource::Room, &Method::POST) => Operation::CreateRoom,
            (Resource::Room, &Method::GET) => Operation::RoomStatus {
                room: query_param(query, "id").ok_or_else(|| RelayError::invalid("id required"))?,
            },
            (Resource::Offer, &Method::GET) => Operation::FetchOffer {
                room: query_param(query, "roomId")
                    .ok_or_else(|| RelayError::invalid("roomId required"))?,
            },
            (Resource::Offer, &Method::POST) => {
                let (room, sdp) = room_and_sdp(body)?;
                Operation::PublishOffer { room, sdp }
            }
            (Resource::Answer, &Method::GET) => Operation::FetchAnswer {
                room: query_param(query, "roomId")
                    .ok_or_else(|| RelayError::invalid("roomId required"))?,
            },
            (Resource::Answer, &Method::POST) => {
                let (room, sdp) = room_and_sdp(body)?;
                Operation::PublishAnswer { room, sdp }
            }
            (Resource::Candidate, &Method::POST) => {
                let (Some(room), Some(role), Some(candidate)) = (
                    body_room(body),
                    body_text(body, "role"),
                    body_payload(body, "candidate"),
                ) else {
                    return Err(RelayError::invalid("roomId, role, candidate required"));
                };
                Operation::PublishCandidate {
                    room,
                    role: parse_role(role)?,
                    candidate: candidate.clone(),
                }
            }
            (Resource::Candidates, &Method::GET) => {
                let (Some(room), Some(role)) = (query_param(query, "roomId"), query.get("role"))
                else {
                    return Err(RelayError::invalid("roomId and role required"));
                };
                if role.is_empty() {
                    return Err(RelayError::invalid("roomId and role required"));
                }
                Operation::FetchCandidates {
                    room,
                    role: parse_role(role)?,
                }
            }
            _ => return Err(RelayError::MethodNotAllowed),
        };
        Ok(op)
    }

    /// Stable label used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateRoom => "create_room",
            Operation::RoomStatus { .. } => "room_status",
            Operation::FetchOffer { .. } => "fetch_offer",
            Operation::PublishOffer { .. } => "publish_offer",
            Operation::FetchAnswer { .. } => "fetch_answer",
            Operation::PublishAnswer { .. } => "publish_answer",
            Operation::PublishCandidate { .. } => "publish_candidate",
            Operation::FetchCandidates { .. } => "fetch_candidates",
        }
    }

    pub fn room(&self) -> Option<&RoomId> {
        match self {
            Operation::CreateRoom => None,
            Operation::RoomStatus { room }
            | Operation::FetchOffer { room }
            | Operation::PublishOffer { room, .. }
            | Operation::FetchAnswer { room }
            | Operation::PublishAnswer { room, .. }
            | Operation::PublishCandidate { room, .. }
            | Operation::FetchCandidates { room, .. } => Some(room),
        }
    }
}

/// Successful result of an operation, serialized as the response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    RoomCreated {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },
    RoomStatus(RoomStatus),
    Offer {
        offer: Option<Value>,
    },
    Answer {
        answer: Option<Value>,
    },
    Ack {
        ok: bool,
    },
    Candidates(CandidateBatch),
}

impl Outcome {
    pub fn ack() -> Self {
        Outcome::Ack { ok: true }
    }
}

fn query_param(query: &HashMap<String, String>, name: &str) -> Option<RoomId> {
    query
        .get(name)
        .filter(|value| !value.is_empty())
        .map(|value| RoomId::from(value.as_str()))
}

/// `roomId` from a POST body. Numbers and `true` are accepted in their textual form.
fn body_room(body: &Value) -> Option<RoomId> {
    match body.get("roomId")? {
        Value::String(id) if !id.is_empty() => Some(RoomId::from(id.as_str())),
        Value::Number(n) if n.as_f64().is_some_and(|n| n != 0.0) => {
            Some(RoomId::from(n.to_string().as_str()))
        }
        Value::Bool(true) => Some(RoomId::from("true")),
        _ => None,
    }
}

fn body_text<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

/// Opaque payload field. `null`, `false`, `0` and `""` count as missing.
fn body_payload<'a>(body: &'a Value, name: &str) -> Option<&'a Value> {
    body.get(name).filter(|value| match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

fn room_and_sdp(body: &Value) -> RelayResult<(RoomId, Value)> {
    match (body_room(body), body_payload(body, "sdp")) {
        (Some(room), Some(sdp)) => Ok((room, sdp.clone())),
        _ => Err(RelayError::invalid("roomId and sdp required")),
    }
}

fn parse_role(raw: &str) -> RelayResult<Role> {
    raw.parse()
        .map_err(|_| RelayError::invalid("role must be caller or callee"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn parse_get(path: &str, pairs: &[(&str, &str)]) -> RelayResult<Operation> {
        Operation::parse(&Method::GET, path, &query(pairs), &Value::Null)
    }

    fn parse_post(path: &str, body: Value) -> RelayResult<Operation> {
        Operation::parse(&Method::POST, path, &HashMap::new(), &body)
    }

    fn assert_invalid(result: RelayResult<Operation>, expected: &str) {
        match result {
            Err(RelayError::InvalidRequest(message)) => assert_eq!(message, expected),
            other => panic!("expected invalid request, got {other:?}"),
        }
    }

    #[test_timeout::timeout]
    fn parses_every_operation() {
        assert_eq!(parse_post("/room", Value::Null).unwrap(), Operation::CreateRoom);
        assert_eq!(
            parse_get("/room", &[("id", "r1")]).unwrap(),
            Operation::RoomStatus { room: "r1".into() }
        );
        assert_eq!(
            parse_get("/offer", &[("roomId", "r1")]).unwrap(),
            Operation::FetchOffer { room: "r1".into() }
        );
        assert_eq!(
            parse_post("/offer", json!({"roomId": "r1", "sdp": "v=0"})).unwrap(),
            Operation::PublishOffer {
                room: "r1".into(),
                sdp: json!("v=0"),
            }
        );
        assert_eq!(
            parse_get("/answer", &[("roomId", "r1")]).unwrap(),
            Operation::FetchAnswer { room: "r1".into() }
        );
        assert_eq!(
            parse_post("/answer", json!({"roomId": "r1", "sdp": {"type": "answer"}})).unwrap(),
            Operation::PublishAnswer {
                room: "r1".into(),
                sdp: json!({"type": "answer"}),
            }
        );
        assert_eq!(
            parse_post(
                "/candidate",
                json!({"roomId": "r1", "role": "callee", "candidate": {"candidate": "c"}})
            )
            .unwrap(),
            Operation::PublishCandidate {
                room: "r1".into(),
                role: Role::Callee,
                candidate: json!({"candidate": "c"}),
            }
        );
        assert_eq!(
            parse_get("/candidates", &[("roomId", "r1"), ("role", "caller")]).unwrap(),
            Operation::FetchCandidates {
                room: "r1".into(),
                role: Role::Caller,
            }
        );
    }

    #[test_timeout::timeout]
    fn scalar_room_ids_are_taken_as_text() {
        assert_eq!(
            parse_post("/offer", json!({"roomId": 123, "sdp": "v=0"})).unwrap(),
            Operation::PublishOffer {
                room: "123".into(),
                sdp: json!("v=0"),
            }
        );
        assert_eq!(
            parse_post(
                "/candidate",
                json!({"roomId": 7, "role": "caller", "candidate": {"c": 1}})
            )
            .unwrap(),
            Operation::PublishCandidate {
                room: "7".into(),
                role: Role::Caller,
                candidate: json!({"c": 1}),
            }
        );
        assert_invalid(
            parse_post("/answer", json!({"roomId": 0, "sdp": "v=0"})),
            "roomId and sdp required",
        );
        assert_invalid(
            parse_post("/answer", json!({"roomId": {"id": "r1"}, "sdp": "v=0"})),
            "roomId and sdp required",
        );
    }

    #[test_timeout::timeout]
    fn api_prefix_is_optional() {
        assert_eq!(parse_post("/api/room", Value::Null).unwrap(), Operation::CreateRoom);
    }

    #[test_timeout::timeout]
    fn unknown_paths_and_verbs_are_rejected() {
        assert!(matches!(parse_get("/rooms", &[]), Err(RelayError::NotFound)));
        assert!(matches!(parse_get("/api", &[]), Err(RelayError::NotFound)));
        assert!(matches!(
            parse_get("/candidate", &[("roomId", "r1")]),
            Err(RelayError::MethodNotAllowed)
        ));
        assert!(matches!(
            parse_post("/candidates", json!({})),
            Err(RelayError::MethodNotAllowed)
        ));
        assert!(matches!(
            Operation::parse(&Method::DELETE, "/room", &HashMap::new(), &Value::Null),
            Err(RelayError::MethodNotAllowed)
        ));
    }

    #[test_timeout::timeout]
    fn missing_parameters_are_invalid() {
        assert_invalid(parse_get("/room", &[]), "id required");
        assert_invalid(parse_get("/room", &[("id", "")]), "id required");
        assert_invalid(parse_get("/offer", &[]), "roomId required");
        assert_invalid(parse_get("/answer", &[("id", "r1")]), "roomId required");
        assert_invalid(parse_post("/offer", Value::Null), "roomId and sdp required");
        assert_invalid(
            parse_post("/offer", json!({"roomId": "r1", "sdp": ""})),
            "roomId and sdp required",
        );
        assert_invalid(
            parse_post("/answer", json!({"sdp": "v=0"})),
            "roomId and sdp required",
        );
        assert_invalid(
            parse_post("/candidate", json!({"roomId": "r1", "role": "caller"})),
            "roomId, role, candidate required",
        );
        assert_invalid(
            parse_post(
                "/candidate",
                json!({"roomId": "r1", "role": "caller", "candidate": null}),
            ),
            "roomId, role, candidate required",
        );
        assert_invalid(
            parse_get("/candidates", &[("roomId", "r1")]),
            "roomId and role required",
        );
        assert_invalid(
            parse_get("/candidates", &[("roomId", "r1"), ("role", "")]),
            "roomId and role required",
        );
    }

    #[test_timeout::timeout]
    fn bad_roles_are_invalid() {
        assert_invalid(
            parse_post(
                "/candidate",
                json!({"roomId": "r1", "role": "host", "candidate": {"c": 1}}),
            ),
            "role must be caller or callee",
        );
        assert_invalid(
            parse_get("/candidates", &[("roomId", "r1"), ("role", "viewer")]),
            "role must be caller or callee",
        );
    }

    #[test_timeout::timeout]
    fn outcomes_serialize_to_wire_shapes() {
        let created = Outcome::RoomCreated {
            room_id: "abc".into(),
        };
        assert_eq!(serde_json::to_value(created).unwrap(), json!({"roomId": "abc"}));
        assert_eq!(
            serde_json::to_value(Outcome::Offer { offer: None }).unwrap(),
            json!({"offer": null})
        );
        assert_eq!(serde_json::to_value(Outcome::ack()).unwrap(), json!({"ok": true}));
        let status = Outcome::RoomStatus(RoomStatus {
            exists: true,
            has_offer: false,
            has_answer: true,
        });
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            json!({"exists": true, "hasOffer": false, "hasAnswer": true})
        );
        let batch = Outcome::Candidates(CandidateBatch {
            candidates: vec![json!({"c": 1})],
            count: 1,
        });
        assert_eq!(
            serde_json::to_value(batch).unwrap(),
            json!({"candidates": [{"c": 1}], "count": 1})
        );
    }
}
