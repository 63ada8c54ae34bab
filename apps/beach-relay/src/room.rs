use std::fmt;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;

use crate::store::{StoreHandle, StoreResult};

/// Length of generated room identifiers.
pub const ROOM_ID_LEN: usize = 8;

const ROOM_ID_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Opaque room token. Only generated ids are guaranteed to be short and URL safe; ids
/// received from clients are taken as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Fresh random id from the thread-local CSPRNG. Uniqueness rests on its entropy alone.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..ROOM_ID_LEN)
            .map(|_| char::from(ROOM_ID_ALPHABET[rng.gen_range(0..ROOM_ID_ALPHABET.len())]))
            .collect();
        RoomId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        RoomId(value.to_string())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store key for one field of a room, e.g. `room:abc:offer`.
pub fn room_key(room: &RoomId, field: &str) -> String {
    format!("room:{}:{}", room, field)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatus {
    pub exists: bool,
    pub has_offer: bool,
    pub has_answer: bool,
}

#[derive(Clone)]
pub struct RoomRegistry {
    store: StoreHandle,
    ttl: Duration,
}

impl RoomRegistry {
    pub fn new(store: StoreHandle, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Writes the creation marker. The marker's TTL is never refreshed afterwards.
    pub async fn create_room(&self) -> StoreResult<RoomId> {
        let room = RoomId::generate();
        let created_at = chrono::Utc::now().timestamp_millis();
        self.store
            .set_ex(&room_key(&room, "created"), created_at.to_string(), self.ttl)
            .await?;
        Ok(room)
    }

    pub async fn status(&self, room: &RoomId) -> StoreResult<RoomStatus> {
        let offer = self.store.get(&room_key(room, "offer")).await?;
        let answer = self.store.get(&room_key(room, "answer")).await?;
        let created = self.store.get(&room_key(room, "created")).await?;
        Ok(RoomStatus {
            exists: created.is_some(),
            has_offer: offer.is_some(),
            has_answer: answer.is_some(),
        })
    }
}
