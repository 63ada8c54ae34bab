use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::candidates::Role;
use crate::room::{room_key, RoomId};
use crate::store::{StoreHandle, StoreResult};

/// One offer slot and one answer slot per room, last write wins.
#[derive(Clone)]
pub struct NegotiationChannel {
    store: StoreHandle,
    ttl: Duration,
}

impl NegotiationChannel {
    pub fn new(store: StoreHandle, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Replaces the offer, then drops both candidate queues so candidates gathered for the
    /// previous offer never reach the new negotiation. The two steps are separate store
    /// calls; a candidate landing between them may or may not survive.
    pub async fn publish_offer(&self, room: &RoomId, sdp: &Value) -> StoreResult<()> {
        self.write(room, "offer", sdp).await?;
        for role in Role::ALL {
            self.store.delete(&role.queue_key(room)).await?;
        }
        debug!(%room, "offer replaced, candidate queues cleared");
        Ok(())
    }

    pub async fn fetch_offer(&self, room: &RoomId) -> StoreResult<Option<Value>> {
        self.read(room, "offer").await
    }

    pub async fn publish_answer(&self, room: &RoomId, sdp: &Value) -> StoreResult<()> {
        self.write(room, "answer", sdp).await
    }

    pub async fn fetch_answer(&self, room: &RoomId) -> StoreResult<Option<Value>> {
        self.read(room, "answer").await
    }

    async fn write(&self, room: &RoomId, field: &str, sdp: &Value) -> StoreResult<()> {
        let encoded = serde_json::to_string(sdp)?;
        self.store
            .set_ex(&room_key(room, field), encoded, self.ttl)
            .await
    }

    async fn read(&self, room: &RoomId, field: &str) -> StoreResult<Option<Value>> {
        match self.store.get(&room_key(room, field)).await? {
            Some(encoded) => Ok(Some(serde_json::from_str(&encoded)?)),
            None => Ok(None),
        }
    }
}
