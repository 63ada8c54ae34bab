use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::room::{room_key, RoomId};
use crate::store::{StoreHandle, StoreResult};

/// Which side of the call a peer is on. Peers write their own queue and read the other's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Caller,
    Callee,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Caller, Role::Callee];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Caller => "caller",
            Role::Callee => "callee",
        }
    }

    pub fn peer(self) -> Role {
        match self {
            Role::Caller => Role::Callee,
            Role::Callee => Role::Caller,
        }
    }

    /// Key of the queue this role appends to.
    pub fn queue_key(self, room: &RoomId) -> String {
        room_key(room, &format!("candidates:{}", self.as_str()))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "caller" => Ok(Role::Caller),
            "callee" => Ok(Role::Callee),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateBatch {
    pub candidates: Vec<Value>,
    pub count: usize,
}

/// Per-room, per-role append-only ICE candidate lists.
#[derive(Clone)]
pub struct CandidateQueues {
    store: StoreHandle,
    ttl: Duration,
}

impl CandidateQueues {
    pub fn new(store: StoreHandle, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Appends to `role`'s own queue and slides that queue's expiry forward.
    pub async fn publish(&self, room: &RoomId, role: Role, candidate: &Value) -> StoreResult<()> {
        let key = role.queue_key(room);
        let encoded = serde_json::to_string(candidate)?;
        let len = self.store.push(&key, encoded).await?;
        self.store.expire(&key, self.ttl).await?;
        debug!(%room, %role, queue_len = len, "candidate queued");
        Ok(())
    }

    /// Everything the *other* peer has published so far, oldest first. Reading does not
    /// consume; clients track how many they have already applied.
    pub async fn fetch(&self, room: &RoomId, requesting: Role) -> StoreResult<CandidateBatch> {
        let source = requesting.peer();
        let raw = self.store.list(&source.queue_key(room)).await?;
        let candidates = raw
            .iter()
            .map(|entry| serde_json::from_str(entry))
            .collect::<Result<Vec<Value>, _>>()?;
        trace!(%room, %requesting, %source, count = candidates.len(), "candidates read");
        Ok(CandidateBatch {
            count: candidates.len(),
            candidates,
        })
    }
}
