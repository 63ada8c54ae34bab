use std::time::Duration;

use tracing::{debug, error};

use crate::candidates::CandidateQueues;
use crate::error::{RelayError, RelayResult};
use crate::metrics;
use crate::negotiation::NegotiationChannel;
use crate::protocol::{Operation, Outcome};
use crate::room::RoomRegistry;
use crate::store::StoreHandle;

/// Stateless dispatcher over the signaling components.
///
/// All state lives in the injected store, so any number of services (in one process or
/// many) can serve any room.
#[derive(Clone)]
pub struct SignalingService {
    store: StoreHandle,
    rooms: RoomRegistry,
    negotiation: NegotiationChannel,
    candidates: CandidateQueues,
}

impl SignalingService {
    pub fn new(store: StoreHandle, ttl: Duration) -> Self {
        Self {
            rooms: RoomRegistry::new(store.clone(), ttl),
            negotiation: NegotiationChannel::new(store.clone(), ttl),
            candidates: CandidateQueues::new(store.clone(), ttl),
            store,
        }
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Runs exactly one component operation.
    pub async fn dispatch(&self, op: Operation) -> RelayResult<Outcome> {
        let name = op.name();
        let result = self.run(op).await;
        match &result {
            Ok(_) => metrics::record_operation(name, "ok"),
            Err(err) => {
                metrics::record_operation(name, err.kind());
                if let RelayError::Store(store_err) = err {
                    metrics::STORE_ERRORS.with_label_values(&[name]).inc();
                    error!(operation = name, error = %store_err, "store operation failed");
                }
            }
        }
        result
    }

    async fn run(&self, op: Operation) -> RelayResult<Outcome> {
        let outcome = match op {
            Operation::CreateRoom => {
                let room_id = self.rooms.create_room().await?;
                metrics::ROOMS_CREATED.inc();
                debug!(room = %room_id, "room created");
                Outcome::RoomCreated { room_id }
            }
            Operation::RoomStatus { room } => Outcome::RoomStatus(self.rooms.status(&room).await?),
            Operation::FetchOffer { room } => Outcome::Offer {
                offer: self.negotiation.fetch_offer(&room).await?,
            },
            Operation::PublishOffer { room, sdp } => {
                self.negotiation.publish_offer(&room, &sdp).await?;
                Outcome::ack()
            }
            Operation::FetchAnswer { room } => Outcome::Answer {
                answer: self.negotiation.fetch_answer(&room).await?,
            },
            Operation::PublishAnswer { room, sdp } => {
                self.negotiation.publish_answer(&room, &sdp).await?;
                debug!(%room, "answer stored");
                Outcome::ack()
            }
            Operation::PublishCandidate {
                room,
                role,
                candidate,
            } => {
                self.candidates.publish(&room, role, &candidate).await?;
                Outcome::ack()
            }
            Operation::FetchCandidates { room, role } => {
                Outcome::Candidates(self.candidates.fetch(&room, role).await?)
            }
        };
        Ok(outcome)
    }
}
