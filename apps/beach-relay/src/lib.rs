//! Beach Relay: a WebRTC signaling relay.
//!
//! Two peers, a caller and a callee, swap SDP offers/answers and ICE candidates through a
//! room keyed in an expiring store. The relay never sees media and keeps no state of its
//! own; every key expires on its own TTL.
//!
//! ```text
//! POST /room                    -> {roomId}
//! GET  /room?id=               -> {exists, hasOffer, hasAnswer}
//! GET  /offer?roomId=          -> {offer}
//! POST /offer   {roomId, sdp}   -> {ok}        (also clears both candidate queues)
//! GET  /answer?roomId=         -> {answer}
//! POST /answer  {roomId, sdp}   -> {ok}
//! POST /candidate {roomId, role, candidate} -> {ok}
//! GET  /candidates?roomId=&role= -> {candidates, count}   (the *other* role's queue)
//! ```

pub mod candidates;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod negotiation;
pub mod protocol;
pub mod room;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod telemetry;

pub use error::{RelayError, RelayResult};
pub use protocol::{Operation, Outcome};
pub use service::SignalingService;
