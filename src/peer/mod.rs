pub mod connection;
pub mod ice;
pub mod primitive;
pub mod types;

pub use connection::{RtcPrimitive, RtcPrimitiveFactory};
pub use ice::{is_unreachable_candidate, CandidateQueue};
pub use primitive::{NegotiationPrimitive, PrimitiveEvent, PrimitiveEvents, PrimitiveFactory};
pub use types::{ConnectionState, IceCandidate, IceConnectionState, IceGatheringState, ServerConfig};
