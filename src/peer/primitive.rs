// Граница между ядром сессии и платформенным peer connection.
//
// Ядро не знает, как считается offer или собираются кандидаты, оно
// только решает, когда дёргать эти операции и куда отправлять результат.

use crate::error::Result;
use crate::peer::types::{ConnectionState, IceCandidate, IceConnectionState, IceGatheringState};
use crate::session::events::{AttemptId, EventSender, SessionEvent};
use async_trait::async_trait;
use std::sync::Arc;

/// Уведомления от примитива. Три канала состояний независимы и могут
/// приходить в любом порядке относительно друг друга.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveEvent {
    ConnectionState(ConnectionState),
    IceConnectionState(IceConnectionState),
    IceGatheringState(IceGatheringState),
    /// Локальный кандидат для отправки удалённой стороне
    LocalCandidate(IceCandidate),
    TrackAdded { track_id: String, kind: String },
    TrackEnded { track_id: String },
}

/// Сток событий одной попытки согласования
#[derive(Debug, Clone)]
pub struct PrimitiveEvents {
    attempt: AttemptId,
    tx: EventSender,
}

impl PrimitiveEvents {
    pub fn new(attempt: AttemptId, tx: EventSender) -> Self {
        Self { attempt, tx }
    }

    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    /// false, если цикл сессии уже завершён
    pub fn emit(&self, event: PrimitiveEvent) -> bool {
        self.tx
            .send(SessionEvent::Primitive {
                attempt: self.attempt,
                event,
            })
            .is_ok()
    }
}

/// Один экземпляр на попытку, повторно не используется
#[async_trait]
pub trait NegotiationPrimitive: Send + Sync {
    /// SDP offer с приёмом аудио и видео
    async fn create_offer(&self) -> Result<String>;

    async fn set_local_description(&self, sdp: String) -> Result<()>;

    /// SDP answer удалённой стороны
    async fn set_remote_description(&self, sdp: String) -> Result<()>;

    /// `CandidateRejected`, если кандидат битый или remote description нет
    async fn add_candidate(&self, candidate: IceCandidate) -> Result<()>;

    fn connection_state(&self) -> ConnectionState;

    fn ice_connection_state(&self) -> IceConnectionState;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait PrimitiveFactory: Send + Sync {
    async fn create(&self, events: PrimitiveEvents) -> Result<Arc<dyn NegotiationPrimitive>>;
}
