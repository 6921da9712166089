use crate::error::Result;
use crate::peer::primitive::PrimitiveEvent;
use crate::signaling::transport::ChannelEvent;
use std::fmt;
use tokio::sync::mpsc;

/// Номер попытки согласования; у каждой свой примитив
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(pub u64);

/// Номер канала сигнализации
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ws#{}", self.0)
    }
}

/// Команды снаружи
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    CancelAutoRecovery,
    SendRoi(Vec<[f64; 2]>),
    /// stop + завершение цикла
    Shutdown,
}

/// Внутренние события цикла сессии: каналы, примитивы, таймеры, завершения
#[derive(Debug)]
pub enum SessionEvent {
    Channel {
        channel: ChannelId,
        event: ChannelEvent,
    },
    Primitive {
        attempt: AttemptId,
        event: PrimitiveEvent,
    },
    /// offer создан и установлен локально
    OfferReady {
        attempt: AttemptId,
        result: Result<String>,
    },
    RemoteDescriptionSet {
        attempt: AttemptId,
        result: Result<()>,
    },
    RecoveryTick {
        generation: u64,
    },
    SelfCheck {
        attempt: AttemptId,
    },
    ReopenChannel {
        generation: u64,
    },
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type CommandSender = mpsc::UnboundedSender<Command>;
pub type CommandReceiver = mpsc::UnboundedReceiver<Command>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
