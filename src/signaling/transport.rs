use crate::error::Result;
use crate::session::events::{ChannelId, EventSender, SessionEvent};
use crate::signaling::messages::OutboundMessage;

/// Что происходит с каналом сигнализации
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    /// Сырой текст, разбор в контроллере
    Message(String),
    Error(String),
    Closed,
}

/// Сток событий одного канала
#[derive(Debug, Clone)]
pub struct ChannelEvents {
    channel: ChannelId,
    tx: EventSender,
}

impl ChannelEvents {
    pub fn new(channel: ChannelId, tx: EventSender) -> Self {
        Self { channel, tx }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn emit(&self, event: ChannelEvent) -> bool {
        self.tx
            .send(SessionEvent::Channel {
                channel: self.channel,
                event,
            })
            .is_ok()
    }
}

/// Открытый (или открывающийся) канал
pub trait ChannelHandle: Send + Sync {
    fn send(&self, message: &OutboundMessage) -> Result<()>;

    /// Закрыть со своей стороны; повторный вызов безопасен
    fn close(&mut self);
}

/// Открывает каналы; открытие асинхронное, итог приходит как `ChannelEvent`
pub trait SignalingConnector: Send + Sync {
    fn open(&self, events: ChannelEvents) -> Box<dyn ChannelHandle>;
}
