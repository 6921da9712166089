use crate::peer::types::{ConnectionState, IceConnectionState, IceGatheringState};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tokio::task::JoinHandle;

/// Единый статус соединения для наблюдателей
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Stopped,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    ReadyForReconnect,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
            Self::ReadyForReconnect => "ready_for_reconnect",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Снимок сессии, который видят UI и прочие наблюдатели
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub status: Status,
    /// Подсказка пользователю, не ошибка
    pub server_status: Option<String>,
    pub error: Option<String>,
    pub countdown_seconds: Option<u32>,
    pub is_connecting: bool,
    #[serde(serialize_with = "display")]
    pub connection_state: ConnectionState,
    #[serde(serialize_with = "display")]
    pub ice_connection_state: IceConnectionState,
    #[serde(serialize_with = "display")]
    pub ice_gathering_state: IceGatheringState,
}

fn display<T: fmt::Display, S: serde::Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Принятые удалённые треки (аналог srcObject у video)
#[derive(Debug, Default)]
pub struct MediaSink {
    tracks: BTreeMap<String, String>,
}

impl MediaSink {
    pub fn attach(&mut self, track_id: String, kind: String) {
        self.tracks.insert(track_id, kind);
    }

    pub fn detach(&mut self, track_id: &str) {
        self.tracks.remove(track_id);
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Остановить и отцепить все треки
    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

/// Отложенная задача, которую можно отменить
#[derive(Debug, Default)]
pub struct TaskSlot {
    handle: Option<JoinHandle<()>>,
}

impl TaskSlot {
    /// Новая задача вытесняет старую
    pub fn replace(&mut self, handle: JoinHandle<()>) {
        if let Some(old) = self.handle.replace(handle) {
            old.abort();
        }
    }

    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
