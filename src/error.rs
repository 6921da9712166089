use thiserror::Error;

/// Ошибки ядра просмотра
#[derive(Debug, Error)]
pub enum Error {
    /// Канал сигнализации не открылся или оборвался
    #[error("signaling channel error: {0}")]
    Signaling(String),

    #[error("signaling channel is not open")]
    ChannelClosed,

    /// Сообщение сигнализации не удалось разобрать
    #[error("malformed signaling message: {0}")]
    Protocol(#[from] serde_json::Error),

    /// Ошибка offer/answer обмена
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    /// ICE кандидат отклонён (битый или нет remote description)
    #[error("candidate rejected: {0}")]
    CandidateRejected(String),

    #[error("webrtc error: {0}")]
    WebRtc(#[from] webrtc::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Цикл сессии уже завершён
    #[error("session loop has shut down")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
