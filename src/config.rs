// Конфигурация приложения
// Уровень логирования по умолчанию зависит от режима сборки, RUST_LOG его перекрывает

use crate::error::{Error, Result};
use crate::peer::types::ServerConfig;
use std::time::Duration;

#[cfg(debug_assertions)]
pub const DEFAULT_LOG_FILTER: &str = "debug,webrtc=warn,webrtc_ice=warn"; // В режиме отладки подробный лог

#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_FILTER: &str = "info,webrtc=error"; // В продакшене только важное

/// Адрес сигнального сервера по умолчанию
pub const DEFAULT_SIGNALING_URL: &str = "ws://localhost:8080/api/webrtc/signal";

/// Тайминги автоматики сессии
#[derive(Debug, Clone)]
pub struct Timing {
    /// Пауза перед повторным открытием оборванного канала сигнализации
    pub channel_reopen_delay: Duration,
    /// Стартовое значение обратного отсчёта автовосстановления
    pub recovery_countdown: u32,
    /// Длина одного шага обратного отсчёта
    pub recovery_tick: Duration,
    /// Самопроверка статуса после отправки offer
    pub offer_self_check_delay: Duration,
    /// Самопроверка статуса после ICE connected
    pub ice_self_check_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            channel_reopen_delay: Duration::from_secs(2),
            recovery_countdown: 5,
            recovery_tick: Duration::from_secs(1),
            offer_self_check_delay: Duration::from_secs(3),
            ice_self_check_delay: Duration::from_secs(1),
        }
    }
}

/// Конфигурация одной сессии просмотра
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub signaling_url: String,
    /// Пусто = host-режим, STUN не нужен
    pub ice_servers: Vec<ServerConfig>,
    pub timing: Timing,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signaling_url: DEFAULT_SIGNALING_URL.to_string(),
            ice_servers: Vec::new(),
            timing: Timing::default(),
        }
    }
}

impl SessionConfig {
    pub fn new(signaling_url: impl Into<String>) -> Self {
        Self {
            signaling_url: signaling_url.into(),
            ..Default::default()
        }
    }

    pub fn with_ice_servers(mut self, servers: Vec<ServerConfig>) -> Self {
        self.ice_servers = servers;
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Проверка конфигурации перед запуском
    pub fn validate(&self) -> Result<()> {
        if !(self.signaling_url.starts_with("ws://") || self.signaling_url.starts_with("wss://")) {
            return Err(Error::Config(format!(
                "signaling url must use ws:// or wss://, got '{}'",
                self.signaling_url
            )));
        }

        for server in &self.ice_servers {
            if server.url.is_empty() {
                return Err(Error::Config("ICE server URL cannot be empty".into()));
            }

            if server.r#type == "turn" && (server.username.is_none() || server.credential.is_none())
            {
                return Err(Error::Config(format!(
                    "TURN server '{}' requires username and credential",
                    server.url
                )));
            }
        }

        if self.timing.recovery_countdown == 0 {
            return Err(Error::Config("recovery countdown must be at least 1".into()));
        }

        Ok(())
    }
}
