use crate::peer::types::ServerConfig;
use rand::Rng;

pub fn random_id() -> String {
    hex::encode(rand::rng().random::<[u8; 8]>())
}

// Функция для добавления схемы протокола к URL ICE сервера, если она отсутствует
pub fn add_ice_url_scheme(config: &ServerConfig) -> String {
    // Если url уже начинается с "turn:" или "stun:", возвращаем как есть
    if has_ice_scheme(&config.url) {
        config.url.clone()
    } else {
        // В зависимости от типа сервера добавляем нужную схему
        let scheme = if config.r#type == "turn" {
            "turn:"
        } else {
            "stun:"
        };
        format!("{}{}", scheme, config.url)
    }
}

fn has_ice_scheme(url: &str) -> bool {
    ["stun:", "stuns:", "turn:", "turns:"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}

/// Разбор ICE сервера из командной строки: тип берётся из схемы URL
pub fn server_config_from_url(
    index: usize,
    url: &str,
    username: Option<&str>,
    credential: Option<&str>,
) -> ServerConfig {
    let is_turn = url.starts_with("turn:") || url.starts_with("turns:");
    ServerConfig {
        id: format!("cli-{index}"),
        r#type: if is_turn { "turn" } else { "stun" }.to_string(),
        url: url.to_string(),
        username: if is_turn { username.map(Into::into) } else { None },
        credential: if is_turn { credential.map(Into::into) } else { None },
    }
}
