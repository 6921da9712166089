use crate::error::Result;
use crate::peer::types::IceCandidate;
use serde::{Deserialize, Serialize};

/// Сообщения от сервера сигнализации, один JSON-объект на сообщение
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundMessage {
    Answer {
        sdp: String,
    },
    IceCandidate {
        candidate: IceCandidate,
    },
    /// Информационный текст для пользователя
    Status {
        #[serde(default)]
        message: String,
    },
    Error {
        #[serde(default)]
        message: String,
    },
    #[serde(alias = "airplay_disconnected")]
    RemoteSourceDisconnected {
        #[serde(default)]
        message: String,
    },
    #[serde(alias = "airplay_reconnecting")]
    RemoteSourceReconnecting {
        #[serde(default)]
        message: String,
    },
    /// Сервер сам поднял транспорт заново, согласование не нужно
    #[serde(alias = "webrtc_ready")]
    NegotiationReady {
        #[serde(default)]
        message: String,
    },
    #[serde(alias = "reconnection_ready")]
    RemoteReadyForRenegotiation {
        #[serde(default)]
        message: String,
    },
    #[serde(alias = "window_changed")]
    RemoteWindowChanged {
        #[serde(default)]
        message: String,
    },
}

impl InboundMessage {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::Status { .. } => "status",
            Self::Error { .. } => "error",
            Self::RemoteSourceDisconnected { .. } => "remote-source-disconnected",
            Self::RemoteSourceReconnecting { .. } => "remote-source-reconnecting",
            Self::NegotiationReady { .. } => "negotiation-ready",
            Self::RemoteReadyForRenegotiation { .. } => "remote-ready-for-renegotiation",
            Self::RemoteWindowChanged { .. } => "remote-window-changed",
        }
    }
}

/// Сообщения клиента
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundMessage {
    Offer { sdp: String },
    IceCandidate { candidate: IceCandidate },
    /// Область интереса для детектора, ядру не нужна
    Roi { points: Vec<[f64; 2]> },
}

impl OutboundMessage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Offer { .. } => "offer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::Roi { .. } => "roi",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    #[test]
    fn parses_answer_and_candidate() {
        let msg = InboundMessage::parse(r#"{"type":"answer","sdp":"v=0\r\n"}"#).unwrap();
        assert_eq!(msg, InboundMessage::Answer { sdp: "v=0\r\n".into() });

        let msg = InboundMessage::parse(
            r#"{"type":"ice-candidate","candidate":{"candidate":"candidate:1 1 udp 1 10.0.0.1 9 typ host","sdpMid":"0","sdpMLineIndex":0}}"#,
        )
        .unwrap();
        assert_eq!(msg.kind(), "ice-candidate");
    }

    #[test]
    fn lifecycle_messages_accept_legacy_names() {
        let cases = [
            ("remote-source-disconnected", "remote-source-disconnected"),
            ("airplay_disconnected", "remote-source-disconnected"),
            ("airplay_reconnecting", "remote-source-reconnecting"),
            ("webrtc_ready", "negotiation-ready"),
            ("reconnection_ready", "remote-ready-for-renegotiation"),
            ("window_changed", "remote-window-changed"),
            ("remote-window-changed", "remote-window-changed"),
        ];
        for (wire, kind) in cases {
            let text = json!({"type": wire, "message": "hi", "windowID": "42"}).to_string();
            let msg = InboundMessage::parse(&text).unwrap();
            assert_eq!(msg.kind(), kind, "wire type {wire}");
        }
    }

    #[test]
    fn message_text_is_optional() {
        let msg = InboundMessage::parse(r#"{"type":"negotiation-ready"}"#).unwrap();
        assert_eq!(msg, InboundMessage::NegotiationReady { message: String::new() });
    }

    #[test]
    fn unknown_type_is_a_protocol_error() {
        let err = InboundMessage::parse(r#"{"type":"bogus"}"#).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(InboundMessage::parse("not json").is_err());
    }

    #[test]
    fn outbound_wire_format() {
        let offer = OutboundMessage::Offer { sdp: "v=0".into() };
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&offer.to_json().unwrap()).unwrap(),
            json!({"type": "offer", "sdp": "v=0"})
        );

        let roi = OutboundMessage::Roi { points: vec![[0.0, 0.0], [10.0, 5.0]] };
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&roi.to_json().unwrap()).unwrap(),
            json!({"type": "roi", "points": [[0.0, 0.0], [10.0, 5.0]]})
        );

        let cand = OutboundMessage::IceCandidate {
            candidate: IceCandidate::new("candidate:1 1 udp 1 10.0.0.1 9 typ host"),
        };
        let value: serde_json::Value = serde_json::from_str(&cand.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "ice-candidate");
        assert_eq!(value["candidate"]["sdpMid"], "0");
    }
}
