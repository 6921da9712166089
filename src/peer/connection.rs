use crate::error::{Error, Result};
use crate::logger::{dump_candidate, dump_selected_pair};
use crate::peer::primitive::{NegotiationPrimitive, PrimitiveEvent, PrimitiveEvents, PrimitiveFactory};
use crate::peer::types::{
    ConnectionState, IceCandidate, IceConnectionState, IceGatheringState, ServerConfig,
};
use crate::session::events::AttemptId;
use crate::utils::add_ice_url_scheme;
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_remote::TrackRemote;
use webrtc::{
    api::APIBuilder,
    ice_transport::ice_server::RTCIceServer,
    peer_connection::{
        configuration::RTCConfiguration, peer_connection_state::RTCPeerConnectionState,
        sdp::session_description::RTCSessionDescription, RTCPeerConnection,
    },
};

/// Фабрика peer connection на базе `webrtc`
pub struct RtcPrimitiveFactory {
    ice_servers: Vec<ServerConfig>,
}

impl RtcPrimitiveFactory {
    pub fn new(ice_servers: Vec<ServerConfig>) -> Self {
        Self { ice_servers }
    }
}

#[async_trait]
impl PrimitiveFactory for RtcPrimitiveFactory {
    async fn create(&self, events: PrimitiveEvents) -> Result<Arc<dyn NegotiationPrimitive>> {
        let pc = new_peer(rtc_config(&self.ice_servers), events.clone()).await?;
        Ok(Arc::new(RtcPrimitive {
            pc,
            attempt: events.attempt(),
        }))
    }
}

/// Peer connection одной попытки согласования
pub struct RtcPrimitive {
    pc: Arc<RTCPeerConnection>,
    attempt: AttemptId,
}

#[async_trait]
impl NegotiationPrimitive for RtcPrimitive {
    async fn create_offer(&self) -> Result<String> {
        debug!(attempt = %self.attempt, "Creating offer...");
        let offer = self.pc.create_offer(None).await?;
        Ok(offer.sdp)
    }

    async fn set_local_description(&self, sdp: String) -> Result<()> {
        debug!(attempt = %self.attempt, "Setting local description (offer)...");
        let offer = RTCSessionDescription::offer(sdp)?;
        self.pc.set_local_description(offer).await?;
        Ok(())
    }

    async fn set_remote_description(&self, sdp: String) -> Result<()> {
        debug!(attempt = %self.attempt, "Setting remote description (answer)...");
        let answer = RTCSessionDescription::answer(sdp)?;
        self.pc.set_remote_description(answer).await?;
        Ok(())
    }

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<()> {
        if self.pc.remote_description().await.is_none() {
            return Err(Error::CandidateRejected(
                "remote description is not set".into(),
            ));
        }

        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: candidate.username_fragment,
        };

        self.pc
            .add_ice_candidate(init)
            .await
            .map_err(|e| Error::CandidateRejected(e.to_string()))
    }

    fn connection_state(&self) -> ConnectionState {
        self.pc.connection_state().into()
    }

    fn ice_connection_state(&self) -> IceConnectionState {
        self.pc.ice_connection_state().into()
    }

    async fn close(&self) -> Result<()> {
        info!(attempt = %self.attempt, "Closing peer connection");
        self.pc.close().await?;
        Ok(())
    }
}

/// создаём Peer, подписываемся на все уведомления и готовим приём аудио и видео
async fn new_peer(
    config: RTCConfiguration,
    events: PrimitiveEvents,
) -> Result<Arc<RTCPeerConnection>> {
    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs()?;
    let mut registry = Registry::new();
    registry = register_default_interceptors(registry, &mut media_engine)?;

    let api = APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build();

    let pc = Arc::new(api.new_peer_connection(config).await?);

    // Локальные кандидаты уходят в контроллер, фильтрация там
    let ev = events.clone();
    pc.on_ice_candidate(Box::new(move |cand: Option<RTCIceCandidate>| {
        let ev = ev.clone();
        Box::pin(async move {
            match cand {
                Some(c) => {
                    dump_candidate("LOCAL", &c);
                    match c.to_json() {
                        Ok(init) => {
                            ev.emit(PrimitiveEvent::LocalCandidate(IceCandidate {
                                candidate: init.candidate,
                                sdp_mid: init.sdp_mid,
                                sdp_mline_index: init.sdp_mline_index,
                                username_fragment: init.username_fragment,
                            }));
                        }
                        Err(e) => warn!("Failed to serialize local candidate: {e}"),
                    }
                }
                // None означает конец сбора
                None => debug!("ICE candidate gathering completed (null candidate received)"),
            }
        })
    }));

    let ev = events.clone();
    pc.on_ice_gathering_state_change(Box::new(move |state: RTCIceGathererState| {
        let mapped = match state {
            RTCIceGathererState::New => Some(IceGatheringState::New),
            RTCIceGathererState::Gathering => Some(IceGatheringState::Gathering),
            RTCIceGathererState::Complete => Some(IceGatheringState::Complete),
            _ => None,
        };
        if let Some(mapped) = mapped {
            ev.emit(PrimitiveEvent::IceGatheringState(mapped));
        }
        Box::pin(async {})
    }));

    let ev = events.clone();
    pc.on_ice_connection_state_change(Box::new(move |state: RTCIceConnectionState| {
        ev.emit(PrimitiveEvent::IceConnectionState(state.into()));
        Box::pin(async {})
    }));

    // слабая ссылка, чтобы обработчик не держал сам peer
    let ev = events.clone();
    let pc_stats: Weak<RTCPeerConnection> = Arc::downgrade(&pc);
    pc.on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
        if st == RTCPeerConnectionState::Failed {
            if let Some(pc) = pc_stats.upgrade() {
                tokio::spawn(async move {
                    dump_selected_pair(&pc, "BEFORE-FAIL").await;
                });
            }
        }
        ev.emit(PrimitiveEvent::ConnectionState(st.into()));
        Box::pin(async {})
    }));

    let ev = events.clone();
    pc.on_track(Box::new(
        move |track: Arc<TrackRemote>,
              _receiver: Arc<RTCRtpReceiver>,
              _transceiver: Arc<RTCRtpTransceiver>| {
            let ev = ev.clone();
            let track_id = track.id();
            let kind = track.kind().to_string();
            info!(%track_id, %kind, "Received remote track");
            ev.emit(PrimitiveEvent::TrackAdded {
                track_id: track_id.clone(),
                kind,
            });

            // Декодирование вне ядра: просто вычитываем RTP, пока трек жив
            tokio::spawn(async move {
                while track.read_rtp().await.is_ok() {}
                debug!(%track_id, "Remote track ended");
                ev.emit(PrimitiveEvent::TrackEnded { track_id });
            });
            Box::pin(async {})
        },
    ));

    for kind in [RTPCodecType::Video, RTPCodecType::Audio] {
        pc.add_transceiver_from_kind(
            kind,
            Some(RTCRtpTransceiverInit {
                direction: RTCRtpTransceiverDirection::Recvonly,
                send_encodings: vec![],
            }),
        )
        .await?;
    }

    Ok(pc)
}

/// Создает конфигурацию для peer connection
fn rtc_config(servers: &[ServerConfig]) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: get_user_ice_servers(servers),
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    }
}

pub fn get_user_ice_servers(servers: &[ServerConfig]) -> Vec<RTCIceServer> {
    servers
        .iter()
        .map(|config| RTCIceServer {
            urls: vec![add_ice_url_scheme(config)],
            username: config.username.clone().unwrap_or_default(),
            credential: config.credential.clone().unwrap_or_default(),
        })
        .collect()
}

impl From<RTCPeerConnectionState> for ConnectionState {
    fn from(state: RTCPeerConnectionState) -> Self {
        match state {
            RTCPeerConnectionState::Connecting => Self::Connecting,
            RTCPeerConnectionState::Connected => Self::Connected,
            RTCPeerConnectionState::Disconnected => Self::Disconnected,
            RTCPeerConnectionState::Failed => Self::Failed,
            RTCPeerConnectionState::Closed => Self::Closed,
            _ => Self::New,
        }
    }
}

impl From<RTCIceConnectionState> for IceConnectionState {
    fn from(state: RTCIceConnectionState) -> Self {
        match state {
            RTCIceConnectionState::Checking => Self::Checking,
            RTCIceConnectionState::Connected => Self::Connected,
            RTCIceConnectionState::Completed => Self::Completed,
            RTCIceConnectionState::Disconnected => Self::Disconnected,
            RTCIceConnectionState::Failed => Self::Failed,
            RTCIceConnectionState::Closed => Self::Closed,
            _ => Self::New,
        }
    }
}
