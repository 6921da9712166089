// Конечный автомат сессии.
//
// Один цикл владеет всей сессией: каналом сигнализации, примитивом,
// очередью кандидатов и таймерами. Команды, сообщения сигнализации,
// колбэки примитива и тики таймеров приходят в произвольном порядке и
// обрабатываются строго по одному. Асинхронные операции примитива
// выполняются в отдельных задачах и возвращаются событием с номером
// попытки; результат устаревшей попытки выбрасывается.

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::logger::{status_change, user_action};
use crate::peer::ice::{analyze_candidates, is_unreachable_candidate, Admission, CandidateQueue};
use crate::peer::primitive::{NegotiationPrimitive, PrimitiveEvent, PrimitiveEvents, PrimitiveFactory};
use crate::peer::types::{ConnectionState, IceCandidate, IceConnectionState, IceGatheringState};
use crate::session::events::{
    AttemptId, ChannelId, Command, CommandReceiver, EventReceiver, EventSender, SessionEvent,
};
use crate::session::liveness::{is_session_healthy, LivenessSnapshot};
use crate::session::recovery::{RecoveryTimer, Tick};
use crate::session::state::{MediaSink, SessionView, Status, TaskSlot};
use crate::signaling::messages::{InboundMessage, OutboundMessage};
use crate::signaling::transport::{ChannelEvent, ChannelEvents, ChannelHandle, SignalingConnector};
use crate::utils::random_id;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Открытый или открывающийся канал сигнализации
struct LiveChannel {
    id: ChannelId,
    handle: Box<dyn ChannelHandle>,
    open: bool,
}

/// Текущая попытка согласования
struct Negotiation {
    attempt: AttemptId,
    primitive: Arc<dyn NegotiationPrimitive>,
    offer_requested: bool,
    offer_sent: bool,
    /// Локальные кандидаты, собранные до отправки offer
    pending_local: Vec<IceCandidate>,
    remote_description_pending: bool,
}

/// Всё состояние сессии; принадлежит только контроллеру
struct Session {
    id: String,
    status: Status,
    server_status: Option<String>,
    error: Option<String>,
    connection_state: ConnectionState,
    ice_connection_state: IceConnectionState,
    ice_gathering_state: IceGatheringState,
    is_connecting: bool,
    channel: Option<LiveChannel>,
    negotiation: Option<Negotiation>,
    candidates: CandidateQueue,
    media: MediaSink,
    recovery: RecoveryTimer,
    self_check: TaskSlot,
    reopen: TaskSlot,
    reopen_generation: u64,
}

pub struct SessionController {
    config: SessionConfig,
    connector: Arc<dyn SignalingConnector>,
    factory: Arc<dyn PrimitiveFactory>,
    events: EventSender,
    view: watch::Sender<SessionView>,
    session: Session,
    next_attempt: u64,
    next_channel: u64,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        connector: Arc<dyn SignalingConnector>,
        factory: Arc<dyn PrimitiveFactory>,
        events: EventSender,
        view: watch::Sender<SessionView>,
    ) -> Self {
        let recovery = RecoveryTimer::new(
            config.timing.recovery_countdown,
            config.timing.recovery_tick,
        );
        Self {
            config,
            connector,
            factory,
            events,
            view,
            session: Session {
                id: random_id(),
                status: Status::Stopped,
                server_status: None,
                error: None,
                connection_state: ConnectionState::New,
                ice_connection_state: IceConnectionState::New,
                ice_gathering_state: IceGatheringState::New,
                is_connecting: false,
                channel: None,
                negotiation: None,
                candidates: CandidateQueue::new(),
                media: MediaSink::default(),
                recovery,
                self_check: TaskSlot::default(),
                reopen: TaskSlot::default(),
                reopen_generation: 0,
            },
            next_attempt: 0,
            next_channel: 0,
        }
    }

    /// Цикл сессии. Завершается по `Shutdown` или когда все хэндлы отпущены.
    pub async fn run(mut self, mut commands: CommandReceiver, mut events: EventReceiver) {
        info!(session = %self.session.id, "Session loop started");
        self.publish();

        loop {
            let flow = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("All session handles dropped");
                        ControlFlow::Break(())
                    }
                },
                Some(event) = events.recv() => {
                    self.handle_event(event).await;
                    ControlFlow::Continue(())
                }
            };
            self.publish();
            if flow.is_break() {
                break;
            }
        }

        if self.session.status != Status::Stopped || self.session.channel.is_some() {
            self.stop().await;
            self.publish();
        }
        info!(session = %self.session.id, "Session loop finished");
    }

    pub async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Start => self.start().await,
            Command::Stop => self.stop().await,
            Command::CancelAutoRecovery => self.cancel_auto_recovery(),
            Command::SendRoi(points) => self.send_roi(points),
            Command::Shutdown => {
                self.stop().await;
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    pub async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Channel { channel, event } => self.on_channel_event(channel, event).await,
            SessionEvent::Primitive { attempt, event } => {
                self.on_primitive_event(attempt, event).await
            }
            SessionEvent::OfferReady { attempt, result } => self.on_offer_ready(attempt, result),
            SessionEvent::RemoteDescriptionSet { attempt, result } => {
                self.on_remote_description_set(attempt, result).await
            }
            SessionEvent::RecoveryTick { generation } => self.on_recovery_tick(generation).await,
            SessionEvent::SelfCheck { attempt } => self.on_self_check(attempt),
            SessionEvent::ReopenChannel { generation } => self.on_reopen(generation).await,
        }
    }

    // ========== COMMANDS ==========

    async fn start(&mut self) {
        if self.session.is_connecting {
            debug!("Start ignored: negotiation already in progress");
            return;
        }

        user_action("Start WebRTC", &format!("Current status: {}", self.session.status));
        self.launch_attempt().await;
    }

    async fn stop(&mut self) {
        let channel_open = self.channel_is_open();
        user_action(
            "Stop WebRTC",
            &format!(
                "Stopping from status: {}, signaling connected: {channel_open}",
                self.session.status
            ),
        );

        if let Some(left) = self.session.recovery.cancel() {
            debug!(left, "Auto-recovery cancelled by stop");
        }
        self.session.self_check.cancel();
        if self.session.reopen.is_pending() {
            debug!("Pending signaling channel reopen cancelled by stop");
        }
        self.session.reopen.cancel();
        self.session.is_connecting = false;

        if let Some(mut channel) = self.session.channel.take() {
            debug!(channel = %channel.id, "Closing signaling channel");
            channel.handle.close();
        }
        self.retire_negotiation().await;

        self.session.error = None;
        self.session.server_status = None;
        self.set_status(Status::Stopped);
        info!("WebRTC connection stopped");
    }

    fn cancel_auto_recovery(&mut self) {
        match self.session.recovery.cancel() {
            Some(left) => {
                user_action(
                    "Cancel Auto-recovery",
                    &format!("Cancelled with {left} seconds remaining"),
                );
                info!("Auto-recovery cancelled by user");
            }
            None => debug!("No auto-recovery to cancel"),
        }
    }

    fn send_roi(&mut self, points: Vec<[f64; 2]>) {
        if !self.channel_is_open() {
            warn!("Signaling channel not open, ROI dropped");
            return;
        }
        if let Err(e) = self.send(&OutboundMessage::Roi { points }) {
            warn!("Failed to send ROI: {e}");
        }
    }

    // ========== NEGOTIATION ==========

    /// Новая попытка: старый примитив закрываем, канал переиспользуем, если открыт
    async fn launch_attempt(&mut self) {
        self.session.is_connecting = true;
        self.set_status(Status::Connecting);
        self.session.error = None;
        if let Some(left) = self.session.recovery.cancel() {
            debug!(left, "New attempt supersedes pending auto-recovery");
        }
        self.session.reopen.cancel();
        self.session.self_check.cancel();
        self.retire_negotiation().await;

        self.next_attempt += 1;
        let attempt = AttemptId(self.next_attempt);
        self.session.id = random_id();

        let events = PrimitiveEvents::new(attempt, self.events.clone());
        let primitive = match self.factory.create(events).await {
            Ok(primitive) => primitive,
            Err(e) => {
                self.fail(format!("Failed to start WebRTC: {e}"));
                return;
            }
        };
        info!(%attempt, session = %self.session.id, "Negotiation attempt created");

        self.session.negotiation = Some(Negotiation {
            attempt,
            primitive,
            offer_requested: false,
            offer_sent: false,
            pending_local: Vec::new(),
            remote_description_pending: false,
        });

        match self.session.channel.as_ref().map(|c| (c.id, c.open)) {
            Some((channel, true)) => {
                info!(%channel, "Reusing open signaling channel");
                self.request_offer();
            }
            // ещё открывается: offer уйдёт по Opened
            Some((channel, false)) => debug!(%channel, "Waiting for signaling channel to open"),
            None => self.open_channel(),
        }
    }

    fn open_channel(&mut self) {
        self.next_channel += 1;
        let id = ChannelId(self.next_channel);
        let handle = self
            .connector
            .open(ChannelEvents::new(id, self.events.clone()));
        self.session.channel = Some(LiveChannel {
            id,
            handle,
            open: false,
        });
        debug!(channel = %id, "Opening signaling channel");
    }

    /// Закрыть примитив текущей попытки и всё, что к нему относится
    async fn retire_negotiation(&mut self) {
        if !self.session.candidates.is_empty() {
            debug!(
                dropped = self.session.candidates.len(),
                "Discarding queued remote candidates"
            );
        }
        self.session.candidates.reset();
        self.session.media.clear();
        self.session.connection_state = ConnectionState::New;
        self.session.ice_connection_state = IceConnectionState::New;
        self.session.ice_gathering_state = IceGatheringState::New;

        if let Some(negotiation) = self.session.negotiation.take() {
            debug!(attempt = %negotiation.attempt, "Closing old peer connection");
            if let Err(e) = negotiation.primitive.close().await {
                warn!(attempt = %negotiation.attempt, "Failed to close peer connection: {e}");
            }
        }
    }

    fn request_offer(&mut self) {
        let Some(negotiation) = self.session.negotiation.as_mut() else {
            return;
        };
        if negotiation.offer_requested {
            return;
        }
        negotiation.offer_requested = true;

        let attempt = negotiation.attempt;
        let primitive = negotiation.primitive.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result: Result<String> = async {
                let sdp = primitive.create_offer().await?;
                primitive.set_local_description(sdp.clone()).await?;
                Ok(sdp)
            }
            .await;
            let _ = tx.send(SessionEvent::OfferReady { attempt, result });
        });
    }

    fn on_offer_ready(&mut self, attempt: AttemptId, result: Result<String>) {
        if !self.is_live(attempt) {
            debug!(%attempt, "Discarding offer of superseded attempt");
            return;
        }

        let sdp = match result {
            Ok(sdp) => sdp,
            Err(e) => {
                self.fail(format!("Failed to create offer: {e}"));
                return;
            }
        };
        debug!(%attempt, "Created and set local SDP offer");

        if let Err(e) = self.send(&OutboundMessage::Offer { sdp }) {
            self.fail(format!("Failed to send offer: {e}"));
            return;
        }
        info!(%attempt, "Sent SDP offer to server");

        let pending = match self.session.negotiation.as_mut() {
            Some(negotiation) => {
                negotiation.offer_sent = true;
                std::mem::take(&mut negotiation.pending_local)
            }
            None => Vec::new(),
        };
        if !pending.is_empty() {
            debug!(count = pending.len(), "Flushing local candidates gathered before offer");
        }
        for candidate in pending {
            self.send_local_candidate(candidate);
        }

        self.schedule_self_check(attempt, self.config.timing.offer_self_check_delay);
    }

    fn on_answer(&mut self, sdp: String) {
        let ready = self.session.candidates.is_ready();
        let Some(negotiation) = self.session.negotiation.as_mut() else {
            debug!("No live peer connection, ignoring answer");
            return;
        };
        if ready || negotiation.remote_description_pending {
            warn!(attempt = %negotiation.attempt, "Duplicate answer ignored");
            return;
        }
        negotiation.remote_description_pending = true;

        let attempt = negotiation.attempt;
        let primitive = negotiation.primitive.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = primitive.set_remote_description(sdp).await;
            let _ = tx.send(SessionEvent::RemoteDescriptionSet { attempt, result });
        });
    }

    async fn on_remote_description_set(&mut self, attempt: AttemptId, result: Result<()>) {
        let Some(negotiation) = self
            .session
            .negotiation
            .as_mut()
            .filter(|n| n.attempt == attempt)
        else {
            debug!(%attempt, "Discarding remote description of superseded attempt");
            return;
        };
        negotiation.remote_description_pending = false;
        let primitive = negotiation.primitive.clone();

        if let Err(e) = result {
            self.fail(format!("Failed to set remote description: {e}"));
            return;
        }
        info!(%attempt, "Set remote description successfully");

        let pending = self.session.candidates.mark_ready();
        if !pending.is_empty() {
            info!(count = pending.len(), "Processing pending ICE candidates");
            analyze_candidates(&pending);
        }
        for candidate in pending {
            apply_candidate(primitive.as_ref(), candidate).await;
        }
    }

    async fn on_remote_candidate(&mut self, candidate: IceCandidate) {
        let Some(negotiation) = self.session.negotiation.as_ref() else {
            debug!("No live peer connection, dropping remote candidate");
            return;
        };
        let primitive = negotiation.primitive.clone();

        if let Admission::ApplyNow(candidate) = self.session.candidates.admit(candidate) {
            apply_candidate(primitive.as_ref(), candidate).await;
        }
    }

    fn on_local_candidate(&mut self, candidate: IceCandidate) {
        if is_unreachable_candidate(&candidate.candidate) {
            debug!("Skipping mDNS/link-local candidate (not suitable for cross-device connection)");
            return;
        }
        // кандидат не должен обогнать offer
        if let Some(negotiation) = self.session.negotiation.as_mut() {
            if !negotiation.offer_sent {
                negotiation.pending_local.push(candidate);
                debug!(
                    buffered = negotiation.pending_local.len(),
                    "Offer not sent yet, holding local candidate"
                );
                return;
            }
        }
        self.send_local_candidate(candidate);
    }

    fn send_local_candidate(&mut self, candidate: IceCandidate) {
        if !self.channel_is_open() {
            debug!("Signaling channel not open, local candidate dropped");
            return;
        }

        debug!(endpoint = ?candidate.endpoint(), "Sending ICE candidate");
        if let Err(e) = self.send(&OutboundMessage::IceCandidate { candidate }) {
            warn!("Failed to send ICE candidate: {e}");
        }
    }

    // ========== SIGNALING ==========

    async fn on_channel_event(&mut self, channel: ChannelId, event: ChannelEvent) {
        if self.session.channel.as_ref().map(|c| c.id) != Some(channel) {
            trace!(%channel, ?event, "Event from replaced signaling channel ignored");
            return;
        }

        match event {
            ChannelEvent::Opened => {
                if let Some(live) = self.session.channel.as_mut() {
                    live.open = true;
                }
                info!(%channel, "Signaling channel open");
                self.request_offer();
            }
            ChannelEvent::Message(text) => match InboundMessage::parse(&text) {
                Ok(message) => self.on_message(message).await,
                Err(e) => {
                    warn!(%channel, "Signaling error: {e}");
                    self.session.error = Some(format!("Signaling error: {e}"));
                }
            },
            ChannelEvent::Error(e) => {
                self.fail(format!("WebSocket connection failed: {e}"));
            }
            ChannelEvent::Closed => self.on_channel_closed(),
        }
    }

    fn on_channel_closed(&mut self) {
        if let Some(mut channel) = self.session.channel.take() {
            info!(channel = %channel.id, "Signaling channel closed by server");
            channel.handle.close();
        }
        if self.session.status == Status::Stopped {
            return;
        }

        self.session.is_connecting = false;
        if self.session.status != Status::Failed {
            self.set_status(Status::Disconnected);
        }

        let delay = self.config.timing.channel_reopen_delay;
        self.session.server_status = Some(format!(
            "Signaling channel lost - reconnecting in {}s",
            delay.as_secs()
        ));
        info!("Attempting to reopen signaling channel in {delay:?}");

        self.session.reopen_generation += 1;
        let generation = self.session.reopen_generation;
        let tx = self.events.clone();
        self.session.reopen.replace(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SessionEvent::ReopenChannel { generation });
        }));
    }

    async fn on_reopen(&mut self, generation: u64) {
        if generation != self.session.reopen_generation || self.session.status == Status::Stopped {
            return;
        }
        if self.session.channel.is_some() {
            debug!("Signaling channel already replaced, reopen skipped");
            return;
        }
        info!("Auto-reconnecting signaling channel");
        self.launch_attempt().await;
    }

    async fn on_message(&mut self, message: InboundMessage) {
        debug!(kind = message.kind(), "Received signaling message");

        match message {
            InboundMessage::Answer { sdp } => self.on_answer(sdp),
            InboundMessage::IceCandidate { candidate } => self.on_remote_candidate(candidate).await,
            InboundMessage::Status { message } => {
                info!("Server status: {message}");
                self.session.server_status = Some(message);
                self.session.error = None;
            }
            InboundMessage::Error { message } => {
                self.fail(format!("Server error: {message}"));
            }
            InboundMessage::RemoteSourceDisconnected { message } => {
                info!("Remote source disconnected: {message}");
                self.session.server_status =
                    Some("Remote source disconnected - waiting for reconnection...".into());
                // is_connecting не трогаем: канал остаётся открытым до возвращения источника
                self.set_status(Status::Disconnected);
            }
            InboundMessage::RemoteSourceReconnecting { message } => {
                info!("Remote source reconnecting: {message}");
                self.session.server_status =
                    Some("Remote source reconnected - starting WebRTC...".into());
                self.set_status(Status::Connecting);
                self.session.error = None;
            }
            InboundMessage::NegotiationReady { message } => {
                info!("WebRTC auto-reconnected by server: {message}");
                self.session.server_status = Some("WebRTC connected successfully".into());
                self.session.error = None;
                self.session.is_connecting = false;
                self.set_status(Status::Connected);
            }
            InboundMessage::RemoteReadyForRenegotiation { message } => {
                info!("Remote source ready for reconnection: {message}");
                self.on_renegotiation_request("reconnection");
            }
            InboundMessage::RemoteWindowChanged { message } => {
                info!("Remote source window changed: {message}");
                self.on_renegotiation_request("window change");
            }
        }
    }

    fn on_renegotiation_request(&mut self, reason: &str) {
        let snapshot = self.liveness_snapshot();
        debug!(?snapshot, "Renegotiation request check");

        if is_session_healthy(&snapshot) {
            info!("WebRTC/media already working - ignoring {reason} request");
            self.session.server_status =
                Some(format!("WebRTC already connected - no {reason} needed"));
            user_action(
                "Auto-recovery Prevented",
                &format!("WebRTC already working - ignoring {reason} signal"),
            );
            return;
        }

        info!("WebRTC not working - scheduling auto-recovery after {reason}");
        self.session.server_status = Some(format!(
            "Remote source ready - auto-reconnecting in {} seconds",
            self.config.timing.recovery_countdown
        ));
        self.session.error = None;
        self.set_status(Status::ReadyForReconnect);
        if self.session.recovery.is_active() {
            debug!("Auto-recovery countdown already running, restarting it");
        }
        self.session.recovery.start(&self.events);
    }

    // ========== TIMERS ==========

    async fn on_recovery_tick(&mut self, generation: u64) {
        match self.session.recovery.on_tick(generation) {
            Tick::Stale => {}
            Tick::Remaining(left) => debug!(left, "Auto-recovery countdown"),
            Tick::Expired => {
                let snapshot = self.liveness_snapshot();
                if is_session_healthy(&snapshot) {
                    info!("Countdown final check: WebRTC/media working - cancelling auto-recovery");
                    self.session.server_status =
                        Some("Auto-recovery cancelled - WebRTC already working".into());
                    user_action(
                        "Auto-recovery Cancelled",
                        "Final check detected working WebRTC - countdown cancelled",
                    );
                    return;
                }

                user_action(
                    "Auto-recovery Triggered",
                    "System automatically reconnecting after countdown",
                );
                if self.channel_is_open() {
                    info!("Auto-recovery: renegotiating over existing signaling channel");
                } else {
                    info!("Auto-recovery: no open signaling channel, starting from scratch");
                }
                self.launch_attempt().await;
            }
        }
    }

    fn schedule_self_check(&mut self, attempt: AttemptId, delay: Duration) {
        let tx = self.events.clone();
        self.session.self_check.replace(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SessionEvent::SelfCheck { attempt });
        }));
    }

    /// Поправить статус, если колбэки пришли не в том порядке.
    /// Только connecting -> connected, явный failed не перекрываем.
    fn on_self_check(&mut self, attempt: AttemptId) {
        let Some(negotiation) = self.session.negotiation.as_ref().filter(|n| n.attempt == attempt)
        else {
            return;
        };
        let connection = negotiation.primitive.connection_state();
        let ice = negotiation.primitive.ice_connection_state();
        debug!(
            %attempt,
            %connection,
            %ice,
            status = %self.session.status,
            "Self-check"
        );

        if self.session.status != Status::Connecting {
            return;
        }

        let advisory = if connection == ConnectionState::Connected {
            "WebRTC connected (auto-corrected)"
        } else if ice.is_connected() && connection != ConnectionState::Failed {
            "WebRTC connected (ICE ready)"
        } else {
            return;
        };

        info!("Self-check: transport connected but status lagging, correcting");
        self.session.error = None;
        self.session.is_connecting = false;
        self.session.server_status = Some(advisory.into());
        self.set_status(Status::Connected);
    }

    // ========== PRIMITIVE CALLBACKS ==========

    async fn on_primitive_event(&mut self, attempt: AttemptId, event: PrimitiveEvent) {
        if !self.is_live(attempt) {
            trace!(%attempt, ?event, "Event from superseded peer connection ignored");
            return;
        }

        match event {
            PrimitiveEvent::ConnectionState(state) => self.on_connection_state(state),
            PrimitiveEvent::IceConnectionState(state) => {
                self.session.ice_connection_state = state;
                debug!(%state, "ICE connection state changed");
                if state == IceConnectionState::Failed {
                    self.session.error = Some("Network connection failed (ICE)".into());
                } else if state.is_connected() {
                    self.schedule_self_check(attempt, self.config.timing.ice_self_check_delay);
                }
            }
            PrimitiveEvent::IceGatheringState(state) => {
                self.session.ice_gathering_state = state;
                debug!(%state, "ICE gathering state changed");
            }
            PrimitiveEvent::LocalCandidate(candidate) => self.on_local_candidate(candidate),
            PrimitiveEvent::TrackAdded { track_id, kind } => {
                info!(%track_id, %kind, "Remote track attached");
                self.session.media.attach(track_id, kind);
            }
            PrimitiveEvent::TrackEnded { track_id } => {
                self.session.media.detach(&track_id);
            }
        }
    }

    fn on_connection_state(&mut self, state: ConnectionState) {
        self.session.connection_state = state;
        info!(%state, "WebRTC connection state changed");

        match state {
            ConnectionState::Connected => {
                self.session.error = None;
                self.session.server_status = None;
                self.session.is_connecting = false;
                self.set_status(Status::Connected);
            }
            ConnectionState::Failed | ConnectionState::Disconnected => {
                self.fail("WebRTC connection failed".into());
            }
            ConnectionState::Closed => {
                self.session.is_connecting = false;
                self.set_status(Status::Stopped);
            }
            ConnectionState::Connecting => self.set_status(Status::Connecting),
            ConnectionState::New => {}
        }
    }

    // ========== HELPERS ==========

    fn fail(&mut self, error: String) {
        warn!("{error}");
        self.session.error = Some(error);
        self.session.is_connecting = false;
        self.set_status(Status::Failed);
    }

    fn set_status(&mut self, status: Status) {
        let old = self.session.status;
        if old != status {
            status_change(old, status);
            self.session.status = status;
        }
    }

    fn is_live(&self, attempt: AttemptId) -> bool {
        self.session
            .negotiation
            .as_ref()
            .is_some_and(|n| n.attempt == attempt)
    }

    fn channel_is_open(&self) -> bool {
        self.session.channel.as_ref().is_some_and(|c| c.open)
    }

    fn send(&self, message: &OutboundMessage) -> Result<()> {
        match &self.session.channel {
            Some(channel) if channel.open => channel.handle.send(message),
            _ => Err(Error::ChannelClosed),
        }
    }

    fn liveness_snapshot(&self) -> LivenessSnapshot {
        let primitive = self.session.negotiation.as_ref().map(|n| &n.primitive);
        LivenessSnapshot {
            connection_state: primitive.map(|p| p.connection_state()),
            ice_connection_state: primitive.map(|p| p.ice_connection_state()),
            status: self.session.status,
            active_tracks: self.session.media.track_count(),
        }
    }

    pub fn snapshot(&self) -> SessionView {
        SessionView {
            status: self.session.status,
            server_status: self.session.server_status.clone(),
            error: self.session.error.clone(),
            countdown_seconds: self.session.recovery.remaining(),
            is_connecting: self.session.is_connecting,
            connection_state: self.session.connection_state,
            ice_connection_state: self.session.ice_connection_state,
            ice_gathering_state: self.session.ice_gathering_state,
        }
    }

    fn publish(&self) {
        let view = self.snapshot();
        self.view.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}

/// Ошибка отдельного кандидата сессию не роняет
async fn apply_candidate(primitive: &dyn NegotiationPrimitive, candidate: IceCandidate) {
    let endpoint = candidate.endpoint();
    match primitive.add_candidate(candidate).await {
        Ok(()) => debug!(?endpoint, "Added ICE candidate successfully"),
        Err(e) => warn!(?endpoint, "Failed to add ICE candidate: {e}"),
    }
}
