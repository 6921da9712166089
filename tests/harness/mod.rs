// Подставные канал сигнализации и peer connection.
// Настоящий цикл сессии работает поверх них; тест шлёт события канала и
// примитива и смотрит, что цикл отправил или применил.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stream_viewer_lib::error::{Error, Result};
use stream_viewer_lib::peer::{
    ConnectionState, IceCandidate, IceConnectionState, NegotiationPrimitive, PrimitiveEvent,
    PrimitiveEvents, PrimitiveFactory,
};
use stream_viewer_lib::signaling::{
    ChannelEvent, ChannelEvents, ChannelHandle, OutboundMessage, SignalingConnector,
};
use stream_viewer_lib::{spawn_session, SessionConfig, SessionHandle, SessionView, Status, Timing};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

// ---------- сигнализация ----------

/// Тестовая сторона одного открытого канала
#[derive(Clone)]
pub struct ChannelTap {
    events: ChannelEvents,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    closed: Arc<AtomicBool>,
}

impl ChannelTap {
    pub fn open(&self) {
        self.events.emit(ChannelEvent::Opened);
    }

    pub fn deliver(&self, text: impl Into<String>) {
        self.events.emit(ChannelEvent::Message(text.into()));
    }

    pub fn fail(&self, reason: &str) {
        self.events.emit(ChannelEvent::Error(reason.to_string()));
    }

    /// Сервер рвёт соединение
    pub fn drop_connection(&self) {
        self.events.emit(ChannelEvent::Closed);
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn offers(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                OutboundMessage::Offer { sdp } => Some(sdp),
                _ => None,
            })
            .collect()
    }

    /// Типы отправленных сообщений по порядку
    pub fn kinds(&self) -> Vec<&'static str> {
        self.sent().iter().map(OutboundMessage::kind).collect()
    }

    pub fn candidates(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                OutboundMessage::IceCandidate { candidate } => Some(candidate.candidate),
                _ => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct FakeChannel {
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    closed: Arc<AtomicBool>,
}

impl ChannelHandle for FakeChannel {
    fn send(&self, message: &OutboundMessage) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ChannelClosed);
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeConnector {
    channels: Mutex<Vec<ChannelTap>>,
}

impl FakeConnector {
    pub fn count(&self) -> usize {
        self.channels.lock().unwrap().len()
    }

    pub fn channel(&self, index: usize) -> ChannelTap {
        self.channels.lock().unwrap()[index].clone()
    }

    pub fn last(&self) -> ChannelTap {
        let channels = self.channels.lock().unwrap();
        channels.last().cloned().expect("no channel opened")
    }
}

impl SignalingConnector for FakeConnector {
    fn open(&self, events: ChannelEvents) -> Box<dyn ChannelHandle> {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        self.channels.lock().unwrap().push(ChannelTap {
            events,
            sent: sent.clone(),
            closed: closed.clone(),
        });
        Box::new(FakeChannel { sent, closed })
    }
}

// ---------- peer connection ----------

pub struct FakePrimitive {
    number: usize,
    events: PrimitiveEvents,
    gate: Option<Arc<Notify>>,
    gather: Vec<String>,
    local: Mutex<Option<String>>,
    remote: Mutex<Option<String>>,
    applied: Mutex<Vec<String>>,
    connection: Mutex<ConnectionState>,
    ice: Mutex<IceConnectionState>,
    closed: AtomicBool,
}

impl FakePrimitive {
    pub fn local_description(&self) -> Option<String> {
        self.local.lock().unwrap().clone()
    }

    pub fn remote_description(&self) -> Option<String> {
        self.remote.lock().unwrap().clone()
    }

    /// Все вызовы add_candidate по порядку, отклонённые тоже
    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn report_connection(&self, state: ConnectionState) {
        *self.connection.lock().unwrap() = state;
        self.events.emit(PrimitiveEvent::ConnectionState(state));
    }

    pub fn report_ice(&self, state: IceConnectionState) {
        *self.ice.lock().unwrap() = state;
        self.events.emit(PrimitiveEvent::IceConnectionState(state));
    }

    /// Состояние меняется без колбэка, будто он потерялся или опоздал
    pub fn set_connection_silently(&self, state: ConnectionState) {
        *self.connection.lock().unwrap() = state;
    }

    pub fn set_ice_silently(&self, state: IceConnectionState) {
        *self.ice.lock().unwrap() = state;
    }

    pub fn emit(&self, event: PrimitiveEvent) {
        self.events.emit(event);
    }
}

#[async_trait]
impl NegotiationPrimitive for FakePrimitive {
    async fn create_offer(&self) -> Result<String> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(format!("offer-{}", self.number))
    }

    async fn set_local_description(&self, sdp: String) -> Result<()> {
        *self.local.lock().unwrap() = Some(sdp);
        // как в webrtc: сбор кандидатов стартует внутри set_local_description
        for candidate in &self.gather {
            self.events
                .emit(PrimitiveEvent::LocalCandidate(IceCandidate::new(candidate.as_str())));
        }
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn set_remote_description(&self, sdp: String) -> Result<()> {
        if sdp.contains("garbage") {
            return Err(Error::Negotiation("unparseable answer".into()));
        }
        *self.remote.lock().unwrap() = Some(sdp);
        Ok(())
    }

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<()> {
        if self.remote.lock().unwrap().is_none() {
            return Err(Error::CandidateRejected("no remote description".into()));
        }
        self.applied.lock().unwrap().push(candidate.candidate.clone());
        if candidate.candidate.contains("bogus") {
            return Err(Error::CandidateRejected(candidate.candidate));
        }
        Ok(())
    }

    fn connection_state(&self) -> ConnectionState {
        *self.connection.lock().unwrap()
    }

    fn ice_connection_state(&self) -> IceConnectionState {
        *self.ice.lock().unwrap()
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeFactory {
    primitives: Mutex<Vec<Arc<FakePrimitive>>>,
    offer_gate: Mutex<Option<Arc<Notify>>>,
    gather: Mutex<Vec<String>>,
    refuse: AtomicBool,
}

impl FakeFactory {
    pub fn count(&self) -> usize {
        self.primitives.lock().unwrap().len()
    }

    pub fn primitive(&self, index: usize) -> Arc<FakePrimitive> {
        self.primitives.lock().unwrap()[index].clone()
    }

    pub fn last(&self) -> Arc<FakePrimitive> {
        let primitives = self.primitives.lock().unwrap();
        primitives.last().cloned().expect("no primitive created")
    }

    /// Offer у новых примитивов ждёт возвращённый gate
    pub fn hold_offers(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.offer_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Новые примитивы выдают эти кандидаты из set_local_description
    pub fn gather_on_local_description(&self, candidates: &[String]) {
        *self.gather.lock().unwrap() = candidates.to_vec();
    }

    pub fn refuse_creation(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PrimitiveFactory for FakeFactory {
    async fn create(&self, events: PrimitiveEvents) -> Result<Arc<dyn NegotiationPrimitive>> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(Error::Negotiation("peer connection unavailable".into()));
        }
        let mut primitives = self.primitives.lock().unwrap();
        let primitive = Arc::new(FakePrimitive {
            number: primitives.len() + 1,
            events,
            gate: self.offer_gate.lock().unwrap().clone(),
            gather: self.gather.lock().unwrap().clone(),
            local: Mutex::new(None),
            remote: Mutex::new(None),
            applied: Mutex::new(Vec::new()),
            connection: Mutex::new(ConnectionState::New),
            ice: Mutex::new(IceConnectionState::New),
            closed: AtomicBool::new(false),
        });
        primitives.push(primitive.clone());
        Ok(primitive as Arc<dyn NegotiationPrimitive>)
    }
}

// ---------- сессия ----------

pub struct Harness {
    pub handle: SessionHandle,
    pub connector: Arc<FakeConnector>,
    pub factory: Arc<FakeFactory>,
    pub task: JoinHandle<()>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_timing(Timing::default())
    }

    pub fn with_timing(timing: Timing) -> Self {
        let connector = Arc::new(FakeConnector::default());
        let factory = Arc::new(FakeFactory::default());
        let config = SessionConfig::default().with_timing(timing);
        let (handle, task) = spawn_session(config, connector.clone(), factory.clone());
        Self {
            handle,
            connector,
            factory,
            task,
        }
    }

    pub fn view(&self) -> SessionView {
        self.handle.view()
    }

    pub fn status(&self) -> Status {
        self.handle.status()
    }

    /// start -> канал открыт -> offer отправлен
    pub async fn negotiate(&self) -> (ChannelTap, Arc<FakePrimitive>) {
        self.handle.start().unwrap();
        settle().await;
        let channel = self.connector.last();
        channel.open();
        settle().await;
        (channel, self.factory.last())
    }

    /// Полный путь до `connected`
    pub async fn connect(&self) -> (ChannelTap, Arc<FakePrimitive>) {
        let (channel, primitive) = self.negotiate().await;
        channel.deliver(answer("answer-sdp"));
        settle().await;
        primitive.report_ice(IceConnectionState::Connected);
        primitive.report_connection(ConnectionState::Connected);
        settle().await;
        assert_eq!(self.status(), Status::Connected);
        (channel, primitive)
    }
}

/// Дать задачам и циклу сессии отработать, не двигая часы
pub async fn settle() {
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
}

/// Двигаем остановленные часы по секунде
pub async fn advance_secs(seconds: u64) {
    for _ in 0..seconds {
        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
    }
}

/// При `connected`, `failed` и `stopped` флаг isConnecting снят
pub fn assert_guard_consistent(view: &SessionView) {
    if matches!(
        view.status,
        Status::Connected | Status::Failed | Status::Stopped
    ) {
        assert!(
            !view.is_connecting,
            "isConnecting set while status is {}",
            view.status
        );
    }
}

// ---------- сообщения ----------

pub fn answer(sdp: &str) -> String {
    json!({ "type": "answer", "sdp": sdp }).to_string()
}

pub fn remote_candidate(candidate: &str) -> String {
    json!({
        "type": "ice-candidate",
        "candidate": { "candidate": candidate, "sdpMid": "0", "sdpMLineIndex": 0 }
    })
    .to_string()
}

pub fn lifecycle(kind: &str) -> String {
    json!({ "type": kind, "message": format!("{kind} from server") }).to_string()
}

pub fn host_candidate(address: &str, port: u16) -> String {
    format!("candidate:1 1 udp 2122260223 {address} {port} typ host")
}
