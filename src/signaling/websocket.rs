// Канал сигнализации поверх WebSocket

use crate::error::{Error, Result};
use crate::signaling::messages::OutboundMessage;
use crate::signaling::transport::{ChannelEvent, ChannelEvents, ChannelHandle, SignalingConnector};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl SignalingConnector for WebSocketConnector {
    fn open(&self, events: ChannelEvents) -> Box<dyn ChannelHandle> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(self.url.clone(), rx, events));
        Box::new(WebSocketChannel { tx: Some(tx) })
    }
}

pub struct WebSocketChannel {
    tx: Option<mpsc::UnboundedSender<Message>>,
}

impl ChannelHandle for WebSocketChannel {
    fn send(&self, message: &OutboundMessage) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(Error::ChannelClosed)?;
        tx.send(Message::Text(message.to_json()?))
            .map_err(|_| Error::ChannelClosed)
    }

    fn close(&mut self) {
        // writer увидит закрытый канал и отправит Close
        self.tx.take();
    }
}

async fn run_socket(
    url: String,
    mut outgoing: mpsc::UnboundedReceiver<Message>,
    events: ChannelEvents,
) {
    let channel = events.channel();
    info!(%channel, %url, "Connecting to signaling server");

    let ws = match connect_async(url.as_str()).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            error!(%channel, "Failed to connect to signaling server: {e}");
            events.emit(ChannelEvent::Error(e.to_string()));
            events.emit(ChannelEvent::Closed);
            return;
        }
    };

    info!(%channel, "WebSocket connected to server");
    events.emit(ChannelEvent::Opened);

    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            out = outgoing.recv() => match out {
                Some(msg) => {
                    if let Err(e) = write.send(msg).await {
                        error!(%channel, "Failed to send WebSocket message: {e}");
                        events.emit(ChannelEvent::Error(e.to_string()));
                        break;
                    }
                }
                None => {
                    debug!(%channel, "Channel closed locally");
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    events.emit(ChannelEvent::Message(text));
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(%channel, ?frame, "WebSocket connection closed by server");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(%channel, "WebSocket error: {e}");
                    events.emit(ChannelEvent::Error(e.to_string()));
                    break;
                }
                None => {
                    info!(%channel, "WebSocket stream ended");
                    break;
                }
            },
        }
    }

    events.emit(ChannelEvent::Closed);
}
