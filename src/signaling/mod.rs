pub mod messages;
pub mod transport;
pub mod websocket;

pub use messages::{InboundMessage, OutboundMessage};
pub use transport::{ChannelEvent, ChannelEvents, ChannelHandle, SignalingConnector};
pub use websocket::WebSocketConnector;
