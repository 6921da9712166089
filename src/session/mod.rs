pub mod controller;
pub mod events;
pub mod liveness;
pub mod recovery;
pub mod state;

pub use controller::SessionController;
pub use events::{AttemptId, ChannelId, Command};
pub use state::{SessionView, Status};

use crate::commands::SessionHandle;
use crate::config::SessionConfig;
use crate::peer::primitive::PrimitiveFactory;
use crate::signaling::transport::SignalingConnector;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Запуск цикла сессии в отдельной задаче
pub fn spawn_session(
    config: SessionConfig,
    connector: Arc<dyn SignalingConnector>,
    factory: Arc<dyn PrimitiveFactory>,
) -> (SessionHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = events::event_channel();
    let (view_tx, view_rx) = watch::channel(SessionView::default());

    let controller = SessionController::new(config, connector, factory, event_tx, view_tx);
    let task = tokio::spawn(controller.run(command_rx, event_rx));

    (SessionHandle::new(command_tx, view_rx), task)
}
