use crate::error::{Error, Result};
use crate::session::events::{Command, CommandSender};
use crate::session::state::{SessionView, Status};
use tokio::sync::watch;
use tracing::debug;

/// Управление сессией снаружи (CLI, тесты, UI-обёртка).
/// Клоны разделяют одну сессию; цикл завершается, когда отпущен последний.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: CommandSender,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    pub fn new(commands: CommandSender, view: watch::Receiver<SessionView>) -> Self {
        Self { commands, view }
    }

    /// Начать просмотр; игнорируется, пока идёт согласование
    pub fn start(&self) -> Result<()> {
        self.send(Command::Start)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    pub fn cancel_auto_recovery(&self) -> Result<()> {
        self.send(Command::CancelAutoRecovery)
    }

    /// Область интереса в нормированных координатах кадра
    pub fn send_roi(&self, points: Vec<[f64; 2]>) -> Result<()> {
        self.send(Command::SendRoi(points))
    }

    /// stop и завершение цикла сессии
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn status(&self) -> Status {
        self.view.borrow().status
    }

    /// Отдельный приёмник для тех, кто ждёт изменений
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Дождаться снимка, удовлетворяющего условию
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&SessionView) -> bool,
    ) -> Result<SessionView> {
        let mut rx = self.view.clone();
        let view = rx
            .wait_for(|view| predicate(view))
            .await
            .map_err(|_| Error::SessionClosed)?;
        Ok(view.clone())
    }

    pub async fn wait_for_status(&self, status: Status) -> Result<SessionView> {
        self.wait_for(|view| view.status == status).await
    }

    fn send(&self, command: Command) -> Result<()> {
        debug!(?command, "Session command");
        self.commands.send(command).map_err(|_| Error::SessionClosed)
    }
}
