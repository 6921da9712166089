pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod utils;

pub use commands::SessionHandle;
pub use config::{SessionConfig, Timing};
pub use error::{Error, Result};
pub use session::{spawn_session, SessionView, Status};

use crate::peer::RtcPrimitiveFactory;
use crate::signaling::WebSocketConnector;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Консольный просмотрщик: сессия + команды со stdin + вывод статуса
pub async fn run(config: SessionConfig, autostart: bool) -> anyhow::Result<()> {
    logger::init_logging();
    config.validate()?;

    info!(
        url = %config.signaling_url,
        ice_servers = config.ice_servers.len(),
        "Starting stream viewer"
    );

    let connector = Arc::new(WebSocketConnector::new(config.signaling_url.clone()));
    let factory = Arc::new(RtcPrimitiveFactory::new(config.ice_servers.clone()));
    let (handle, session_task) = spawn_session(config, connector, factory);

    let printer = tokio::spawn(print_views(handle.subscribe()));

    if autostart {
        handle.start()?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !dispatch(&handle, line.trim())? {
                        break;
                    }
                }
                // stdin закрыт: продолжаем работать до Ctrl+C
                None => {
                    tokio::signal::ctrl_c().await?;
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    handle.shutdown()?;
    session_task.await?;
    printer.abort();
    Ok(())
}

/// false = выйти
fn dispatch(handle: &SessionHandle, line: &str) -> Result<bool> {
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    match word {
        "" => {}
        "start" => handle.start()?,
        "stop" => handle.stop()?,
        "cancel" => handle.cancel_auto_recovery()?,
        "status" => match serde_json::to_string_pretty(&handle.view()) {
            Ok(json) => println!("{json}"),
            Err(e) => warn!("Failed to render status: {e}"),
        },
        "roi" => match parse_roi(rest) {
            Some(points) => handle.send_roi(points)?,
            None => warn!("Usage: roi x,y x,y ..."),
        },
        "quit" | "exit" => return Ok(false),
        other => warn!("Unknown command '{other}' (start|stop|cancel|status|roi|quit)"),
    }
    Ok(true)
}

/// "0.1,0.2 0.5,0.5" -> [[0.1, 0.2], [0.5, 0.5]]
fn parse_roi(text: &str) -> Option<Vec<[f64; 2]>> {
    let points = text
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair.split_once(',')?;
            Some([x.trim().parse().ok()?, y.trim().parse().ok()?])
        })
        .collect::<Option<Vec<_>>>()?;
    (!points.is_empty()).then_some(points)
}

async fn print_views(mut rx: tokio::sync::watch::Receiver<SessionView>) {
    while rx.changed().await.is_ok() {
        let view = rx.borrow_and_update().clone();
        let mut line = format!(
            "[{}] {}",
            chrono::Local::now().format("%H:%M:%S"),
            view.status
        );
        if let Some(seconds) = view.countdown_seconds {
            line.push_str(&format!(" (auto-recovery in {seconds}s)"));
        }
        if let Some(status) = &view.server_status {
            line.push_str(&format!(" - {status}"));
        }
        if let Some(error) = &view.error {
            line.push_str(&format!(" ! {error}"));
        }
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roi_parses_point_pairs() {
        assert!(parse_roi("0.1,0.2 0.5, 0.5").is_none());
        assert_eq!(
            parse_roi("0.1,0.2 0.5,0.5"),
            Some(vec![[0.1, 0.2], [0.5, 0.5]])
        );
        assert_eq!(parse_roi(""), None);
        assert_eq!(parse_roi("a,b"), None);
    }
}
