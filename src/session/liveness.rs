// Проверка «сессия уже жива».
//
// Уведомления о переподключении могут приходить дважды или опаздывать
// относительно колбэков транспорта. Перед тем как рвать сессию ради
// нового согласования, смотрим на то, что видно прямо сейчас.

use crate::peer::types::{ConnectionState, IceConnectionState};
use crate::session::state::Status;

/// Всё, что нужно для решения, в одном месте
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessSnapshot {
    /// None, если примитива нет
    pub connection_state: Option<ConnectionState>,
    pub ice_connection_state: Option<IceConnectionState>,
    pub status: Status,
    pub active_tracks: usize,
}

/// true: транспорт подтверждает connected и статус connected,
/// или хотя бы один медиатрек уже привязан к выводу
pub fn is_session_healthy(snapshot: &LivenessSnapshot) -> bool {
    let transport_connected = snapshot.connection_state == Some(ConnectionState::Connected)
        || snapshot
            .ice_connection_state
            .is_some_and(IceConnectionState::is_connected);

    let webrtc_working = transport_connected && snapshot.status == Status::Connected;
    let media_flowing = snapshot.active_tracks > 0;

    webrtc_working || media_flowing
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> LivenessSnapshot {
        LivenessSnapshot {
            connection_state: Some(ConnectionState::New),
            ice_connection_state: Some(IceConnectionState::New),
            status: Status::Disconnected,
            active_tracks: 0,
        }
    }

    #[test]
    fn connected_transport_needs_connected_status() {
        let mut p = snapshot();
        p.connection_state = Some(ConnectionState::Connected);
        assert!(!is_session_healthy(&p));

        p.status = Status::Connected;
        assert!(is_session_healthy(&p));
    }

    #[test]
    fn ice_connected_counts_as_transport_connected() {
        let mut p = snapshot();
        p.status = Status::Connected;
        p.ice_connection_state = Some(IceConnectionState::Completed);
        assert!(is_session_healthy(&p));
    }

    #[test]
    fn live_track_is_enough() {
        let mut p = snapshot();
        p.connection_state = None;
        p.ice_connection_state = None;
        p.status = Status::ReadyForReconnect;
        p.active_tracks = 1;
        assert!(is_session_healthy(&p));
    }

    #[test]
    fn no_primitive_no_tracks_is_unhealthy() {
        let p = LivenessSnapshot {
            connection_state: None,
            ice_connection_state: None,
            status: Status::Connected,
            active_tracks: 0,
        };
        assert!(!is_session_healthy(&p));
    }
}
