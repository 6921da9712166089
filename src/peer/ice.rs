use crate::peer::types::IceCandidate;
use std::collections::VecDeque;
use std::net::IpAddr;
use tracing::{debug, warn};

/// Что делать с пришедшим удалённым кандидатом
#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    /// remote description ещё нет, кандидат отложен
    Queued,
    /// remote description уже есть, применяем сразу
    ApplyNow(IceCandidate),
}

/// Кандидаты, полученные до установки remote description.
///
/// Пока `ready == false` кандидаты копятся в порядке прихода; `mark_ready`
/// отдаёт их все ровно один раз. После этого очередь всегда пуста.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    pending: VecDeque<IceCandidate>,
    ready: bool,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, candidate: IceCandidate) -> Admission {
        if self.ready {
            Admission::ApplyNow(candidate)
        } else {
            self.pending.push_back(candidate);
            debug!(queued = self.pending.len(), "Remote description not set yet, queuing candidate");
            Admission::Queued
        }
    }

    /// remote description установлен: забираем отложенные кандидаты по порядку
    pub fn mark_ready(&mut self) -> Vec<IceCandidate> {
        self.ready = true;
        self.pending.drain(..).collect()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Новая попытка: всё сначала
    pub fn reset(&mut self) {
        self.pending.clear();
        self.ready = false;
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Кандидат с mDNS (`*.local`) или link-local адресом недоступен с другого устройства
pub fn is_unreachable_candidate(candidate: &str) -> bool {
    let Some(address) = candidate.split_whitespace().nth(4) else {
        return candidate.contains(".local");
    };

    if address.ends_with(".local") {
        return true;
    }

    match address.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => v4.is_link_local(),
        Ok(IpAddr::V6(v6)) => (v6.segments()[0] & 0xffc0) == 0xfe80,
        Err(_) => false,
    }
}

pub fn analyze_candidates(candidates: &[IceCandidate]) {
    let mut host_count = 0;
    let mut srflx_count = 0;
    let mut relay_count = 0;

    for candidate in candidates {
        if candidate.candidate.contains("typ host") {
            host_count += 1;
        } else if candidate.candidate.contains("typ srflx") {
            srflx_count += 1;
        } else if candidate.candidate.contains("typ relay") {
            relay_count += 1;
        }
    }

    debug!(
        host = host_count,
        srflx = srflx_count,
        relay = relay_count,
        "Candidate analysis"
    );

    if !candidates.is_empty() && host_count == candidates.len() {
        warn!("Only host candidates received, connection across NAT may fail");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(n: u32) -> IceCandidate {
        IceCandidate::new(format!("candidate:{n} 1 udp 2130706431 192.168.1.{n} 5000{n} typ host"))
    }

    #[test]
    fn queues_until_ready_then_drains_in_order() {
        let mut queue = CandidateQueue::new();
        assert_eq!(queue.admit(cand(1)), Admission::Queued);
        assert_eq!(queue.admit(cand(2)), Admission::Queued);
        assert_eq!(queue.admit(cand(3)), Admission::Queued);

        let drained = queue.mark_ready();
        assert_eq!(drained, vec![cand(1), cand(2), cand(3)]);
        assert!(queue.is_empty());

        // второй раз ничего не отдаём
        assert!(queue.mark_ready().is_empty());
    }

    #[test]
    fn applies_immediately_once_ready() {
        let mut queue = CandidateQueue::new();
        queue.mark_ready();
        assert_eq!(queue.admit(cand(7)), Admission::ApplyNow(cand(7)));
        assert!(queue.is_empty());
    }

    #[test]
    fn reset_drops_pending_and_readiness() {
        let mut queue = CandidateQueue::new();
        queue.admit(cand(1));
        queue.mark_ready();
        queue.reset();
        assert!(!queue.is_ready());
        assert_eq!(queue.admit(cand(2)), Admission::Queued);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn filters_mdns_and_link_local() {
        assert!(is_unreachable_candidate(
            "candidate:1 1 udp 2113937151 3f2a1b4c-1111-2222-3333-444455556666.local 54321 typ host"
        ));
        assert!(is_unreachable_candidate(
            "candidate:2 1 udp 2113937151 169.254.10.20 54321 typ host"
        ));
        assert!(is_unreachable_candidate(
            "candidate:3 1 udp 2113937151 fe80::1c2b:3dff:fe4e:5f60 54321 typ host"
        ));
        assert!(!is_unreachable_candidate(
            "candidate:4 1 udp 2113937151 192.168.0.12 54321 typ host"
        ));
        assert!(!is_unreachable_candidate(
            "candidate:5 1 udp 1677729535 203.0.113.7 40000 typ srflx raddr 0.0.0.0 rport 0"
        ));
    }
}
