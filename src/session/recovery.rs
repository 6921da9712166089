use crate::session::events::{EventSender, SessionEvent};
use crate::session::state::TaskSlot;
use std::time::Duration;
use tracing::debug;

/// Итог одного тика обратного отсчёта
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Тик от отменённого или заменённого отсчёта
    Stale,
    Remaining(u32),
    Expired,
}

/// Обратный отсчёт автовосстановления. Одновременно живёт не больше одного.
#[derive(Debug)]
pub struct RecoveryTimer {
    seconds: u32,
    tick: Duration,
    remaining: Option<u32>,
    generation: u64,
    task: TaskSlot,
}

impl RecoveryTimer {
    pub fn new(seconds: u32, tick: Duration) -> Self {
        Self {
            seconds,
            tick,
            remaining: None,
            generation: 0,
            task: TaskSlot::default(),
        }
    }

    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    pub fn is_active(&self) -> bool {
        self.remaining.is_some()
    }

    /// Запуск заново отменяет предыдущий отсчёт
    pub fn start(&mut self, events: &EventSender) {
        self.cancel();
        self.generation += 1;
        self.remaining = Some(self.seconds);

        let generation = self.generation;
        let ticks = self.seconds;
        let period = self.tick;
        let tx = events.clone();
        self.task.replace(tokio::spawn(async move {
            for _ in 0..ticks {
                tokio::time::sleep(period).await;
                if tx.send(SessionEvent::RecoveryTick { generation }).is_err() {
                    return;
                }
            }
        }));
        debug!(generation, seconds = self.seconds, "Auto-recovery countdown started");
    }

    pub fn on_tick(&mut self, generation: u64) -> Tick {
        if generation != self.generation {
            return Tick::Stale;
        }
        let Some(remaining) = self.remaining else {
            return Tick::Stale;
        };

        let left = remaining.saturating_sub(1);
        if left == 0 {
            self.remaining = None;
            self.task.cancel();
            Tick::Expired
        } else {
            self.remaining = Some(left);
            Tick::Remaining(left)
        }
    }

    /// Отмена безопасна в любой момент; возвращает, сколько оставалось
    pub fn cancel(&mut self) -> Option<u32> {
        self.task.cancel();
        // тики, уже лежащие в очереди, станут Stale
        self.generation += 1;
        self.remaining.take()
    }
}
