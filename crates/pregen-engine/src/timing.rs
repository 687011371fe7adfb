//! Fixed-rate tick pacing.

use std::time::{Duration, Instant};
use tracing::warn;

/// Ticks the loop may fall behind before the backlog is dropped.
const MAX_TICK_BACKLOG: u32 = 40;

/// Paces the host loop at a fixed tick rate.
///
/// A tick that overruns its budget delays the following ones; once the loop
/// is more than [`MAX_TICK_BACKLOG`] ticks behind, the backlog is dropped
/// instead of being run back to back.
#[derive(Debug)]
pub struct TickClock {
    /// Ticks per second
    tick_rate: u32,
    /// Time budget per tick
    tick_budget: Duration,
    /// Deadline of the next tick
    next_tick: Instant,
    /// Ticks started so far
    ticks: u64,
}

impl TickClock {
    /// Create a clock running at `tick_rate` ticks per second.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            tick_rate,
            tick_budget: Duration::from_secs_f64(1.0 / f64::from(tick_rate)),
            next_tick: Instant::now(),
            ticks: 0,
        }
    }

    /// Sleeps until the next tick is due and returns its number.
    pub fn wait_for_next_tick(&mut self) -> u64 {
        let now = Instant::now();
        if now < self.next_tick {
            std::thread::sleep(self.next_tick - now);
        } else {
            let behind = now - self.next_tick;
            if behind > self.tick_budget * MAX_TICK_BACKLOG {
                warn!(
                    "Can't keep up! Running {}ms behind, skipping {} ticks",
                    behind.as_millis(),
                    behind.as_nanos() / self.tick_budget.as_nanos().max(1)
                );
                self.next_tick = now;
            }
        }

        self.next_tick += self.tick_budget;
        self.ticks += 1;
        self.ticks
    }

    /// Ticks started so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks per second.
    #[must_use]
    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Wall time covered by `ticks` ticks.
    #[must_use]
    pub fn ticks_to_duration(&self, ticks: u32) -> Duration {
        self.tick_budget * ticks
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(20)
    }
}
