const TICK_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Idle,
    Running { next_tick_ms: u64 },
    Paused { until_tick_ms: u64 },
}

#[derive(Debug, Clone)]
pub struct Countdown {
    duration_secs: u32,
    remaining: u32,
    state: State,
}

impl Countdown {
    pub fn new(duration_secs: u32) -> Self {
        Self {
            duration_secs,
            remaining: duration_secs,
            state: State::Idle,
        }
    }

    /// Restart from the full duration.
    pub fn start(&mut self, now_ms: u64) {
        self.remaining = self.duration_secs;
        self.state = State::Running {
            next_tick_ms: now_ms + TICK_MS,
        };
    }

    pub fn pause(&mut self, now_ms: u64) {
        if let State::Running { next_tick_ms } = self.state {
            self.state = State::Paused {
                until_tick_ms: next_tick_ms.saturating_sub(now_ms),
            };
        }
    }

    pub fn resume(&mut self, now_ms: u64) {
        if let State::Paused { until_tick_ms } = self.state {
            self.state = State::Running {
                next_tick_ms: now_ms + until_tick_ms,
            };
        }
    }

    pub fn stop(&mut self) {
        self.state = State::Idle;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn duration(&self) -> u32 {
        self.duration_secs
    }

    /// Apply every whole second elapsed up to `now_ms`.
    /// Returns true exactly once, on the poll that reaches zero.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let State::Running { mut next_tick_ms } = self.state else {
            return false;
        };
        while now_ms >= next_tick_ms {
            self.remaining = self.remaining.saturating_sub(1);
            if self.remaining == 0 {
                self.state = State::Idle;
                return true;
            }
            next_tick_ms += TICK_MS;
        }
        self.state = State::Running { next_tick_ms };
        false
    }
}
