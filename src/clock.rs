//! Round clock: memorize countdown, play-time count-up and the deferred level advance.
//!
//! The clock never reads wall time. A driver delivers one `tick` per second together
//! with the [`TimerHandle`] it was given when the timer started. Every start or stop
//! bumps a generation counter, so a tick or deferred action carrying an old handle
//! is dropped instead of leaking into the next phase or the next round.

/// Proof that a timer was armed; only the most recently armed handle is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Stopped,
    Countdown,
    CountUp,
    /// One-shot action, fired by the driver rather than by ticks.
    Deferred,
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// Stale handle or no tick-driven timer running.
    Ignored,
    Ticked,
    /// Countdown reached zero; the clock has stopped itself.
    MemorizeExpired,
}

#[derive(Debug, Clone)]
pub struct RoundClock {
    timer: Timer,
    generation: u64,
    time_left: u32,
    play_time: u32,
}

impl Default for RoundClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundClock {
    pub fn new() -> Self {
        Self {
            timer: Timer::Stopped,
            generation: 0,
            time_left: 0,
            play_time: 0,
        }
    }

    fn arm(&mut self, timer: Timer) -> TimerHandle {
        self.generation = self.generation.wrapping_add(1);
        self.timer = timer;
        TimerHandle {
            generation: self.generation,
        }
    }

    /// Start the memorize countdown. Resets play time.
    pub fn start_countdown(&mut self, secs: u32) -> TimerHandle {
        self.time_left = secs;
        self.play_time = 0;
        self.arm(Timer::Countdown)
    }

    /// Start counting play time up from zero. No cap.
    pub fn start_count_up(&mut self) -> TimerHandle {
        self.time_left = 0;
        self.play_time = 0;
        self.arm(Timer::CountUp)
    }

    /// Cancel ticks and arm a one-shot action, claimed with [`RoundClock::fire_deferred`].
    pub fn arm_deferred(&mut self) -> TimerHandle {
        self.arm(Timer::Deferred)
    }

    /// Cancel whatever is armed. All outstanding handles become stale.
    pub fn stop(&mut self) {
        self.arm(Timer::Stopped);
    }

    fn is_live(&self, handle: TimerHandle) -> bool {
        handle.generation == self.generation
    }

    /// Handle for the tick-driven timer currently running, if any.
    pub fn tick_handle(&self) -> Option<TimerHandle> {
        matches!(self.timer, Timer::Countdown | Timer::CountUp).then_some(TimerHandle {
            generation: self.generation,
        })
    }

    /// One second passed.
    pub fn tick(&mut self, handle: TimerHandle) -> ClockEvent {
        if !self.is_live(handle) {
            return ClockEvent::Ignored;
        }
        match self.timer {
            Timer::Countdown => {
                if self.time_left <= 1 {
                    self.time_left = 0;
                    self.stop();
                    ClockEvent::MemorizeExpired
                } else {
                    self.time_left -= 1;
                    ClockEvent::Ticked
                }
            }
            Timer::CountUp => {
                self.play_time = self.play_time.saturating_add(1);
                ClockEvent::Ticked
            }
            Timer::Stopped | Timer::Deferred => ClockEvent::Ignored,
        }
    }

    /// Claim the deferred action. True exactly once for a live handle.
    pub fn fire_deferred(&mut self, handle: TimerHandle) -> bool {
        if self.timer != Timer::Deferred || !self.is_live(handle) {
            return false;
        }
        self.stop();
        true
    }

    /// Seconds left to memorize.
    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    /// Seconds spent in the play phase.
    pub fn play_time(&self) -> u32 {
        self.play_time
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.timer != Timer::Stopped
    }
}
