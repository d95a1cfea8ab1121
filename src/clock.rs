// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Time sources for the director and the simulated engine.
//!
//! Everything that needs to know "now" or needs to pause goes through a [Clock] so that runs can
//! be replayed in virtual time.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::stop::StopHandle;

/// A monotonic time source.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;

    /// Blocks for the given duration. Not interruptible.
    fn sleep(&self, duration: Duration);

    /// Blocks for the given duration or until the stop handle is triggered.
    fn wait(&self, duration: Duration, stop: &StopHandle);
}

/// Wall clock time.
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> SystemClock {
        SystemClock {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        spin_sleep::sleep(duration);
    }

    fn wait(&self, duration: Duration, stop: &StopHandle) {
        stop.wait_timeout(duration);
    }
}

/// Virtual time that only moves when somebody sleeps on it or advances it explicitly.
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> ManualClock {
        ManualClock {
            now: Mutex::new(Duration::ZERO),
        }
    }

    /// Moves time forward.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock();
        *now += duration;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }

    fn wait(&self, duration: Duration, _: &StopHandle) {
        self.advance(duration);
    }
}
