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
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Represents the current stop state.
#[derive(PartialEq, Clone, Copy, Debug)]
enum StopState {
    Running,
    Stopped,
}

/// A stop handle is shared between the director and whoever wants to end a run early. The
/// director checks it once per tick; waits performed through it return as soon as a stop is
/// requested.
#[derive(Clone)]
pub struct StopHandle {
    /// The current state, guarded so that waiters can be woken reliably.
    state: Arc<Mutex<StopState>>,
    /// The condvar will handle notification of stopping.
    condvar: Arc<Condvar>,
}

impl StopHandle {
    /// Creates a new stop handle.
    pub fn new() -> StopHandle {
        StopHandle {
            state: Arc::new(Mutex::new(StopState::Running)),
            condvar: Arc::new(Condvar::new()),
        }
    }

    /// Returns true if a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        *self.state.lock() == StopState::Stopped
    }

    /// Waits for the timeout to elapse or for a stop request, whichever comes first. Returns true
    /// if the handle has been stopped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        self.condvar
            .wait_while_for(&mut state, |state| *state == StopState::Running, timeout);
        *state == StopState::Stopped
    }

    /// Requests a stop. Repeated requests are ignored.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if *state == StopState::Running {
            *state = StopState::Stopped;
            self.condvar.notify_all();
        }
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}
