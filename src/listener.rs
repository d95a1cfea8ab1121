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

//! Passive observers of sound source activity.
//!
//! Listeners never influence scheduling; they exist so a run can be followed in the logs.

use std::time::Duration;

use tracing::{debug, info};

use crate::engine::{InstanceId, SoundSource};

/// A voice started playing.
pub struct InstanceEvent<'a> {
    /// Time of the start on the engine's clock.
    pub time: Duration,
    /// The voice that started.
    pub instance: InstanceId,
    /// The source the voice belongs to.
    pub source: &'a dyn SoundSource,
}

/// Receives notifications from a sound source. Called on whichever thread made the engine call,
/// so implementations must be cheap and must not call back into the source mutably.
pub trait InstanceListener: Send + Sync {
    fn source_opened(&self, _time: Duration, _source: &dyn SoundSource) {}

    fn source_closed(&self, _time: Duration, _source: &dyn SoundSource) {}

    fn instance_started(&self, event: &InstanceEvent<'_>);
}

/// Logs every start along with the voice's parameters as read back from the engine.
pub struct LoggingListener {
    label: String,
}

impl LoggingListener {
    /// Creates a logging listener. The label is used as the log message, e.g. "croak".
    pub fn new(label: &str) -> LoggingListener {
        LoggingListener {
            label: label.to_string(),
        }
    }
}

impl InstanceListener for LoggingListener {
    fn source_opened(&self, time: Duration, source: &dyn SoundSource) {
        debug!(
            source = source.name(),
            at_ms = time.as_millis() as u64,
            "Sound source opened"
        );
    }

    fn source_closed(&self, time: Duration, source: &dyn SoundSource) {
        debug!(
            source = source.name(),
            at_ms = time.as_millis() as u64,
            "Sound source closed"
        );
    }

    fn instance_started(&self, event: &InstanceEvent<'_>) {
        let id = event.instance;
        info!(
            source = event.source.name(),
            instance = %id,
            at_ms = event.time.as_millis() as u64,
            volume = event.source.volume(id),
            pan = event.source.pan(id),
            speed = event.source.speed(id),
            "{}",
            self.label
        );
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::clock::ManualClock;
    use crate::engine::simulated::SimulatedSource;
    use crate::engine::PlayParams;

    /// Reads the parameters back the same way the logging listener does.
    #[derive(Default)]
    struct ReadBack {
        seen: Mutex<Vec<(Option<f64>, Option<f64>, Option<f64>)>>,
    }

    impl InstanceListener for ReadBack {
        fn instance_started(&self, event: &InstanceEvent<'_>) {
            let id = event.instance;
            self.seen.lock().push((
                event.source.volume(id),
                event.source.pan(id),
                event.source.speed(id),
            ));
        }
    }

    #[test]
    fn test_listeners_read_back_parameters() {
        let clock = Arc::new(ManualClock::new());
        let source = SimulatedSource::new("frog", 4, Duration::from_millis(600), clock);
        let read_back = Arc::new(ReadBack::default());
        source.add_listener(Arc::new(LoggingListener::new("croak")));
        source.add_listener(read_back.clone());
        source.open(None).expect("source should open");

        assert!(source.play(&PlayParams::new(0.4, -0.3, 1.05, 1)).is_some());
        source.close();

        assert_eq!(
            *read_back.seen.lock(),
            vec![(Some(0.4), Some(-0.3), Some(1.05))]
        );
    }
}
