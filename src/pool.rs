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

//! Voice acquisition for one sound source.
//!
//! Two policies are supported. Fire-and-forget voices come from the engine's one-shot play and
//! are never tracked here; if the engine has no voice free the event is dropped. Reserved voices
//! are obtained once and reused for the lifetime of the pool, and are only restarted when the
//! engine reports them idle so a foreground effect never cuts itself off.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::{EngineError, InstanceId, PlayParams, SoundSource};

/// Counters for what happened to trigger requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Voices that were started.
    pub fired: u64,
    /// Requests that found no voice available, or that the engine refused.
    pub dropped: u64,
    /// Reserved requests ignored because the voice was still playing.
    pub skipped: u64,
}

/// Manages the voices the director uses on one sound source.
pub struct InstancePool {
    source: Arc<dyn SoundSource>,
    /// Voices held long-term. Never released back to the engine.
    reserved: Vec<InstanceId>,
    stats: PoolStats,
}

impl InstancePool {
    /// Creates a pool over the given source.
    pub fn new(source: Arc<dyn SoundSource>) -> InstancePool {
        InstancePool {
            source,
            reserved: Vec::new(),
            stats: PoolStats::default(),
        }
    }

    /// The source this pool draws voices from.
    pub fn source(&self) -> &Arc<dyn SoundSource> {
        &self.source
    }

    /// Obtains a voice for long-term use. Returns None if the engine has none free.
    pub fn reserve(&mut self) -> Option<InstanceId> {
        let instance = self.source.obtain_instance()?;
        debug!(source = self.source.name(), %instance, "Reserved voice");
        self.reserved.push(instance);
        Some(instance)
    }

    /// Voices reserved so far.
    pub fn reserved(&self) -> &[InstanceId] {
        &self.reserved
    }

    /// Plays a one-shot voice. Returns false if the event was dropped because every voice is in
    /// use. Dropped events are not retried.
    pub fn try_fire_one_shot(&mut self, params: &PlayParams) -> bool {
        match self.source.play(params) {
            Some(instance) => {
                self.stats.fired += 1;
                debug!(source = self.source.name(), %instance, %params, "Fired one-shot");
                true
            }
            None => {
                self.stats.dropped += 1;
                debug!(source = self.source.name(), "No voice available, dropping one-shot");
                false
            }
        }
    }

    /// Restarts a reserved voice from the top with the given parameters, unless it is still
    /// playing. Returns Ok(false) if the voice was busy and nothing was started, or the engine's
    /// error if it refused the restart; a refusal counts as a dropped event.
    pub fn trigger_reserved(
        &mut self,
        instance: InstanceId,
        params: &PlayParams,
    ) -> Result<bool, EngineError> {
        if self.source.is_playing(instance) {
            self.stats.skipped += 1;
            debug!(source = self.source.name(), %instance, "Reserved voice busy, skipping");
            return Ok(false);
        }

        match self.restart(instance, params) {
            Ok(()) => {
                self.stats.fired += 1;
                debug!(source = self.source.name(), %instance, %params, "Restarted reserved voice");
                Ok(true)
            }
            Err(e) => {
                self.stats.dropped += 1;
                warn!(source = self.source.name(), %instance, err = %e, "Failed to restart reserved voice");
                Err(e)
            }
        }
    }

    /// Fully configures the voice before starting it.
    fn restart(&self, instance: InstanceId, params: &PlayParams) -> Result<(), EngineError> {
        self.source.set_frame_position(instance, 0)?;
        self.source.set_looping(instance, params.repeats)?;
        self.source.set_volume(instance, params.volume)?;
        self.source.set_pan(instance, params.pan)?;
        self.source.set_speed(instance, params.speed)?;
        self.source.start(instance)
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}

impl fmt::Debug for InstancePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstancePool")
            .field("source", &self.source.name())
            .field("reserved", &self.reserved)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::engine::mock::{Call, MockSource};
    use crate::engine::simulated::SimulatedSource;

    fn mock_pool(polyphony: usize) -> (Arc<MockSource>, InstancePool) {
        let source = Arc::new(MockSource::new("semi-auto", polyphony));
        source.open(None).expect("mock source should open");
        let pool = InstancePool::new(source.clone());
        (source, pool)
    }

    #[test]
    fn test_reserved_busy_is_a_no_op() {
        let (source, mut pool) = mock_pool(3);
        let reserved = pool.reserve().expect("a voice should be free");
        source.set_playing(true);

        assert_eq!(
            pool.trigger_reserved(reserved, &PlayParams::new(0.6, 0.0, 1.55, 4)),
            Ok(false)
        );
        assert_eq!(source.count(|call| matches!(call, Call::Start(_))), 0);
        assert_eq!(
            source.count(|call| matches!(call, Call::SetFramePosition(..))),
            0
        );
        assert_eq!(pool.stats().skipped, 1);
    }

    #[test]
    fn test_reserved_idle_is_configured_before_start() {
        let (source, mut pool) = mock_pool(3);
        let reserved = pool.reserve().expect("a voice should be free");
        let params = PlayParams::new(0.6, 0.0, 1.55, 4);

        assert_eq!(pool.trigger_reserved(reserved, &params), Ok(true));
        let calls: Vec<Call> = source
            .calls()
            .into_iter()
            .skip_while(|call| !matches!(call, Call::IsPlaying(_)))
            .collect();
        assert_eq!(
            calls,
            vec![
                Call::IsPlaying(reserved),
                Call::SetFramePosition(reserved, 0),
                Call::SetLooping(reserved, 4),
                Call::SetVolume(reserved, 0.6),
                Call::SetPan(reserved, 0.0),
                Call::SetSpeed(reserved, 1.55),
                Call::Start(reserved),
            ]
        );
        assert_eq!(pool.stats().fired, 1);
    }

    #[test]
    fn test_one_shot_under_exhaustion_is_dropped() {
        let (source, mut pool) = mock_pool(3);
        source.set_exhausted(true);

        assert!(!pool.try_fire_one_shot(&PlayParams::default()));
        assert!(!pool.try_fire_one_shot(&PlayParams::default()));
        assert_eq!(pool.stats().dropped, 2);
        assert_eq!(source.started(), 0);
        assert!(pool.reserve().is_none());
        assert!(pool.reserved().is_empty());
    }

    #[test]
    fn test_one_shot_fires() {
        let (source, mut pool) = mock_pool(3);
        let params = PlayParams::new(0.2, -0.67, 1.6, 3);

        assert!(pool.try_fire_one_shot(&params));
        assert_eq!(source.count(|call| *call == Call::Play(params)), 1);
        assert_eq!(source.started(), 1);
    }

    #[test]
    fn test_reserved_voice_never_interrupts_itself() {
        let clock = Arc::new(ManualClock::new());
        let source = Arc::new(SimulatedSource::new(
            "semi-auto",
            3,
            Duration::from_millis(250),
            clock.clone(),
        ));
        source.open(None).expect("source should open");
        let mut pool = InstancePool::new(source.clone());
        let reserved = pool.reserve().expect("a voice should be free");

        // Three passes at normal speed: 750ms.
        let params = PlayParams::new(0.6, 0.0, 1.0, 2);
        assert_eq!(pool.trigger_reserved(reserved, &params), Ok(true));
        clock.advance(Duration::from_millis(500));
        assert_eq!(pool.trigger_reserved(reserved, &params), Ok(false));
        clock.advance(Duration::from_millis(250));
        assert_eq!(pool.trigger_reserved(reserved, &params), Ok(true));

        assert_eq!(
            pool.stats(),
            PoolStats {
                fired: 2,
                dropped: 0,
                skipped: 1
            }
        );
        // The reserved voice stays out of the one-shot pool.
        assert!(pool.try_fire_one_shot(&params));
        assert!(pool.try_fire_one_shot(&params));
        assert!(!pool.try_fire_one_shot(&params));
    }

    #[test]
    fn test_engine_refusal_counts_as_dropped() {
        let clock = Arc::new(ManualClock::new());
        let source = Arc::new(SimulatedSource::new(
            "semi-auto",
            1,
            Duration::from_millis(250),
            clock,
        ));
        source.open(None).expect("source should open");
        let mut pool = InstancePool::new(source);

        // Never obtained, so the engine rejects it.
        let result = pool.trigger_reserved(InstanceId::new(0), &PlayParams::default());
        assert!(matches!(result, Err(EngineError::InvalidInstance { .. })));
        assert_eq!(
            pool.stats(),
            PoolStats {
                fired: 0,
                dropped: 1,
                skipped: 0
            }
        );
    }
}
