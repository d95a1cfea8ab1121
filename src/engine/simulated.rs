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

//! A polyphonic sound source that keeps time but makes no sound.
//!
//! Voices are tracked the way a real cue engine tracks them: a bounded set of slots, one-shot
//! voices that return to the pool once their playback length has elapsed, and held voices that
//! stay allocated until the source is closed. Playback length is derived from the asset length,
//! the play head, the repeat count and the speed, measured against the injected clock.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::{EngineError, InstanceId, PlayParams, SoundSource};
use crate::clock::Clock;
use crate::listener::{InstanceEvent, InstanceListener};
use crate::scene::SourceSpec;

/// Frame rate used to express asset lengths in frames.
pub const DEFAULT_FRAME_RATE: u32 = 44_100;

/// How a voice slot is currently held.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Hold {
    /// Available for allocation.
    Free,
    /// Obtained explicitly; never reclaimed while the source is open.
    Held,
    /// Allocated by a one-shot play; reclaimed once playback finishes.
    Recycle,
}

#[derive(Clone, Debug)]
struct Voice {
    hold: Hold,
    params: PlayParams,
    frame_position: usize,
    playing_until: Option<Duration>,
}

impl Voice {
    fn idle() -> Voice {
        Voice {
            hold: Hold::Free,
            params: PlayParams::default(),
            frame_position: 0,
            playing_until: None,
        }
    }

    fn is_playing(&self, now: Duration) -> bool {
        self.hold != Hold::Free && self.playing_until.is_some_and(|end| now < end)
    }
}

struct State {
    open: bool,
    voices: Vec<Voice>,
}

/// A sound source simulated in time.
pub struct SimulatedSource {
    name: String,
    polyphony: usize,
    frames: usize,
    frame_rate: u32,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
    listeners: RwLock<Vec<Arc<dyn InstanceListener>>>,
}

impl SimulatedSource {
    /// Creates a simulated source for an asset of the given length.
    pub fn new(
        name: &str,
        polyphony: usize,
        duration: Duration,
        clock: Arc<dyn Clock>,
    ) -> SimulatedSource {
        let frames = (duration.as_secs_f64() * DEFAULT_FRAME_RATE as f64).round() as usize;
        SimulatedSource {
            name: name.to_string(),
            polyphony,
            frames,
            frame_rate: DEFAULT_FRAME_RATE,
            clock,
            state: Mutex::new(State {
                open: false,
                voices: vec![Voice::idle(); polyphony],
            }),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Creates a simulated source from a scene's source description.
    pub fn from_spec(spec: &SourceSpec, clock: Arc<dyn Clock>) -> SimulatedSource {
        SimulatedSource::new(spec.name(), spec.polyphony(), spec.duration(), clock)
    }

    /// Length of the asset in frames.
    pub fn frame_length(&self) -> usize {
        self.frames
    }

    /// Number of voices currently allocated, playing or not.
    pub fn allocated_count(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.lock();
        Self::reclaim(&mut state, now);
        state
            .voices
            .iter()
            .filter(|voice| voice.hold != Hold::Free)
            .count()
    }

    /// Returns true if the source is open.
    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Frees one-shot voices whose playback has finished.
    fn reclaim(state: &mut State, now: Duration) {
        for voice in state.voices.iter_mut() {
            if voice.hold == Hold::Recycle && !voice.is_playing(now) {
                *voice = Voice::idle();
            }
        }
    }

    /// Playback time from the voice's play head through all repeats. Saturates at
    /// `Duration::MAX` for speeds slow enough to outlast any clock.
    fn playback_length(&self, voice: &Voice) -> Duration {
        let remaining = self.frames.saturating_sub(voice.frame_position) as f64;
        let total = remaining + voice.params.repeats as f64 * self.frames as f64;
        Duration::try_from_secs_f64(total / self.frame_rate as f64 / voice.params.speed)
            .unwrap_or(Duration::MAX)
    }

    /// Starts the voice at the given slot. The play head rests at the end of the asset
    /// afterwards, so restarting without repositioning finishes immediately.
    fn start_voice(&self, voice: &mut Voice, now: Duration) {
        voice.playing_until = Some(now.saturating_add(self.playback_length(voice)));
        voice.frame_position = self.frames;
    }

    fn voice_mut<'a>(
        &self,
        state: &'a mut State,
        instance: InstanceId,
    ) -> Result<&'a mut Voice, EngineError> {
        match state.voices.get_mut(instance.slot()) {
            Some(voice) if voice.hold != Hold::Free => Ok(voice),
            _ => Err(EngineError::InvalidInstance {
                name: self.name.clone(),
                instance,
            }),
        }
    }

    fn voice_params(&self, instance: InstanceId) -> Option<PlayParams> {
        let state = self.state.lock();
        state
            .voices
            .get(instance.slot())
            .filter(|voice| voice.hold != Hold::Free)
            .map(|voice| voice.params)
    }

    fn listeners(&self) -> Vec<Arc<dyn InstanceListener>> {
        self.listeners.read().clone()
    }

    fn notify_started(&self, instance: InstanceId, time: Duration) {
        let event = InstanceEvent {
            time,
            instance,
            source: self,
        };
        for listener in self.listeners() {
            listener.instance_started(&event);
        }
    }
}

impl SoundSource for SimulatedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn polyphony(&self) -> usize {
        self.polyphony
    }

    fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames as f64 / self.frame_rate as f64)
    }

    fn open(&self, buffer_hint: Option<usize>) -> Result<(), EngineError> {
        {
            let mut state = self.state.lock();
            if state.open {
                return Err(EngineError::AlreadyOpen(self.name.clone()));
            }
            state.open = true;
        }

        debug!(source = self.name, buffer_hint, "Opened simulated source");
        let now = self.clock.now();
        for listener in self.listeners() {
            listener.source_opened(now, self);
        }
        Ok(())
    }

    fn close(&self) {
        {
            let mut state = self.state.lock();
            if !state.open {
                return;
            }
            state.open = false;
            state.voices.iter_mut().for_each(|voice| *voice = Voice::idle());
        }

        debug!(source = self.name, "Closed simulated source");
        let now = self.clock.now();
        for listener in self.listeners() {
            listener.source_closed(now, self);
        }
    }

    fn obtain_instance(&self) -> Option<InstanceId> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        Self::reclaim(&mut state, now);

        let slot = state
            .voices
            .iter()
            .position(|voice| voice.hold == Hold::Free)?;
        state.voices[slot].hold = Hold::Held;
        Some(InstanceId::new(slot))
    }

    fn play(&self, params: &PlayParams) -> Option<InstanceId> {
        let now = self.clock.now();
        let instance = {
            let mut state = self.state.lock();
            if !state.open {
                debug!(source = self.name, "Play requested on a closed source");
                return None;
            }
            if params.speed <= 0.0 || !params.speed.is_finite() {
                debug!(source = self.name, speed = params.speed, "Rejected play speed");
                return None;
            }
            Self::reclaim(&mut state, now);

            let slot = state
                .voices
                .iter()
                .position(|voice| voice.hold == Hold::Free)?;
            let mut voice = Voice {
                hold: Hold::Recycle,
                params: PlayParams::new(
                    params.volume.clamp(0.0, 1.0),
                    params.pan.clamp(-1.0, 1.0),
                    params.speed,
                    params.repeats,
                ),
                frame_position: 0,
                playing_until: None,
            };
            self.start_voice(&mut voice, now);
            state.voices[slot] = voice;
            InstanceId::new(slot)
        };

        self.notify_started(instance, now);
        Some(instance)
    }

    fn start(&self, instance: InstanceId) -> Result<(), EngineError> {
        let now = self.clock.now();
        {
            let mut state = self.state.lock();
            if !state.open {
                return Err(EngineError::NotOpen(self.name.clone()));
            }
            let voice = self.voice_mut(&mut state, instance)?;
            let mut started = voice.clone();
            self.start_voice(&mut started, now);
            *voice = started;
        }

        self.notify_started(instance, now);
        Ok(())
    }

    fn set_frame_position(&self, instance: InstanceId, frame: usize) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if frame > self.frames {
            return Err(EngineError::InvalidFrame {
                name: self.name.clone(),
                frame,
                frames: self.frames,
            });
        }
        self.voice_mut(&mut state, instance)?.frame_position = frame;
        Ok(())
    }

    fn set_looping(&self, instance: InstanceId, repeats: u32) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        self.voice_mut(&mut state, instance)?.params.repeats = repeats;
        Ok(())
    }

    fn set_volume(&self, instance: InstanceId, volume: f64) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        self.voice_mut(&mut state, instance)?.params.volume = volume.clamp(0.0, 1.0);
        Ok(())
    }

    fn set_pan(&self, instance: InstanceId, pan: f64) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        self.voice_mut(&mut state, instance)?.params.pan = pan.clamp(-1.0, 1.0);
        Ok(())
    }

    fn set_speed(&self, instance: InstanceId, speed: f64) -> Result<(), EngineError> {
        if speed <= 0.0 || !speed.is_finite() {
            return Err(EngineError::InvalidSpeed(speed));
        }
        let mut state = self.state.lock();
        self.voice_mut(&mut state, instance)?.params.speed = speed;
        Ok(())
    }

    fn is_playing(&self, instance: InstanceId) -> bool {
        let now = self.clock.now();
        let state = self.state.lock();
        state
            .voices
            .get(instance.slot())
            .is_some_and(|voice| voice.is_playing(now))
    }

    fn volume(&self, instance: InstanceId) -> Option<f64> {
        self.voice_params(instance).map(|params| params.volume)
    }

    fn pan(&self, instance: InstanceId) -> Option<f64> {
        self.voice_params(instance).map(|params| params.pan)
    }

    fn speed(&self, instance: InstanceId) -> Option<f64> {
        self.voice_params(instance).map(|params| params.speed)
    }

    fn add_listener(&self, listener: Arc<dyn InstanceListener>) {
        self.listeners.write().push(listener);
    }
}

impl fmt::Display for SimulatedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Simulated, {} voices)", self.name, self.polyphony)
    }
}

impl fmt::Debug for SimulatedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedSource")
            .field("name", &self.name)
            .field("polyphony", &self.polyphony)
            .field("frames", &self.frames)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::clock::ManualClock;

    fn one_second_source(polyphony: usize) -> (Arc<ManualClock>, SimulatedSource) {
        let clock = Arc::new(ManualClock::new());
        let source = SimulatedSource::new("shot", polyphony, Duration::from_secs(1), clock.clone());
        source.open(None).expect("source should open");
        (clock, source)
    }

    #[derive(Default)]
    struct CountingListener {
        opened: AtomicUsize,
        started: AtomicUsize,
        closed: AtomicUsize,
    }

    impl InstanceListener for CountingListener {
        fn source_opened(&self, _: Duration, _: &dyn SoundSource) {
            self.opened.fetch_add(1, Ordering::SeqCst);
        }

        fn source_closed(&self, _: Duration, _: &dyn SoundSource) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }

        fn instance_started(&self, event: &InstanceEvent<'_>) {
            assert!(event.source.is_playing(event.instance));
            self.started.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_play_exhausts_polyphony() {
        let (_clock, source) = one_second_source(2);
        let params = PlayParams::default();

        assert!(source.play(&params).is_some());
        assert!(source.play(&params).is_some());
        assert!(source.play(&params).is_none());
        assert_eq!(source.allocated_count(), 2);
    }

    #[test]
    fn test_one_shot_voices_are_recycled() {
        let (clock, source) = one_second_source(1);
        let id = source
            .play(&PlayParams::default())
            .expect("a voice should be free");
        assert!(source.is_playing(id));

        clock.advance(Duration::from_millis(999));
        assert!(source.play(&PlayParams::default()).is_none());

        clock.advance(Duration::from_millis(1));
        assert!(!source.is_playing(id));
        assert!(source.play(&PlayParams::default()).is_some());
    }

    #[test]
    fn test_playback_length_accounts_for_speed_and_repeats() {
        let (clock, source) = one_second_source(1);
        // Two passes at double speed last one second.
        let id = source
            .play(&PlayParams::new(1.0, 0.0, 2.0, 1))
            .expect("a voice should be free");

        clock.advance(Duration::from_millis(990));
        assert!(source.is_playing(id));
        clock.advance(Duration::from_millis(20));
        assert!(!source.is_playing(id));
    }

    #[test]
    fn test_extreme_playback_lengths_saturate() {
        let (clock, source) = one_second_source(2);

        let slow = source
            .play(&PlayParams::new(0.5, 0.0, 1e-20, 0))
            .expect("a voice should be free");
        let looped = source
            .play(&PlayParams::new(0.5, 0.0, 1.0, u32::MAX))
            .expect("a voice should be free");
        clock.advance(Duration::from_secs(365 * 24 * 60 * 60));
        assert!(source.is_playing(slow));
        assert!(source.is_playing(looped));

        source.close();
        source.open(None).expect("source should reopen");
        let held = source.obtain_instance().expect("a voice should be free");
        source.set_speed(held, 1e-20).expect("speed is positive");
        source.start(held).expect("held voice should start");
        assert!(source.is_playing(held));
    }

    #[test]
    fn test_held_voice_is_never_recycled() {
        let (clock, source) = one_second_source(1);
        let held = source.obtain_instance().expect("a voice should be free");
        assert!(!source.is_playing(held));
        assert!(source.play(&PlayParams::default()).is_none());

        source.set_frame_position(held, 0).expect("held voice");
        source.start(held).expect("held voice");
        assert!(source.is_playing(held));

        clock.advance(Duration::from_secs(5));
        assert!(!source.is_playing(held));
        assert!(source.obtain_instance().is_none());
        assert_eq!(source.allocated_count(), 1);
    }

    #[test]
    fn test_restart_without_reposition_finishes_immediately() {
        let (clock, source) = one_second_source(1);
        let held = source.obtain_instance().expect("a voice should be free");
        source.start(held).expect("held voice");
        clock.advance(Duration::from_secs(2));

        source.start(held).expect("held voice");
        assert!(!source.is_playing(held));

        source.set_frame_position(held, 0).expect("held voice");
        source.start(held).expect("held voice");
        assert!(source.is_playing(held));
    }

    #[test]
    fn test_setters_clamp_and_validate() {
        let (_clock, source) = one_second_source(1);
        let held = source.obtain_instance().expect("a voice should be free");

        source.set_volume(held, 1.5).expect("held voice");
        source.set_pan(held, -3.0).expect("held voice");
        assert_eq!(source.volume(held), Some(1.0));
        assert_eq!(source.pan(held), Some(-1.0));

        assert_eq!(
            source.set_speed(held, 0.0),
            Err(EngineError::InvalidSpeed(0.0))
        );
        source.set_speed(held, 1.55).expect("held voice");
        assert_eq!(source.speed(held), Some(1.55));

        assert!(matches!(
            source.set_frame_position(held, source.frame_length() + 1),
            Err(EngineError::InvalidFrame { .. })
        ));
    }

    #[test]
    fn test_unheld_instances_are_rejected() {
        let (_clock, source) = one_second_source(2);
        let free = InstanceId::new(1);
        assert!(matches!(
            source.start(free),
            Err(EngineError::InvalidInstance { .. })
        ));
        assert!(matches!(
            source.set_volume(InstanceId::new(7), 0.5),
            Err(EngineError::InvalidInstance { .. })
        ));
        assert_eq!(source.volume(free), None);
        assert!(!source.is_playing(InstanceId::new(7)));
    }

    #[test]
    fn test_open_close_lifecycle() {
        let clock = Arc::new(ManualClock::new());
        let source = SimulatedSource::new("frog", 4, Duration::from_millis(800), clock);
        let listener = Arc::new(CountingListener::default());
        source.add_listener(listener.clone());

        assert!(source.play(&PlayParams::default()).is_none());
        source.open(Some(2048)).expect("source should open");
        assert_eq!(
            source.open(None),
            Err(EngineError::AlreadyOpen("frog".to_string()))
        );

        assert!(source.play(&PlayParams::default()).is_some());
        source.close();
        source.close();
        assert!(!source.is_open());
        assert_eq!(source.allocated_count(), 0);

        assert_eq!(listener.opened.load(Ordering::SeqCst), 1);
        assert_eq!(listener.started.load(Ordering::SeqCst), 1);
        assert_eq!(listener.closed.load(Ordering::SeqCst), 1);
    }
}
