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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::{Mutex, RwLock};
use tracing::{info, span, Level};

use super::{EngineError, InstanceId, PlayParams, SoundSource};
use crate::listener::{InstanceEvent, InstanceListener};

/// An engine call as seen by the mock.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Open(Option<usize>),
    Close,
    Obtain,
    Play(PlayParams),
    Start(InstanceId),
    SetFramePosition(InstanceId, usize),
    SetLooping(InstanceId, u32),
    SetVolume(InstanceId, f64),
    SetPan(InstanceId, f64),
    SetSpeed(InstanceId, f64),
    IsPlaying(InstanceId),
}

/// A mock sound source. Doesn't keep time; it records every call and answers according to the
/// switches set on it.
pub struct MockSource {
    name: String,
    polyphony: usize,
    calls: Mutex<Vec<Call>>,
    next_slot: AtomicUsize,
    started: AtomicUsize,
    exhausted: AtomicBool,
    playing: AtomicBool,
    fail_open: AtomicBool,
    fail_start: AtomicBool,
    listeners: RwLock<Vec<Arc<dyn InstanceListener>>>,
}

impl MockSource {
    /// Creates a mock source with free voices that never report playing.
    pub fn new(name: &str, polyphony: usize) -> MockSource {
        MockSource {
            name: name.to_string(),
            polyphony,
            calls: Mutex::new(Vec::new()),
            next_slot: AtomicUsize::new(0),
            started: AtomicUsize::new(0),
            exhausted: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            fail_open: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// When set, obtain_instance and play report that no voice is free.
    pub fn set_exhausted(&self, exhausted: bool) {
        self.exhausted.store(exhausted, Ordering::Relaxed);
    }

    /// When set, every instance reports that it is playing.
    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Relaxed);
    }

    /// When set, open fails as if the device were unavailable.
    pub fn set_fail_open(&self, fail_open: bool) {
        self.fail_open.store(fail_open, Ordering::Relaxed);
    }

    /// When set, start fails as if the engine refused the voice.
    pub fn set_fail_start(&self, fail_start: bool) {
        self.fail_start.store(fail_start, Ordering::Relaxed);
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Number of calls matching the predicate.
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Call) -> bool,
    {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    /// Number of voices that actually started, through start or a successful play.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn next_instance(&self) -> InstanceId {
        InstanceId::new(self.next_slot.fetch_add(1, Ordering::SeqCst) % self.polyphony.max(1))
    }

    fn notify_started(&self, instance: InstanceId) {
        self.started.fetch_add(1, Ordering::SeqCst);
        let event = InstanceEvent {
            time: Duration::ZERO,
            instance,
            source: self,
        };
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.instance_started(&event);
        }
    }
}

impl SoundSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn polyphony(&self) -> usize {
        self.polyphony
    }

    fn duration(&self) -> Duration {
        Duration::from_secs(1)
    }

    fn open(&self, buffer_hint: Option<usize>) -> Result<(), EngineError> {
        let span = span!(Level::INFO, "open source (mock)");
        let _enter = span.enter();

        self.record(Call::Open(buffer_hint));
        if self.fail_open.load(Ordering::Relaxed) {
            return Err(EngineError::Unavailable {
                name: self.name.clone(),
                reason: "mock device configured to fail".to_string(),
            });
        }
        info!(source = self.name, "Opened mock source.");
        Ok(())
    }

    fn close(&self) {
        self.record(Call::Close);
    }

    fn obtain_instance(&self) -> Option<InstanceId> {
        self.record(Call::Obtain);
        if self.exhausted.load(Ordering::Relaxed) {
            return None;
        }
        Some(self.next_instance())
    }

    fn play(&self, params: &PlayParams) -> Option<InstanceId> {
        self.record(Call::Play(*params));
        if self.exhausted.load(Ordering::Relaxed) {
            return None;
        }
        let instance = self.next_instance();
        self.notify_started(instance);
        Some(instance)
    }

    fn start(&self, instance: InstanceId) -> Result<(), EngineError> {
        self.record(Call::Start(instance));
        if self.fail_start.load(Ordering::Relaxed) {
            return Err(EngineError::Unavailable {
                name: self.name.clone(),
                reason: "mock engine configured to refuse starts".to_string(),
            });
        }
        self.notify_started(instance);
        Ok(())
    }

    fn set_frame_position(&self, instance: InstanceId, frame: usize) -> Result<(), EngineError> {
        self.record(Call::SetFramePosition(instance, frame));
        Ok(())
    }

    fn set_looping(&self, instance: InstanceId, repeats: u32) -> Result<(), EngineError> {
        self.record(Call::SetLooping(instance, repeats));
        Ok(())
    }

    fn set_volume(&self, instance: InstanceId, volume: f64) -> Result<(), EngineError> {
        self.record(Call::SetVolume(instance, volume));
        Ok(())
    }

    fn set_pan(&self, instance: InstanceId, pan: f64) -> Result<(), EngineError> {
        self.record(Call::SetPan(instance, pan));
        Ok(())
    }

    fn set_speed(&self, instance: InstanceId, speed: f64) -> Result<(), EngineError> {
        self.record(Call::SetSpeed(instance, speed));
        Ok(())
    }

    fn is_playing(&self, instance: InstanceId) -> bool {
        self.record(Call::IsPlaying(instance));
        self.playing.load(Ordering::Relaxed)
    }

    fn volume(&self, _: InstanceId) -> Option<f64> {
        None
    }

    fn pan(&self, _: InstanceId) -> Option<f64> {
        None
    }

    fn speed(&self, _: InstanceId) -> Option<f64> {
        None
    }

    fn add_listener(&self, listener: Arc<dyn InstanceListener>) {
        self.listeners.write().push(listener);
    }
}

impl fmt::Display for MockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
