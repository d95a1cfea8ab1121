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

//! The polyphonic audio-cue engine contract the director drives.
//!
//! A [SoundSource] is one decoded asset with a fixed number of voices. Decoding, mixing and device
//! output belong to the engine implementation; the director only decides which of these calls to
//! make and with what arguments.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::listener::InstanceListener;

pub mod error;
pub mod mock;
pub mod simulated;

pub use error::EngineError;

/// Identifies one voice within a sound source's polyphony pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(usize);

impl InstanceId {
    /// Creates an instance ID for the voice at the given slot.
    pub fn new(slot: usize) -> InstanceId {
        InstanceId(slot)
    }

    /// The voice slot this ID refers to.
    pub fn slot(&self) -> usize {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The acoustic parameters applied to a voice before it starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayParams {
    /// Gain in [0, 1].
    pub volume: f64,
    /// Stereo position in [-1, 1], full left to full right.
    pub pan: f64,
    /// Playback speed multiplier, which also shifts pitch. Always positive.
    pub speed: f64,
    /// Number of additional times the asset repeats after the first pass.
    pub repeats: u32,
}

impl PlayParams {
    pub fn new(volume: f64, pan: f64, speed: f64, repeats: u32) -> PlayParams {
        PlayParams {
            volume,
            pan,
            speed,
            repeats,
        }
    }
}

impl Default for PlayParams {
    fn default() -> Self {
        PlayParams::new(1.0, 0.0, 1.0, 0)
    }
}

impl fmt::Display for PlayParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vol {:.2}, pan {:+.2}, speed {:.2}, repeats {}",
            self.volume, self.pan, self.speed, self.repeats
        )
    }
}

/// A polyphonic sound source bound to one asset.
///
/// All methods may be called from the control thread while the engine renders on its own
/// threads, so implementations must be internally synchronized. `is_playing` is allowed to lag
/// behind the rendering thread briefly.
pub trait SoundSource: fmt::Display + Send + Sync {
    /// The name of the asset this source plays.
    fn name(&self) -> &str;

    /// Maximum number of concurrent voices.
    fn polyphony(&self) -> usize;

    /// Length of the asset at normal speed.
    fn duration(&self) -> Duration;

    /// Acquires the output resources. The buffer hint is passed on to the device when given.
    fn open(&self, buffer_hint: Option<usize>) -> Result<(), EngineError>;

    /// Releases the output resources. Expected to be called once, after all voices are idle.
    fn close(&self);

    /// Holds a voice for long-term use. The voice is never recycled by the engine. Returns
    /// None if every voice is in use.
    fn obtain_instance(&self) -> Option<InstanceId>;

    /// Acquires, configures and starts a voice that is recycled when it finishes. Returns None
    /// if every voice is in use.
    fn play(&self, params: &PlayParams) -> Option<InstanceId>;

    /// Starts a held voice from its current position.
    fn start(&self, instance: InstanceId) -> Result<(), EngineError>;

    /// Moves a held voice's play head.
    fn set_frame_position(&self, instance: InstanceId, frame: usize) -> Result<(), EngineError>;

    /// Sets how many extra passes a held voice plays.
    fn set_looping(&self, instance: InstanceId, repeats: u32) -> Result<(), EngineError>;

    fn set_volume(&self, instance: InstanceId, volume: f64) -> Result<(), EngineError>;

    fn set_pan(&self, instance: InstanceId, pan: f64) -> Result<(), EngineError>;

    fn set_speed(&self, instance: InstanceId, speed: f64) -> Result<(), EngineError>;

    /// Returns true if the voice is currently sounding.
    fn is_playing(&self, instance: InstanceId) -> bool;

    fn volume(&self, instance: InstanceId) -> Option<f64>;

    fn pan(&self, instance: InstanceId) -> Option<f64>;

    fn speed(&self, instance: InstanceId) -> Option<f64>;

    /// Registers a passive observer for lifecycle and instance events.
    fn add_listener(&self, listener: Arc<dyn InstanceListener>);
}
