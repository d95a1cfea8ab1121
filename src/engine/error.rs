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
use super::InstanceId;

/// Error types for sound source operations.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EngineError {
    #[error("Sound source {0} is already open")]
    AlreadyOpen(String),

    #[error("Sound source {0} is not open")]
    NotOpen(String),

    #[error("Sound source {name} has no held instance {instance}")]
    InvalidInstance { name: String, instance: InstanceId },

    #[error("Frame {frame} is past the end of {name} ({frames} frames)")]
    InvalidFrame {
        name: String,
        frame: usize,
        frames: usize,
    },

    #[error("Speed must be positive, got {0}")]
    InvalidSpeed(f64),

    #[error("Audio device unavailable for {name}: {reason}")]
    Unavailable { name: String, reason: String },
}
