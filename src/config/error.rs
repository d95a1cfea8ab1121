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

use crate::scene::SceneError;

/// Typed error for scene file failures so callers can tell a missing or malformed file from a
/// scene that parsed but does not make sense.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid duration {value}: {message}")]
    Duration { value: String, message: String },

    #[error("Category {0} sets both presets and volume/pan")]
    Placement(String),

    #[error("Invalid scene: {0}")]
    Scene(#[from] SceneError),
}
