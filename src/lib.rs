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

//! Procedural ambient soundscapes.
//!
//! A [director::Director] plays a [scene::Scene] on a set of polyphonic sound sources: at random
//! intervals it picks a category of event by weight, draws its volume, pan, speed and repeat
//! count, and starts a voice for it.

pub mod clock;
pub mod config;
pub mod director;
pub mod engine;
pub mod listener;
pub mod params;
pub mod pool;
pub mod prep;
pub mod scene;
pub mod stop;
