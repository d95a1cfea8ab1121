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

//! The stock scenes.
//!
//! `battlefield` builds a skirmish out of a single gunshot recording: slowed-down shots become
//! distant bombs, a truncated copy looped quickly becomes machine-gun fire, and the plain shot is
//! a rifle that fires once or twice. `frogpond` scatters croaks from one recording around the
//! stereo field.

use std::time::Duration;

use super::{Category, Policy, Scene, SceneError, SourceSpec, Timing, WeightTable};
use crate::params::{Count, Draw, Placement, Preset, WeightedCount};

/// Names of the built-in scenes.
pub const NAMES: &[&str] = &["battlefield", "frogpond"];

/// Looks up a built-in scene by name.
pub fn get(name: &str) -> Result<Option<Scene>, SceneError> {
    match name {
        "battlefield" => battlefield().map(Some),
        "frogpond" => frogpond().map(Some),
        _ => Ok(None),
    }
}

/// Every built-in scene.
pub fn all() -> Result<Vec<Scene>, SceneError> {
    Ok(vec![battlefield()?, frogpond()?])
}

fn weighted(entries: &[(&str, u32)]) -> Result<WeightTable, SceneError> {
    WeightTable::new(
        entries
            .iter()
            .map(|(name, weight)| (name.to_string(), *weight))
            .collect(),
    )
}

fn once_or_twice(double_weight: u32, single_weight: u32) -> Count {
    Count::Weighted(vec![
        WeightedCount {
            value: 0,
            weight: single_weight,
        },
        WeightedCount {
            value: 1,
            weight: double_weight,
        },
    ])
}

/// Gunfire and explosions from one recording.
pub fn battlefield() -> Result<Scene, SceneError> {
    let bursts = Count::Range { min: 2, max: 7 };

    let near_gun = Category::new(
        "near-machine-gun",
        "semi-auto",
        Policy::Reserved,
        Placement::Free {
            volume: Draw::Fixed(0.6),
            pan: Draw::Fixed(0.0),
        },
        Draw::Fixed(1.55),
        bursts.clone(),
    )?;
    let far_guns = Category::new(
        "far-machine-gun",
        "semi-auto",
        Policy::OneShot,
        Placement::Presets(vec![
            Preset {
                volume: 0.2,
                pan: -0.67,
            },
            Preset {
                volume: 0.3,
                pan: 0.75,
            },
        ]),
        Draw::Fixed(1.6),
        bursts,
    )?;
    let bomb = Category::new(
        "bomb",
        "single-shot",
        Policy::OneShot,
        Placement::Free {
            volume: Draw::Uniform {
                min: 0.45,
                max: 0.95,
            },
            pan: Draw::Uniform {
                min: -0.8,
                max: 0.8,
            },
        },
        Draw::Uniform { min: 0.1, max: 0.3 },
        Count::Fixed(0),
    )?;
    let rifle = Category::new(
        "rifle",
        "single-shot",
        Policy::OneShot,
        Placement::Free {
            volume: Draw::Uniform { min: 0.1, max: 0.6 },
            pan: Draw::Uniform {
                min: -0.5,
                max: 0.5,
            },
        },
        Draw::Choice(vec![1.0, 1.2]),
        once_or_twice(1, 1),
    )?;

    Scene::new(
        "battlefield",
        Duration::from_secs(15),
        Timing::new(
            Duration::from_millis(100),
            Duration::from_millis(1100),
            Duration::from_secs(3),
            Duration::ZERO,
        )?,
        vec![
            SourceSpec::new("single-shot", 12, Duration::from_millis(1500), Some(2048)),
            SourceSpec::new("semi-auto", 3, Duration::from_millis(125), None),
        ],
        vec![near_gun, far_guns, bomb, rifle],
        weighted(&[
            ("near-machine-gun", 2),
            ("far-machine-gun", 2),
            ("bomb", 3),
            ("rifle", 3),
        ])?,
        // The long tail of a slowed shot sets up the sense of space.
        Some("bomb".to_string()),
    )
}

/// Frog croaks from one recording.
pub fn frogpond() -> Result<Scene, SceneError> {
    let croak = Category::new(
        "croak",
        "frog",
        Policy::OneShot,
        Placement::Free {
            volume: Draw::Uniform { min: 0.2, max: 1.0 },
            pan: Draw::Uniform {
                min: -0.8,
                max: 0.8,
            },
        },
        Draw::Uniform {
            min: 0.91,
            max: 1.09,
        },
        once_or_twice(1, 9),
    )?;

    Scene::new(
        "frogpond",
        Duration::from_secs(15),
        Timing::new(
            Duration::from_millis(150),
            Duration::from_millis(1150),
            Duration::from_secs(1),
            Duration::from_millis(100),
        )?,
        vec![SourceSpec::new("frog", 4, Duration::from_millis(600), None)],
        vec![croak],
        weighted(&[("croak", 1)])?,
        None,
    )
}
