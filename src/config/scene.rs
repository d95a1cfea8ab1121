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

use std::path::Path;
use std::time::Duration;

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::params::{Count, Draw, Placement, Preset};
use crate::scene::{self, Category as SceneCategory, Policy, SourceSpec, Timing, WeightTable};

const DEFAULT_SETTLE: Duration = Duration::from_secs(1);
const DEFAULT_WARMUP: Duration = Duration::ZERO;
const DEFAULT_WEIGHT: u32 = 1;

/// A YAML representation of a scene.
#[derive(Deserialize, Clone, Debug)]
pub struct Scene {
    /// The name of the scene.
    name: String,

    /// How long the tick loop runs, e.g. "15s".
    duration: String,

    /// Bounds of the pause between ticks.
    tick: Tick,

    /// How long to let voices ring out before closing sources (default: 1s).
    settle: Option<String>,

    /// Delay between opening sources and the first event (default: none).
    warmup: Option<String>,

    /// A category fired once before the tick loop.
    opening: Option<String>,

    /// The recordings the scene plays.
    sources: Vec<Source>,

    /// The kinds of events the scene triggers.
    categories: Vec<Category>,
}

/// Bounds of the pause between ticks.
#[derive(Deserialize, Clone, Debug)]
struct Tick {
    min: String,
    max: String,
}

/// A recording and how many voices it may play at once.
#[derive(Deserialize, Clone, Debug)]
struct Source {
    name: String,
    polyphony: usize,
    /// Length of the recording, e.g. "1500ms".
    length: String,
    /// Passed to the engine when the source is opened.
    buffer_hint: Option<usize>,
}

/// A category of event. Either volume/pan or presets may be given, not both.
#[derive(Deserialize, Clone, Debug)]
struct Category {
    name: String,
    source: String,
    #[serde(default)]
    policy: Policy,
    /// Relative frequency (default: 1).
    weight: Option<u32>,
    /// Volume draw (default: fixed 1.0).
    volume: Option<Draw>,
    /// Pan draw (default: fixed 0.0).
    pan: Option<Draw>,
    presets: Option<Vec<Preset>>,
    /// Speed draw (default: fixed 1.0).
    speed: Option<Draw>,
    /// Repeat count (default: fixed 0).
    repeats: Option<Count>,
}

impl Category {
    fn placement(&self) -> Result<Placement, ConfigError> {
        match &self.presets {
            Some(_) if self.volume.is_some() || self.pan.is_some() => {
                Err(ConfigError::Placement(self.name.clone()))
            }
            Some(presets) => Ok(Placement::Presets(presets.clone())),
            None => Ok(Placement::Free {
                volume: self.volume.clone().unwrap_or(Draw::Fixed(1.0)),
                pan: self.pan.clone().unwrap_or(Draw::Fixed(0.0)),
            }),
        }
    }

    fn to_category(&self) -> Result<SceneCategory, ConfigError> {
        Ok(SceneCategory::new(
            &self.name,
            &self.source,
            self.policy,
            self.placement()?,
            self.speed.clone().unwrap_or(Draw::Fixed(1.0)),
            self.repeats.clone().unwrap_or(Count::Fixed(0)),
        )?)
    }
}

fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    Ok(DurationString::from_string(value.to_string())
        .map_err(|e| ConfigError::Duration {
            value: value.to_string(),
            message: e.to_string(),
        })?
        .into())
}

fn parse_optional_duration(
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => parse_duration(value),
        None => Ok(default),
    }
}

impl Scene {
    /// Parse a scene from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Scene, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Scene>()?)
    }

    /// Returns the name of the scene.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validates the description into a runnable scene.
    pub fn to_scene(&self) -> Result<scene::Scene, ConfigError> {
        let timing = Timing::new(
            parse_duration(&self.tick.min)?,
            parse_duration(&self.tick.max)?,
            parse_optional_duration(&self.settle, DEFAULT_SETTLE)?,
            parse_optional_duration(&self.warmup, DEFAULT_WARMUP)?,
        )?;

        let sources = self
            .sources
            .iter()
            .map(|source| {
                Ok(SourceSpec::new(
                    &source.name,
                    source.polyphony,
                    parse_duration(&source.length)?,
                    source.buffer_hint,
                ))
            })
            .collect::<Result<Vec<SourceSpec>, ConfigError>>()?;

        let categories = self
            .categories
            .iter()
            .map(|category| category.to_category())
            .collect::<Result<Vec<SceneCategory>, ConfigError>>()?;

        let weights = WeightTable::new(
            self.categories
                .iter()
                .map(|category| {
                    (
                        category.name.clone(),
                        category.weight.unwrap_or(DEFAULT_WEIGHT),
                    )
                })
                .collect(),
        )?;

        Ok(scene::Scene::new(
            &self.name,
            parse_duration(&self.duration)?,
            timing,
            sources,
            categories,
            weights,
            self.opening.clone(),
        )?)
    }
}
