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

//! Scenes describe a soundscape: which sources exist, which categories of event can be
//! triggered on them, how often each category comes up and how the loop is paced.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

use crate::params::{Count, Draw, ParamError, ParameterRange, Placement};

pub mod builtin;

/// Errors raised while assembling a scene.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SceneError {
    #[error("Scene {0} has no sound sources")]
    NoSources(String),

    #[error("Duplicate sound source {0}")]
    DuplicateSource(String),

    #[error("Sound source {0} must have at least one voice")]
    NoVoices(String),

    #[error("Duplicate category {0}")]
    DuplicateCategory(String),

    #[error("Category {category} refers to unknown sound source {source_name}")]
    UnknownSource {
        category: String,
        source_name: String,
    },

    #[error("Unknown category {0}")]
    UnknownCategory(String),

    #[error("Category weights are empty or all zero")]
    ZeroWeights,

    #[error("Category weights sum to {0}, more than a u32 can hold")]
    WeightOverflow(u64),

    #[error("Tick pause range is inverted: {min:?} > {max:?}")]
    InvertedTick { min: Duration, max: Duration },

    #[error("Invalid parameters for category {category}: {err}")]
    Params {
        category: String,
        #[source]
        err: ParamError,
    },
}

/// A sound source the scene needs, described by its asset.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceSpec {
    name: String,
    polyphony: usize,
    duration: Duration,
    buffer_hint: Option<usize>,
}

impl SourceSpec {
    pub fn new(
        name: &str,
        polyphony: usize,
        duration: Duration,
        buffer_hint: Option<usize>,
    ) -> SourceSpec {
        SourceSpec {
            name: name.to_string(),
            polyphony,
            duration,
            buffer_hint,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn polyphony(&self) -> usize {
        self.polyphony
    }

    /// Length of the asset at normal speed.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Buffer size to request when the source is opened.
    pub fn buffer_hint(&self) -> Option<usize> {
        self.buffer_hint
    }
}

/// How a category acquires its voice.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// A fresh voice per event, dropped when none is free.
    #[default]
    OneShot,
    /// One voice held for the whole run, never restarted while it is still playing.
    Reserved,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::OneShot => write!(f, "one-shot"),
            Policy::Reserved => write!(f, "reserved"),
        }
    }
}

/// A kind of event the director can trigger.
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    name: String,
    source: String,
    policy: Policy,
    params: ParameterRange,
}

impl Category {
    /// Creates a category, validating its parameter range.
    pub fn new(
        name: &str,
        source: &str,
        policy: Policy,
        placement: Placement,
        speed: Draw,
        repeats: Count,
    ) -> Result<Category, SceneError> {
        let params =
            ParameterRange::new(placement, speed, repeats).map_err(|err| SceneError::Params {
                category: name.to_string(),
                err,
            })?;
        Ok(Category {
            name: name.to_string(),
            source: source.to_string(),
            policy,
            params,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name of the source this category plays on.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn params(&self) -> &ParameterRange {
        &self.params
    }
}

/// Relative frequencies of categories.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightTable {
    entries: Vec<(String, u32)>,
}

impl WeightTable {
    /// Creates a weight table. At least one weight must be non-zero and each category may only
    /// appear once.
    pub fn new(entries: Vec<(String, u32)>) -> Result<WeightTable, SceneError> {
        let mut seen = HashSet::new();
        for (name, _) in entries.iter() {
            if !seen.insert(name.as_str()) {
                return Err(SceneError::DuplicateCategory(name.clone()));
            }
        }
        let total: u64 = entries.iter().map(|(_, weight)| *weight as u64).sum();
        if total == 0 {
            return Err(SceneError::ZeroWeights);
        }
        if total > u32::MAX as u64 {
            return Err(SceneError::WeightOverflow(total));
        }
        Ok(WeightTable { entries })
    }

    pub fn entries(&self) -> &[(String, u32)] {
        &self.entries
    }

    /// The weight of the category, zero if it is not listed.
    pub fn weight(&self, category: &str) -> u32 {
        self.entries
            .iter()
            .find(|(name, _)| name == category)
            .map_or(0, |(_, weight)| *weight)
    }

    /// The probability of drawing the category on a tick.
    pub fn probability(&self, category: &str) -> f64 {
        let total: u64 = self.entries.iter().map(|(_, weight)| *weight as u64).sum();
        self.weight(category) as f64 / total as f64
    }
}

/// Pacing of the tick loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timing {
    tick_min: Duration,
    tick_max: Duration,
    settle: Duration,
    warmup: Duration,
}

impl Timing {
    pub fn new(
        tick_min: Duration,
        tick_max: Duration,
        settle: Duration,
        warmup: Duration,
    ) -> Result<Timing, SceneError> {
        if tick_min > tick_max {
            return Err(SceneError::InvertedTick {
                min: tick_min,
                max: tick_max,
            });
        }
        Ok(Timing {
            tick_min,
            tick_max,
            settle,
            warmup,
        })
    }

    pub fn tick_min(&self) -> Duration {
        self.tick_min
    }

    pub fn tick_max(&self) -> Duration {
        self.tick_max
    }

    /// Time to let voices ring out after the loop before sources are closed.
    pub fn settle(&self) -> Duration {
        self.settle
    }

    /// Time between opening the sources and the first event.
    pub fn warmup(&self) -> Duration {
        self.warmup
    }

    /// Draws the pause before the next tick.
    pub fn draw_pause<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.tick_min == self.tick_max {
            return self.tick_min;
        }
        rng.gen_range(self.tick_min..=self.tick_max)
    }
}

/// A complete, validated soundscape.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    name: String,
    duration: Duration,
    timing: Timing,
    sources: Vec<SourceSpec>,
    categories: Vec<Category>,
    weights: WeightTable,
    opening: Option<String>,
}

impl Scene {
    /// Assembles a scene, checking that every name it refers to exists.
    pub fn new(
        name: &str,
        duration: Duration,
        timing: Timing,
        sources: Vec<SourceSpec>,
        categories: Vec<Category>,
        weights: WeightTable,
        opening: Option<String>,
    ) -> Result<Scene, SceneError> {
        if sources.is_empty() {
            return Err(SceneError::NoSources(name.to_string()));
        }

        let mut source_names = HashSet::new();
        for source in sources.iter() {
            if !source_names.insert(source.name()) {
                return Err(SceneError::DuplicateSource(source.name().to_string()));
            }
            if source.polyphony() == 0 {
                return Err(SceneError::NoVoices(source.name().to_string()));
            }
        }

        let mut category_names = HashSet::new();
        for category in categories.iter() {
            if !category_names.insert(category.name()) {
                return Err(SceneError::DuplicateCategory(category.name().to_string()));
            }
            if !source_names.contains(category.source()) {
                return Err(SceneError::UnknownSource {
                    category: category.name().to_string(),
                    source_name: category.source().to_string(),
                });
            }
        }

        for (category, _) in weights.entries() {
            if !category_names.contains(category.as_str()) {
                return Err(SceneError::UnknownCategory(category.clone()));
            }
        }
        if let Some(opening) = &opening {
            if !category_names.contains(opening.as_str()) {
                return Err(SceneError::UnknownCategory(opening.clone()));
            }
        }

        Ok(Scene {
            name: name.to_string(),
            duration,
            timing,
            sources,
            categories,
            weights,
            opening,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// How long the tick loop runs.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn sources(&self) -> &[SourceSpec] {
        &self.sources
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Category fired once before the loop starts.
    pub fn opening(&self) -> Option<&str> {
        self.opening.as_deref()
    }

    /// Returns a copy of this scene with a different loop duration.
    pub fn with_duration(&self, duration: Duration) -> Scene {
        Scene {
            duration,
            ..self.clone()
        }
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} (duration {:?}, tick {:?}-{:?}, settle {:?})",
            self.name,
            self.duration,
            self.timing.tick_min,
            self.timing.tick_max,
            self.timing.settle
        )?;
        writeln!(f, "  Sources:")?;
        for source in self.sources.iter() {
            writeln!(
                f,
                "  - {}: {} voices, {:?}",
                source.name, source.polyphony, source.duration
            )?;
        }
        write!(f, "  Categories:")?;
        for category in self.categories.iter() {
            write!(
                f,
                "\n  - {} ({} on {}, {:.0}%)",
                category.name,
                category.policy,
                category.source,
                self.weights.probability(&category.name) * 100.0
            )?;
        }
        Ok(())
    }
}
