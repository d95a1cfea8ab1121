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

//! The soundscape director.
//!
//! A director owns the sound sources of a scene for the length of one run. Each tick it draws a
//! category from the weight table, samples parameters for it, hands the event to the category's
//! voice policy and then pauses for a random interval. When the duration budget is spent (or a
//! stop is requested) it waits for the settle time and closes every source exactly once.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use tracing::{debug, error, info, span, warn, Level};

use crate::clock::Clock;
use crate::engine::{EngineError, InstanceId, PlayParams, SoundSource};
use crate::params::{self, ParameterRange};
use crate::pool::InstancePool;
use crate::scene::{Policy, Scene, Timing, WeightTable};
use crate::stop::StopHandle;


/// Errors that prevent a run from starting.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DirectorError {
    #[error("No sound source provided for {0}")]
    MissingSource(String),

    #[error("Unknown category {0}")]
    UnknownCategory(String),

    #[error("Category weights are empty or all zero")]
    ZeroWeights,

    #[error("Failed to open sound source: {0}")]
    Open(#[from] EngineError),
}

/// What happened to a triggered event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A voice started.
    Fired,
    /// No voice was available, or the engine refused to start one.
    Dropped,
    /// The reserved voice was still playing.
    Skipped,
}

/// A single scheduling decision.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleEvent {
    /// Clock time of the decision.
    pub at: Duration,
    pub category: String,
    pub params: PlayParams,
    pub outcome: Outcome,
}

/// Summary of a completed run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunReport {
    /// Iterations of the tick loop. The opening event is not a tick.
    pub ticks: u64,
    pub fired: u64,
    pub dropped: u64,
    pub skipped: u64,
    /// Time spent in the tick loop.
    pub elapsed: Duration,
    /// True if the loop ended because of a stop request.
    pub stopped: bool,
}

impl RunReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Fired => self.fired += 1,
            Outcome::Dropped => self.dropped += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ticks in {:?}: {} fired, {} dropped, {} skipped{}",
            self.ticks,
            self.elapsed,
            self.fired,
            self.dropped,
            self.skipped,
            if self.stopped { " (stopped)" } else { "" }
        )
    }
}

/// A category bound to the pool it plays on.
struct ActiveCategory {
    name: String,
    pool: usize,
    policy: Policy,
    params: ParameterRange,
    /// The held voice for reserved categories, once one could be obtained.
    reserved: Option<InstanceId>,
}

type EventSink = Box<dyn FnMut(&ScheduleEvent) + Send>;

/// Runs a scene against a set of sound sources.
pub struct Director<R: Rng> {
    name: String,
    pools: Vec<InstancePool>,
    buffer_hints: Vec<Option<usize>>,
    categories: Vec<ActiveCategory>,
    opening: Option<usize>,
    timing: Timing,
    rng: R,
    clock: Arc<dyn Clock>,
    stop: StopHandle,
    sink: Option<EventSink>,
}

impl<R: Rng> Director<R> {
    /// Creates a director for the scene. Every source the scene names must be among the given
    /// sources; sources are matched by name and are not opened until the run starts.
    pub fn new(
        scene: &Scene,
        sources: Vec<Arc<dyn SoundSource>>,
        rng: R,
        clock: Arc<dyn Clock>,
    ) -> Result<Director<R>, DirectorError> {
        let mut pools = Vec::with_capacity(scene.sources().len());
        let mut buffer_hints = Vec::with_capacity(scene.sources().len());
        for spec in scene.sources() {
            let source = sources
                .iter()
                .find(|source| source.name() == spec.name())
                .ok_or_else(|| DirectorError::MissingSource(spec.name().to_string()))?;
            pools.push(InstancePool::new(Arc::clone(source)));
            buffer_hints.push(spec.buffer_hint());
        }

        let mut categories = Vec::with_capacity(scene.categories().len());
        for category in scene.categories() {
            let pool = scene
                .sources()
                .iter()
                .position(|spec| spec.name() == category.source())
                .ok_or_else(|| DirectorError::MissingSource(category.source().to_string()))?;
            categories.push(ActiveCategory {
                name: category.name().to_string(),
                pool,
                policy: category.policy(),
                params: category.params().clone(),
                reserved: None,
            });
        }

        let opening = match scene.opening() {
            Some(name) => Some(
                categories
                    .iter()
                    .position(|category| category.name == name)
                    .ok_or_else(|| DirectorError::UnknownCategory(name.to_string()))?,
            ),
            None => None,
        };

        Ok(Director {
            name: scene.name().to_string(),
            pools,
            buffer_hints,
            categories,
            opening,
            timing: *scene.timing(),
            rng,
            clock,
            stop: StopHandle::new(),
            sink: None,
        })
    }

    /// Returns a handle that ends the run early. The director still settles and tears down.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Receives every scheduling decision as it is made.
    pub fn set_event_sink<F>(&mut self, sink: F)
    where
        F: FnMut(&ScheduleEvent) + Send + 'static,
    {
        self.sink = Some(Box::new(sink));
    }

    /// Runs the tick loop for the given duration with the given category weights. Consumes the
    /// director: sources are opened at the start and closed once at the end.
    pub fn run(
        mut self,
        duration: Duration,
        weights: &WeightTable,
    ) -> Result<RunReport, DirectorError> {
        let span = span!(Level::INFO, "soundscape", scene = %self.name);
        let _enter = span.enter();

        let (indices, distribution) = self.resolve(weights)?;
        self.open_sources()?;
        self.reserve_voices();

        if !self.timing.warmup().is_zero() {
            self.clock.sleep(self.timing.warmup());
        }

        let mut report = RunReport::default();
        if let Some(opening) = self.opening {
            self.trigger(opening, &mut report);
        }

        info!(duration = ?duration, "Starting soundscape");
        let started = self.clock.now();
        while self.clock.now().saturating_sub(started) < duration {
            if self.stop.is_stopped() {
                info!("Stop requested, ending soundscape early");
                break;
            }

            let category = indices[distribution.sample(&mut self.rng)];
            report.ticks += 1;
            self.trigger(category, &mut report);

            let pause = self.timing.draw_pause(&mut self.rng);
            self.clock.wait(pause, &self.stop);
        }
        report.elapsed = self.clock.now().saturating_sub(started);
        report.stopped = self.stop.is_stopped();

        debug!(settle = ?self.timing.settle(), "Letting voices settle");
        self.clock.sleep(self.timing.settle());
        self.close_sources();

        info!(
            ticks = report.ticks,
            fired = report.fired,
            dropped = report.dropped,
            skipped = report.skipped,
            stopped = report.stopped,
            "Soundscape finished"
        );
        Ok(report)
    }

    /// Maps the weight table onto category indices.
    fn resolve(
        &self,
        weights: &WeightTable,
    ) -> Result<(Vec<usize>, WeightedIndex<u32>), DirectorError> {
        let mut indices = Vec::with_capacity(weights.entries().len());
        let mut values = Vec::with_capacity(weights.entries().len());
        for (name, weight) in weights.entries() {
            let index = self
                .categories
                .iter()
                .position(|category| &category.name == name)
                .ok_or_else(|| DirectorError::UnknownCategory(name.clone()))?;
            indices.push(index);
            values.push(*weight);
        }

        let distribution = WeightedIndex::new(values).map_err(|_| DirectorError::ZeroWeights)?;
        Ok((indices, distribution))
    }

    /// Opens every source. If one fails, the ones already opened are closed again.
    fn open_sources(&self) -> Result<(), DirectorError> {
        for (index, pool) in self.pools.iter().enumerate() {
            if let Err(e) = pool.source().open(self.buffer_hints[index]) {
                error!(source = pool.source().name(), err = %e, "Failed to open sound source");
                for opened in self.pools[..index].iter() {
                    opened.source().close();
                }
                return Err(e.into());
            }
            debug!(source = %pool.source(), "Opened sound source");
        }
        Ok(())
    }

    fn reserve_voices(&mut self) {
        for category in self.categories.iter_mut() {
            if category.policy != Policy::Reserved {
                continue;
            }
            category.reserved = self.pools[category.pool].reserve();
            if category.reserved.is_none() {
                warn!(
                    category = %category.name,
                    "No voice available to reserve, retrying when the category comes up"
                );
            }
        }
    }

    /// Samples parameters for the category and hands them to its voice policy.
    fn trigger(&mut self, index: usize, report: &mut RunReport) {
        let at = self.clock.now();
        let category = &mut self.categories[index];
        let params = params::sample(&category.params, &mut self.rng);
        let pool = &mut self.pools[category.pool];

        let outcome = match category.policy {
            Policy::OneShot => {
                if pool.try_fire_one_shot(&params) {
                    Outcome::Fired
                } else {
                    Outcome::Dropped
                }
            }
            Policy::Reserved => {
                if category.reserved.is_none() {
                    category.reserved = pool.reserve();
                }
                match category.reserved {
                    Some(instance) => match pool.trigger_reserved(instance, &params) {
                        Ok(true) => Outcome::Fired,
                        Ok(false) => Outcome::Skipped,
                        Err(_) => Outcome::Dropped,
                    },
                    None => Outcome::Dropped,
                }
            }
        };
        report.record(outcome);
        debug!(category = %category.name, %params, ?outcome, "Tick");

        if let Some(sink) = self.sink.as_mut() {
            sink(&ScheduleEvent {
                at,
                category: category.name.clone(),
                params,
                outcome,
            });
        }
    }

    fn close_sources(&self) {
        for pool in self.pools.iter() {
            pool.source().close();
            let stats = pool.stats();
            debug!(
                source = pool.source().name(),
                fired = stats.fired,
                dropped = stats.dropped,
                skipped = stats.skipped,
                "Closed sound source"
            );
        }
    }
}

impl<R: Rng> fmt::Debug for Director<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Director")
            .field("scene", &self.name)
            .field("pools", &self.pools)
            .field("timing", &self.timing)
            .finish()
    }
}
