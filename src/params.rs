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

//! Randomized acoustic parameters per sound category.
//!
//! A [ParameterRange] describes, for one category, where volume, pan, speed and repeat count may
//! fall. Ranges are validated once when they are built; [sample] then only draws.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::Deserialize;

use crate::engine::PlayParams;

/// Errors raised while building a parameter range.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamError {
    #[error("{dimension} range is inverted: min {min} > max {max}")]
    Inverted {
        dimension: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{dimension} value {value} is outside [{low}, {high}]")]
    OutOfBounds {
        dimension: &'static str,
        value: f64,
        low: f64,
        high: f64,
    },

    #[error("{0} must be a finite number")]
    NotFinite(&'static str),

    #[error("Speed must be positive, got {0}")]
    NonPositiveSpeed(f64),

    #[error("{0} choice list is empty")]
    EmptyChoice(&'static str),

    #[error("Repeat range is inverted: min {min} > max {max}")]
    InvertedRepeats { min: u32, max: u32 },

    #[error("Repeat weights are empty or all zero")]
    ZeroWeights,

    #[error("Repeat weights sum to {0}, more than a u32 can hold")]
    WeightOverflow(u64),

    #[error("At least one spatial preset is required")]
    NoPresets,
}

/// How a single continuous parameter is drawn.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Draw {
    /// Always the same value.
    Fixed(f64),
    /// Uniform over [min, max].
    Uniform { min: f64, max: f64 },
    /// One of the listed values, each equally likely.
    Choice(Vec<f64>),
}

impl Draw {
    /// Every value this draw can produce.
    fn values(&self) -> Vec<f64> {
        match self {
            Draw::Fixed(value) => vec![*value],
            Draw::Uniform { min, max } => vec![*min, *max],
            Draw::Choice(values) => values.clone(),
        }
    }

    /// Checks that the draw is well-formed and stays within [low, high].
    fn validate(&self, dimension: &'static str, low: f64, high: f64) -> Result<(), ParamError> {
        match self {
            Draw::Uniform { min, max } if min > max => {
                return Err(ParamError::Inverted {
                    dimension,
                    min: *min,
                    max: *max,
                })
            }
            Draw::Choice(values) if values.is_empty() => {
                return Err(ParamError::EmptyChoice(dimension))
            }
            _ => {}
        }

        for value in self.values() {
            if !value.is_finite() {
                return Err(ParamError::NotFinite(dimension));
            }
            if value < low || value > high {
                return Err(ParamError::OutOfBounds {
                    dimension,
                    value,
                    low,
                    high,
                });
            }
        }
        Ok(())
    }

    fn validate_speed(&self) -> Result<(), ParamError> {
        self.validate("speed", f64::MIN, f64::MAX)?;
        for value in self.values() {
            if value <= 0.0 {
                return Err(ParamError::NonPositiveSpeed(value));
            }
        }
        Ok(())
    }

    /// Draws a value.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Draw::Fixed(value) => *value,
            Draw::Uniform { min, max } if min == max => *min,
            Draw::Uniform { min, max } => rng.gen_range(*min..=*max),
            Draw::Choice(values) => values[rng.gen_range(0..values.len())],
        }
    }
}

/// A repeat count and its relative likelihood.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct WeightedCount {
    pub value: u32,
    pub weight: u32,
}

/// How the repeat count is drawn.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Count {
    Fixed(u32),
    /// Uniform over the inclusive range.
    Range { min: u32, max: u32 },
    Weighted(Vec<WeightedCount>),
}

impl Count {
    fn validate(&self) -> Result<(), ParamError> {
        match self {
            Count::Fixed(_) => Ok(()),
            Count::Range { min, max } if min > max => Err(ParamError::InvertedRepeats {
                min: *min,
                max: *max,
            }),
            Count::Range { .. } => Ok(()),
            Count::Weighted(entries) => {
                let total: u64 = entries.iter().map(|entry| entry.weight as u64).sum();
                if total > u32::MAX as u64 {
                    Err(ParamError::WeightOverflow(total))
                } else if WeightedIndex::new(entries.iter().map(|entry| entry.weight)).is_err() {
                    Err(ParamError::ZeroWeights)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Draws a repeat count.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        match self {
            Count::Fixed(value) => *value,
            Count::Range { min, max } => rng.gen_range(*min..=*max),
            // Unvalidated weights that are all zero fall back to no repeats.
            Count::Weighted(entries) => {
                WeightedIndex::new(entries.iter().map(|entry| entry.weight))
                    .map_or(0, |index| entries[index.sample(rng)].value)
            }
        }
    }

    /// Every repeat count this draw can produce.
    #[cfg(test)]
    pub fn values(&self) -> Vec<u32> {
        match self {
            Count::Fixed(value) => vec![*value],
            Count::Range { min, max } => (*min..=*max).collect(),
            Count::Weighted(entries) => entries
                .iter()
                .filter(|entry| entry.weight > 0)
                .map(|entry| entry.value)
                .collect(),
        }
    }
}

/// A fixed volume/pan placement, e.g. "near left" or "far right".
#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Preset {
    pub volume: f64,
    pub pan: f64,
}

/// Where a sound sits in the stereo field and how loud it is.
#[derive(Clone, Debug, PartialEq)]
pub enum Placement {
    /// Volume and pan are drawn independently.
    Free { volume: Draw, pan: Draw },
    /// One of the presets is chosen, each equally likely.
    Presets(Vec<Preset>),
}

/// The parameter bounds for one category.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterRange {
    placement: Placement,
    speed: Draw,
    repeats: Count,
}

impl ParameterRange {
    /// Builds a parameter range, rejecting anything that could produce a volume outside [0, 1],
    /// a pan outside [-1, 1] or a non-positive speed.
    pub fn new(
        placement: Placement,
        speed: Draw,
        repeats: Count,
    ) -> Result<ParameterRange, ParamError> {
        match &placement {
            Placement::Free { volume, pan } => {
                volume.validate("volume", 0.0, 1.0)?;
                pan.validate("pan", -1.0, 1.0)?;
            }
            Placement::Presets(presets) => {
                if presets.is_empty() {
                    return Err(ParamError::NoPresets);
                }
                for preset in presets {
                    Draw::Fixed(preset.volume).validate("volume", 0.0, 1.0)?;
                    Draw::Fixed(preset.pan).validate("pan", -1.0, 1.0)?;
                }
            }
        }
        speed.validate_speed()?;
        repeats.validate()?;

        Ok(ParameterRange {
            placement,
            speed,
            repeats,
        })
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn speed(&self) -> &Draw {
        &self.speed
    }

    pub fn repeats(&self) -> &Count {
        &self.repeats
    }
}

/// Draws a parameter tuple for a category. Volume and pan come first, then speed, then repeats.
pub fn sample<R: Rng + ?Sized>(range: &ParameterRange, rng: &mut R) -> PlayParams {
    let (volume, pan) = match &range.placement {
        Placement::Free { volume, pan } => {
            let volume = volume.sample(rng);
            (volume, pan.sample(rng))
        }
        Placement::Presets(presets) => {
            let preset = presets[rng.gen_range(0..presets.len())];
            (preset.volume, preset.pan)
        }
    };
    let speed = range.speed.sample(rng);
    let repeats = range.repeats.sample(rng);

    PlayParams::new(volume, pan, speed, repeats)
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn heavy() -> ParameterRange {
        ParameterRange::new(
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
        )
        .expect("valid range")
    }

    fn single_shot() -> ParameterRange {
        ParameterRange::new(
            Placement::Free {
                volume: Draw::Uniform { min: 0.1, max: 0.6 },
                pan: Draw::Uniform {
                    min: -0.5,
                    max: 0.5,
                },
            },
            Draw::Choice(vec![1.0, 1.2]),
            Count::Weighted(vec![
                WeightedCount {
                    value: 0,
                    weight: 1,
                },
                WeightedCount {
                    value: 1,
                    weight: 1,
                },
            ]),
        )
        .expect("valid range")
    }

    #[test]
    fn test_samples_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for range in [heavy(), single_shot()] {
            for _ in 0..10_000 {
                let params = sample(&range, &mut rng);
                assert!((0.0..=1.0).contains(&params.volume), "{}", params);
                assert!((-1.0..=1.0).contains(&params.pan), "{}", params);
                assert!(params.speed > 0.0, "{}", params);
            }
        }
    }

    #[test]
    fn test_heavy_range_slows_playback() {
        let mut rng = StdRng::seed_from_u64(11);
        let range = heavy();
        for _ in 0..1_000 {
            let params = sample(&range, &mut rng);
            assert!((0.1..=0.3).contains(&params.speed));
            assert!((0.45..=0.95).contains(&params.volume));
            assert_eq!(params.repeats, 0);
        }
    }

    #[test]
    fn test_discrete_choices() {
        let mut rng = StdRng::seed_from_u64(3);
        let range = single_shot();
        let mut repeats = HashSet::new();
        let mut speeds = HashSet::new();
        for _ in 0..10_000 {
            let params = sample(&range, &mut rng);
            assert!(params.repeats <= 1);
            assert!(params.speed == 1.0 || params.speed == 1.2);
            repeats.insert(params.repeats);
            speeds.insert(params.speed.to_bits());
        }
        assert_eq!(repeats.len(), 2);
        assert_eq!(speeds.len(), 2);
    }

    #[test]
    fn test_presets_are_never_mixed() {
        let presets = vec![
            Preset {
                volume: 0.2,
                pan: -0.67,
            },
            Preset {
                volume: 0.3,
                pan: 0.75,
            },
        ];
        let range = ParameterRange::new(
            Placement::Presets(presets.clone()),
            Draw::Fixed(1.6),
            Count::Range { min: 2, max: 7 },
        )
        .expect("valid range");

        let mut rng = StdRng::seed_from_u64(5);
        let mut seen = HashSet::new();
        for _ in 0..5_000 {
            let params = sample(&range, &mut rng);
            let preset = Preset {
                volume: params.volume,
                pan: params.pan,
            };
            let index = presets
                .iter()
                .position(|p| *p == preset)
                .expect("placement must come from a preset");
            seen.insert(index);
            assert!((2..=7).contains(&params.repeats));
            assert_eq!(params.speed, 1.6);
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_weighted_repeats_follow_weights() {
        let repeats = Count::Weighted(vec![
            WeightedCount {
                value: 0,
                weight: 9,
            },
            WeightedCount {
                value: 1,
                weight: 1,
            },
        ]);
        let mut rng = StdRng::seed_from_u64(42);
        let doubles = (0..10_000)
            .filter(|_| repeats.sample(&mut rng) == 1)
            .count();
        assert!((700..1_300).contains(&doubles), "doubles: {}", doubles);
        assert_eq!(repeats.values(), vec![0, 1]);
    }

    #[test]
    fn test_zero_weight_repeats_are_never_drawn() {
        let repeats = Count::Weighted(vec![
            WeightedCount {
                value: 3,
                weight: 0,
            },
            WeightedCount {
                value: 5,
                weight: 2,
            },
            WeightedCount {
                value: 7,
                weight: 0,
            },
        ]);
        let mut rng = StdRng::seed_from_u64(8);
        assert!((0..1_000).all(|_| repeats.sample(&mut rng) == 5));
        assert_eq!(repeats.values(), vec![5]);
    }

    #[test]
    fn test_same_seed_same_samples() {
        let range = single_shot();
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        for _ in 0..100 {
            assert_eq!(sample(&range, &mut a), sample(&range, &mut b));
        }
    }

    #[test]
    fn test_invalid_ranges_fail_fast() {
        let free = |volume, pan| Placement::Free { volume, pan };

        assert_eq!(
            ParameterRange::new(
                free(
                    Draw::Uniform { min: 0.9, max: 0.1 },
                    Draw::Fixed(0.0)
                ),
                Draw::Fixed(1.0),
                Count::Fixed(0),
            ),
            Err(ParamError::Inverted {
                dimension: "volume",
                min: 0.9,
                max: 0.1
            })
        );
        assert!(matches!(
            ParameterRange::new(
                free(Draw::Fixed(1.2), Draw::Fixed(0.0)),
                Draw::Fixed(1.0),
                Count::Fixed(0)
            ),
            Err(ParamError::OutOfBounds {
                dimension: "volume",
                ..
            })
        ));
        assert!(matches!(
            ParameterRange::new(
                free(Draw::Fixed(0.5), Draw::Choice(vec![0.0, -1.5])),
                Draw::Fixed(1.0),
                Count::Fixed(0)
            ),
            Err(ParamError::OutOfBounds {
                dimension: "pan",
                ..
            })
        ));
        assert_eq!(
            ParameterRange::new(
                free(Draw::Fixed(0.5), Draw::Fixed(0.0)),
                Draw::Uniform { min: 0.0, max: 1.0 },
                Count::Fixed(0)
            ),
            Err(ParamError::NonPositiveSpeed(0.0))
        );
        assert_eq!(
            ParameterRange::new(
                free(Draw::Fixed(0.5), Draw::Fixed(0.0)),
                Draw::Choice(vec![]),
                Count::Fixed(0)
            ),
            Err(ParamError::EmptyChoice("speed"))
        );
        assert_eq!(
            ParameterRange::new(
                free(Draw::Fixed(0.5), Draw::Fixed(f64::NAN)),
                Draw::Fixed(1.0),
                Count::Fixed(0)
            ),
            Err(ParamError::NotFinite("pan"))
        );
        assert_eq!(
            ParameterRange::new(
                Placement::Presets(vec![]),
                Draw::Fixed(1.0),
                Count::Fixed(0)
            ),
            Err(ParamError::NoPresets)
        );
        assert_eq!(
            ParameterRange::new(
                free(Draw::Fixed(0.5), Draw::Fixed(0.0)),
                Draw::Fixed(1.0),
                Count::Range { min: 7, max: 2 }
            ),
            Err(ParamError::InvertedRepeats { min: 7, max: 2 })
        );
        assert_eq!(
            ParameterRange::new(
                free(Draw::Fixed(0.5), Draw::Fixed(0.0)),
                Draw::Fixed(1.0),
                Count::Weighted(vec![WeightedCount {
                    value: 1,
                    weight: 0
                }])
            ),
            Err(ParamError::ZeroWeights)
        );
        assert_eq!(
            ParameterRange::new(
                free(Draw::Fixed(0.5), Draw::Fixed(0.0)),
                Draw::Fixed(1.0),
                Count::Weighted(vec![
                    WeightedCount {
                        value: 0,
                        weight: u32::MAX
                    },
                    WeightedCount {
                        value: 1,
                        weight: 1
                    },
                ])
            ),
            Err(ParamError::WeightOverflow(u32::MAX as u64 + 1))
        );
    }
}
