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

//! Offline preparation of sample data before it is handed to an engine.

/// Errors raised while preparing PCM.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PrepError {
    #[error("Channel count must be at least 1")]
    NoChannels,

    #[error("PCM length {len} is not a multiple of {channels} channels")]
    Misaligned { len: usize, channels: usize },

    #[error("Requested {frames} frames but only {available} are available")]
    TooShort { frames: usize, available: usize },

    #[error("Fade start {fade_start} is past the end at {frames}")]
    FadeOutOfRange { fade_start: usize, frames: usize },
}

/// Truncates interleaved PCM to `frames` frames. Frames before `fade_start` are copied as is;
/// from `fade_start` on the signal ramps linearly down to silence, so the last frame is the only
/// one fully muted.
pub fn trim_with_fade(
    pcm: &[f32],
    channels: usize,
    frames: usize,
    fade_start: usize,
) -> Result<Vec<f32>, PrepError> {
    if channels == 0 {
        return Err(PrepError::NoChannels);
    }
    if pcm.len() % channels != 0 {
        return Err(PrepError::Misaligned {
            len: pcm.len(),
            channels,
        });
    }
    let available = pcm.len() / channels;
    if frames > available {
        return Err(PrepError::TooShort { frames, available });
    }
    if fade_start > frames {
        return Err(PrepError::FadeOutOfRange { fade_start, frames });
    }

    let fade_len = frames - fade_start;
    let mut trimmed = pcm[..frames * channels].to_vec();
    for (frame, samples) in trimmed.chunks_exact_mut(channels).enumerate().skip(fade_start) {
        let gain = (frames - 1 - frame) as f32 / fade_len as f32;
        for sample in samples {
            *sample *= gain;
        }
    }
    Ok(trimmed)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_trim_without_fade() {
        let pcm = [0.1, -0.1, 0.2, -0.2, 0.3, -0.3];
        let trimmed = trim_with_fade(&pcm, 2, 2, 2).expect("trim");
        assert_eq!(trimmed, vec![0.1, -0.1, 0.2, -0.2]);
    }

    #[test]
    fn test_fade_is_linear_to_silence() {
        let pcm = vec![1.0f32; 10];
        let trimmed = trim_with_fade(&pcm, 1, 8, 4).expect("trim");

        assert_eq!(trimmed.len(), 8);
        assert_eq!(&trimmed[..4], &[1.0, 1.0, 1.0, 1.0]);
        let expected = [0.75, 0.5, 0.25, 0.0];
        for (actual, expected) in trimmed[4..].iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-6, "{actual} != {expected}");
        }
    }

    #[test]
    fn test_fade_applies_to_every_channel() {
        let pcm: Vec<f32> = (0..12).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        let trimmed = trim_with_fade(&pcm, 2, 6, 2).expect("trim");

        for frame in trimmed.chunks_exact(2) {
            assert_eq!(frame[0], -frame[1]);
        }
        assert_eq!(trimmed[10], 0.0);
        assert_eq!(trimmed[11], 0.0);
        assert!(trimmed[4] > trimmed[6]);
    }

    #[test]
    fn test_gunshot_shape() {
        let pcm = vec![0.5f32; 2 * 20_000];
        let trimmed = trim_with_fade(&pcm, 2, 11_000, 6_000).expect("trim");

        assert_eq!(trimmed.len(), 22_000);
        assert!(trimmed[..12_000].iter().all(|sample| *sample == 0.5));
        assert!(trimmed[12_000] < 0.5);
        assert_eq!(trimmed[21_999], 0.0);
    }

    #[test]
    fn test_invalid_input() {
        let pcm = [0.0f32; 6];
        assert_eq!(trim_with_fade(&pcm, 0, 1, 0), Err(PrepError::NoChannels));
        assert_eq!(
            trim_with_fade(&pcm, 4, 1, 0),
            Err(PrepError::Misaligned { len: 6, channels: 4 })
        );
        assert_eq!(
            trim_with_fade(&pcm, 2, 4, 0),
            Err(PrepError::TooShort {
                frames: 4,
                available: 3
            })
        );
        assert_eq!(
            trim_with_fade(&pcm, 2, 2, 3),
            Err(PrepError::FadeOutOfRange {
                fade_start: 3,
                frames: 2
            })
        );
    }
}
