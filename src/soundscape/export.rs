//! Offline rendering of soundscapes to WAV

use std::path::Path;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use super::engine::{SoundscapeEngine, SoundscapeState};
use super::profile::SoundscapeProfile;
use super::synth::SynthGraph;
use crate::error::{FocusError, Result};

/// Largest frame count a 32-bit float mono WAV can hold (4 GiB data chunk)
pub const MAX_RENDER_FRAMES: u64 = (u32::MAX as u64 - 64) / 4;

fn mono_float_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    }
}

/// Write mono samples as 32-bit float WAV
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let mut writer = WavWriter::create(path, mono_float_spec(sample_rate))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Render `duration` of `profile` at `volume` and write it to `path`
///
/// Samples are streamed straight into the file, so memory use does not grow
/// with the duration. Returns the number of frames written.
pub fn render_profile(
    profile: SoundscapeProfile,
    volume: f32,
    duration: Duration,
    sample_rate: u32,
    path: &Path,
) -> Result<usize> {
    let seconds = duration.as_secs_f64();
    let frames = (seconds * f64::from(sample_rate)).round();
    if frames > MAX_RENDER_FRAMES as f64 {
        return Err(FocusError::InvalidDuration { value: seconds });
    }
    let frames = frames as usize;

    let mut engine =
        SoundscapeEngine::new(SynthGraph::with_gesture(sample_rate)).with_volume(volume);
    let playing = match engine.set_profile(profile) {
        SoundscapeState::Playing(_) => true,
        SoundscapeState::Silent => false,
        SoundscapeState::Deferred(_) => return Err(FocusError::AudioLocked),
    };

    let mut writer = WavWriter::create(path, mono_float_spec(sample_rate))?;
    for _ in 0..frames {
        let sample = if playing {
            engine.graph_mut().render_frame()
        } else {
            0.0
        };
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    engine.dispose();

    info!(
        "Rendered {} ({:.1}s, {} Hz) to {}",
        profile,
        seconds,
        sample_rate,
        path.display()
    );
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_wav_spec() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, &[0.0, 0.5, -0.5], 44_100).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.sample_format, SampleFormat::Float);
        assert_eq!(reader.len(), 3);
    }

    #[test]
    fn test_render_rain_is_audible() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rain.wav");
        let frames = render_profile(
            SoundscapeProfile::Rain,
            0.8,
            Duration::from_millis(500),
            16_000,
            &path,
        )
        .unwrap();
        assert_eq!(frames, 8_000);

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 8_000);
        assert!(samples.iter().any(|s| s.abs() > 1e-3));
    }

    #[test]
    fn test_render_longer_than_wav_limit_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("long.wav");
        let err = render_profile(
            SoundscapeProfile::Rain,
            0.5,
            Duration::from_secs(7 * 24 * 3600),
            48_000,
            &path,
        )
        .unwrap_err();

        assert_eq!(err.error_code(), "INVALID_DURATION");
        assert!(!path.exists());
    }

    #[test]
    fn test_render_silence_is_zero() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        render_profile(
            SoundscapeProfile::Silence,
            1.0,
            Duration::from_millis(100),
            8_000,
            &path,
        )
        .unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert!(reader.samples::<f32>().all(|s| s.unwrap() == 0.0));
    }
}
