//! Soundscape profiles
//!
//! Each audible profile is a declarative [`Blueprint`]: a noise source, zero
//! or more filter stages (optionally swept by an LFO) and a final gain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::graph::{FilterKind, FilterSpec, NoiseColor, Rolloff};
use crate::error::{FocusError, Result};

/// Fixed set of ambient profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoundscapeProfile {
    #[default]
    Silence,
    BrownNoise,
    Rain,
    Wind,
    Cafe,
}

impl SoundscapeProfile {
    pub const ALL: [SoundscapeProfile; 5] = [
        SoundscapeProfile::Silence,
        SoundscapeProfile::BrownNoise,
        SoundscapeProfile::Rain,
        SoundscapeProfile::Wind,
        SoundscapeProfile::Cafe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SoundscapeProfile::Silence => "silence",
            SoundscapeProfile::BrownNoise => "brown-noise",
            SoundscapeProfile::Rain => "rain",
            SoundscapeProfile::Wind => "wind",
            SoundscapeProfile::Cafe => "cafe",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SoundscapeProfile::Silence => "No ambience",
            SoundscapeProfile::BrownNoise => "Deep, even rumble",
            SoundscapeProfile::Rain => "Pink noise through a slowly wandering band-pass",
            SoundscapeProfile::Wind => "White noise through a steep, drifting low-pass",
            SoundscapeProfile::Cafe => "Muffled brown noise with a slow auto-filter",
        }
    }

    /// Graph description, or `None` for silence
    pub fn blueprint(&self) -> Option<Blueprint> {
        match self {
            SoundscapeProfile::Silence => None,
            SoundscapeProfile::BrownNoise => Some(Blueprint {
                noise: NoiseColor::Brown,
                stages: Vec::new(),
                level_scale: 1.0,
            }),
            SoundscapeProfile::Rain => Some(Blueprint {
                noise: NoiseColor::Pink,
                stages: vec![Stage::swept(
                    FilterSpec {
                        kind: FilterKind::BandPass,
                        frequency: 1_500.0,
                        q: 0.8,
                        rolloff: Rolloff::Db12,
                    },
                    Sweep {
                        rate_hz: 0.1,
                        min_hz: 800.0,
                        max_hz: 2_500.0,
                    },
                )],
                level_scale: 1.0,
            }),
            SoundscapeProfile::Wind => Some(Blueprint {
                noise: NoiseColor::White,
                stages: vec![Stage::swept(
                    FilterSpec {
                        kind: FilterKind::LowPass,
                        frequency: 500.0,
                        q: 0.7,
                        rolloff: Rolloff::Db24,
                    },
                    Sweep {
                        rate_hz: 0.05,
                        min_hz: 250.0,
                        max_hz: 900.0,
                    },
                )],
                level_scale: 1.0,
            }),
            // Auto-filter: a gentle low-pass whose cutoff breathes slowly
            SoundscapeProfile::Cafe => Some(Blueprint {
                noise: NoiseColor::Brown,
                stages: vec![Stage::swept(
                    FilterSpec {
                        kind: FilterKind::LowPass,
                        frequency: 900.0,
                        q: 1.0,
                        rolloff: Rolloff::Db12,
                    },
                    Sweep {
                        rate_hz: 0.2,
                        min_hz: 500.0,
                        max_hz: 1_400.0,
                    },
                )],
                level_scale: CAFE_LEVEL_SCALE,
            }),
        }
    }
}

/// Perceptual balance correction for the cafe profile
pub const CAFE_LEVEL_SCALE: f32 = 0.6;

impl fmt::Display for SoundscapeProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoundscapeProfile {
    type Err = FocusError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "silence" | "none" | "off" => Ok(SoundscapeProfile::Silence),
            "brown-noise" | "brown_noise" | "brown" => Ok(SoundscapeProfile::BrownNoise),
            "rain" => Ok(SoundscapeProfile::Rain),
            "wind" => Ok(SoundscapeProfile::Wind),
            "cafe" | "café" => Ok(SoundscapeProfile::Cafe),
            _ => Err(FocusError::UnknownProfile {
                name: s.to_string(),
            }),
        }
    }
}

/// LFO sweep of a filter's frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sweep {
    pub rate_hz: f32,
    pub min_hz: f32,
    pub max_hz: f32,
}

/// One filter stage, optionally modulated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub filter: FilterSpec,
    pub sweep: Option<Sweep>,
}

impl Stage {
    pub fn fixed(filter: FilterSpec) -> Self {
        Self {
            filter,
            sweep: None,
        }
    }

    pub fn swept(filter: FilterSpec, sweep: Sweep) -> Self {
        Self {
            filter,
            sweep: Some(sweep),
        }
    }

    /// Graph nodes this stage allocates
    pub fn node_count(&self) -> usize {
        1 + usize::from(self.sweep.is_some())
    }
}

/// Declarative graph description for one profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub noise: NoiseColor,
    pub stages: Vec<Stage>,
    /// Multiplier from requested volume to gain level
    pub level_scale: f32,
}

impl Blueprint {
    /// Total nodes: source + stages + gain
    pub fn node_count(&self) -> usize {
        2 + self.stages.iter().map(Stage::node_count).sum::<usize>()
    }

    /// Gain level for a requested volume
    pub fn level_for(&self, volume: f32) -> f32 {
        volume * self.level_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for profile in SoundscapeProfile::ALL {
            assert_eq!(profile.as_str().parse::<SoundscapeProfile>().unwrap(), profile);
        }
        assert!(matches!(
            "ocean".parse::<SoundscapeProfile>(),
            Err(FocusError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn test_serde_kebab_case() {
        let json = serde_json::to_string(&SoundscapeProfile::BrownNoise).unwrap();
        assert_eq!(json, "\"brown-noise\"");
    }

    #[test]
    fn test_silence_has_no_blueprint() {
        assert!(SoundscapeProfile::Silence.blueprint().is_none());
    }

    #[test]
    fn test_node_counts() {
        let count = |p: SoundscapeProfile| p.blueprint().unwrap().node_count();
        assert_eq!(count(SoundscapeProfile::BrownNoise), 2);
        assert_eq!(count(SoundscapeProfile::Rain), 4);
        assert_eq!(count(SoundscapeProfile::Wind), 4);
        assert_eq!(count(SoundscapeProfile::Cafe), 4);
    }

    #[test]
    fn test_fixed_stage_adds_one_node() {
        let blueprint = Blueprint {
            noise: NoiseColor::White,
            stages: vec![Stage::fixed(FilterSpec {
                kind: FilterKind::HighPass,
                frequency: 120.0,
                q: 0.7,
                rolloff: Rolloff::Db12,
            })],
            level_scale: 1.0,
        };
        assert_eq!(blueprint.node_count(), 3);
    }

    #[test]
    fn test_profile_shapes() {
        let rain = SoundscapeProfile::Rain.blueprint().unwrap();
        assert_eq!(rain.noise, NoiseColor::Pink);
        assert_eq!(rain.stages[0].filter.kind, FilterKind::BandPass);

        let wind = SoundscapeProfile::Wind.blueprint().unwrap();
        assert_eq!(wind.noise, NoiseColor::White);
        assert_eq!(wind.stages[0].filter.rolloff, Rolloff::Db24);
        // Wind drifts slower than rain
        assert!(wind.stages[0].sweep.unwrap().rate_hz < rain.stages[0].sweep.unwrap().rate_hz);
    }

    #[test]
    fn test_cafe_level_is_sixty_percent() {
        let cafe = SoundscapeProfile::Cafe.blueprint().unwrap();
        approx::assert_relative_eq!(cafe.level_for(1.0), 0.6);
        approx::assert_relative_eq!(cafe.level_for(0.5), 0.3);

        let rain = SoundscapeProfile::Rain.blueprint().unwrap();
        approx::assert_relative_eq!(rain.level_for(0.5), 0.5);
    }
}
