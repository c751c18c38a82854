//! # Configuration
//!
//! Deck settings, loaded from an optional YAML file. Keys are kebab-case:
//!
//! ```yaml
//! deck-name: Comping Chords
//! deck-id: 1393751746
//! model-id: 1149467492
//! output: Comping-Chords.apkg
//! input: ChordsData.csv          # omit to generate roots x qualities
//! roots: [C, F, Bb]
//! qualities: [maj7, dom7]
//! voicings: [shell-off-3rd, Rootless_V_Off_7th]
//! media:
//!   enabled: true
//!   dir: media
//!   soundfont: /usr/share/soundfonts/FluidR3_GM.sf2
//!   dpi: 150
//!   lilypond: lilypond           # program names or paths
//!   fluidsynth: fluidsynth
//!   ffmpeg: ffmpeg
//! ```
//!
//! The file is deserialized into `Raw*` structs and then validated into
//! [`Config`]; unknown roots, qualities or voicings fail at load time.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::chord::{Quality, DEFAULT_ROOTS};
use crate::error::DeckError;
use crate::pitch::PitchName;
use crate::voicing::Voicing;

pub const DEFAULT_DECK_NAME: &str = "Comping Chords";
pub const DEFAULT_DECK_ID: i64 = 1393751746;
pub const DEFAULT_MODEL_ID: i64 = 1149467492;
pub const DEFAULT_OUTPUT: &str = "Comping-Chords.apkg";
pub const DEFAULT_SOUNDFONT: &str = "/usr/share/soundfonts/FluidR3_GM.sf2";
pub const DEFAULT_DPI: u32 = 150;

/// Raw configuration for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawConfig {
    pub deck_name: Option<String>,
    pub deck_id: Option<i64>,
    pub model_id: Option<i64>,
    pub output: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub roots: Option<Vec<String>>,
    pub qualities: Option<Vec<String>>,
    pub voicings: Option<Vec<String>>,
    pub media: Option<RawMediaSettings>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawMediaSettings {
    pub enabled: Option<bool>,
    pub dir: Option<PathBuf>,
    pub soundfont: Option<PathBuf>,
    pub dpi: Option<u32>,
    pub lilypond: Option<PathBuf>,
    pub fluidsynth: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
}

/// External programs used for media; bare names are looked up on `PATH`
#[derive(Debug, Clone, PartialEq)]
pub struct MediaTools {
    pub lilypond: PathBuf,
    pub fluidsynth: PathBuf,
    pub ffmpeg: PathBuf,
}

impl Default for MediaTools {
    fn default() -> Self {
        Self {
            lilypond: PathBuf::from("lilypond"),
            fluidsynth: PathBuf::from("fluidsynth"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaSettings {
    pub enabled: bool,
    /// Working directory for rendered files; a scratch directory when unset
    pub dir: Option<PathBuf>,
    pub soundfont: PathBuf,
    pub dpi: u32,
    pub tools: MediaTools,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: None,
            soundfont: PathBuf::from(DEFAULT_SOUNDFONT),
            dpi: DEFAULT_DPI,
            tools: MediaTools::default(),
        }
    }
}

/// Validated deck settings
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub deck_name: String,
    pub deck_id: i64,
    pub model_id: i64,
    pub output: PathBuf,
    /// Chord table; when unset, chords are every root with every quality
    pub input: Option<PathBuf>,
    pub roots: Vec<PitchName>,
    pub qualities: Vec<Quality>,
    pub voicings: Vec<Voicing>,
    pub media: MediaSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deck_name: DEFAULT_DECK_NAME.to_string(),
            deck_id: DEFAULT_DECK_ID,
            model_id: DEFAULT_MODEL_ID,
            output: PathBuf::from(DEFAULT_OUTPUT),
            input: None,
            roots: DEFAULT_ROOTS
                .iter()
                .filter_map(|r| PitchName::parse(r).ok())
                .collect(),
            qualities: Quality::ALL.to_vec(),
            voicings: Voicing::DEFAULT.to_vec(),
            media: MediaSettings::default(),
        }
    }
}

impl Config {
    /// Parse and validate a YAML document
    ///
    /// # Examples
    /// ```
    /// use comping::config::Config;
    /// use comping::voicing::Voicing;
    ///
    /// let config = Config::from_yaml("deck-name: Shells\nvoicings: [shell-off-3rd]\n").unwrap();
    /// assert_eq!(config.deck_name, "Shells");
    /// assert_eq!(config.voicings, vec![Voicing::ShellOff3rd]);
    /// assert_eq!(config.deck_id, 1393751746);
    /// ```
    pub fn from_yaml(content: &str) -> Result<Self, DeckError> {
        let raw: RawConfig = if content.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| DeckError::Config(e.to_string()))?
        };
        Self::from_raw(raw)
    }

    pub fn load(path: &Path) -> Result<Self, DeckError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| DeckError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_raw(raw: RawConfig) -> Result<Self, DeckError> {
        let defaults = Config::default();

        let roots = match raw.roots {
            Some(roots) => parse_roots(&roots)?,
            None => defaults.roots,
        };
        let qualities = match raw.qualities {
            Some(qualities) => parse_qualities(&qualities)?,
            None => defaults.qualities,
        };
        let voicings = match raw.voicings {
            Some(voicings) => parse_voicings(&voicings)?,
            None => defaults.voicings,
        };

        let media = match raw.media {
            Some(m) => {
                let tools = defaults.media.tools;
                MediaSettings {
                    enabled: m.enabled.unwrap_or(true),
                    dir: m.dir,
                    soundfont: m.soundfont.unwrap_or(defaults.media.soundfont),
                    dpi: m.dpi.unwrap_or(defaults.media.dpi),
                    tools: MediaTools {
                        lilypond: m.lilypond.unwrap_or(tools.lilypond),
                        fluidsynth: m.fluidsynth.unwrap_or(tools.fluidsynth),
                        ffmpeg: m.ffmpeg.unwrap_or(tools.ffmpeg),
                    },
                }
            }
            None => defaults.media,
        };
        if media.dpi == 0 {
            return Err(DeckError::Config("media dpi must be positive".to_string()));
        }

        Ok(Config {
            deck_name: raw.deck_name.unwrap_or(defaults.deck_name),
            deck_id: raw.deck_id.unwrap_or(defaults.deck_id),
            model_id: raw.model_id.unwrap_or(defaults.model_id),
            output: raw.output.unwrap_or(defaults.output),
            input: raw.input,
            roots,
            qualities,
            voicings,
            media,
        })
    }
}

pub fn parse_roots<S: AsRef<str>>(roots: &[S]) -> Result<Vec<PitchName>, DeckError> {
    non_empty("roots", roots)?;
    roots
        .iter()
        .map(|r| {
            PitchName::parse(r.as_ref())
                .map_err(|_| DeckError::Config(format!("invalid root '{}'", r.as_ref())))
        })
        .collect()
}

pub fn parse_qualities<S: AsRef<str>>(qualities: &[S]) -> Result<Vec<Quality>, DeckError> {
    non_empty("qualities", qualities)?;
    qualities
        .iter()
        .map(|q| {
            Quality::parse_tag(q.as_ref())
                .ok_or_else(|| DeckError::Config(format!("unknown quality '{}'", q.as_ref())))
        })
        .collect()
}

pub fn parse_voicings<S: AsRef<str>>(voicings: &[S]) -> Result<Vec<Voicing>, DeckError> {
    non_empty("voicings", voicings)?;
    let mut parsed: Vec<Voicing> = Vec::with_capacity(voicings.len());
    for v in voicings {
        let voicing: Voicing = v.as_ref().parse()?;
        if parsed.contains(&voicing) {
            return Err(DeckError::Config(format!("voicing {} listed twice", voicing)));
        }
        parsed.push(voicing);
    }
    Ok(parsed)
}

fn non_empty<S>(key: &str, values: &[S]) -> Result<(), DeckError> {
    if values.is_empty() {
        Err(DeckError::Config(format!("{} must not be empty", key)))
    } else {
        Ok(())
    }
}
