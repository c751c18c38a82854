//! # Voicing Generator
//!
//! The closed set of voicing kinds and the fixed rule each one uses to pick
//! and place chord tones on a grand staff.
//!
//! | Voicing                     | Treble staff                   | Bass staff |
//! |-----------------------------|--------------------------------|------------|
//! | `FullStandardV`             | root@3, 3rd/5th/7th@4          | rest       |
//! | `Rootless_V_Off_3rd`        | root@3, 3rd stacked above      | rest       |
//! | `Rootless_V_Off_7th`        | root@3, 7th stacked above      | rest       |
//! | `GuideTones_V_Off_3rd`      | 3rd@4, 7th stacked above       | root@3     |
//! | `GuideTones_V_Off_7th`      | 7th@3, 3rd stacked above       | root@3     |
//! | `FourNotesSh_Ext_V_Off_*`   | not implemented                |            |
//!
//! "Stacked above" means the lowest octave that is strictly higher on the
//! staff than the previous tone.
//!
//! ## Example
//! ```rust
//! use comping::voicing::{render_voicing, Voicing};
//! use comping::ChordSpec;
//!
//! let chord = ChordSpec::parse("C", "maj7").unwrap();
//! let rendered = render_voicing(&chord, Voicing::ShellOff7th).unwrap();
//! let treble: Vec<String> = rendered.treble.iter().map(|p| p.to_string()).collect();
//! assert_eq!(treble, vec!["C3", "B3"]);
//! assert!(rendered.markup.starts_with("[lilypond=void]"));
//! ```

use std::fmt;
use std::str::FromStr;

use crate::chord::{ChordSpec, ChordTones};
use crate::error::DeckError;
use crate::lilypond;
use crate::pitch::{PitchName, PitchOctave};

const LOW_OCTAVE: i32 = 3;
const HIGH_OCTAVE: i32 = 4;

/// Voicing kinds, in the order the deck lists them by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Voicing {
    FullRootPosition,
    ShellOff3rd,
    ShellOff7th,
    GuideToneOff3rd,
    GuideToneOff7th,
    FourNoteShellExtOff3rd,
    FourNoteShellExtOff7th,
}

impl Voicing {
    pub const ALL: [Voicing; 7] = [
        Voicing::FullRootPosition,
        Voicing::ShellOff3rd,
        Voicing::ShellOff7th,
        Voicing::GuideToneOff3rd,
        Voicing::GuideToneOff7th,
        Voicing::FourNoteShellExtOff3rd,
        Voicing::FourNoteShellExtOff7th,
    ];

    /// Voicings a deck carries when none are configured
    pub const DEFAULT: [Voicing; 6] = [
        Voicing::ShellOff3rd,
        Voicing::ShellOff7th,
        Voicing::GuideToneOff3rd,
        Voicing::GuideToneOff7th,
        Voicing::FourNoteShellExtOff3rd,
        Voicing::FourNoteShellExtOff7th,
    ];

    /// Base of the deck field names for this voicing
    pub fn field_base(self) -> &'static str {
        match self {
            Voicing::FullRootPosition => "FullStandardV",
            Voicing::ShellOff3rd => "Rootless_V_Off_3rd",
            Voicing::ShellOff7th => "Rootless_V_Off_7th",
            Voicing::GuideToneOff3rd => "GuideTones_V_Off_3rd",
            Voicing::GuideToneOff7th => "GuideTones_V_Off_7th",
            Voicing::FourNoteShellExtOff3rd => "FourNotesSh_Ext_V_Off_3rd",
            Voicing::FourNoteShellExtOff7th => "FourNotesSh_Ext_V_Off_7th",
        }
    }

    /// Name used on the command line and in configuration files
    pub fn kebab_name(self) -> &'static str {
        match self {
            Voicing::FullRootPosition => "full-root-position",
            Voicing::ShellOff3rd => "shell-off-3rd",
            Voicing::ShellOff7th => "shell-off-7th",
            Voicing::GuideToneOff3rd => "guide-tone-off-3rd",
            Voicing::GuideToneOff7th => "guide-tone-off-7th",
            Voicing::FourNoteShellExtOff3rd => "four-note-shell-ext-off-3rd",
            Voicing::FourNoteShellExtOff7th => "four-note-shell-ext-off-7th",
        }
    }

    pub fn is_implemented(self) -> bool {
        !matches!(
            self,
            Voicing::FourNoteShellExtOff3rd | Voicing::FourNoteShellExtOff7th
        )
    }

    /// Place the chord tones on the two staves: `(treble, bass)`
    fn place(self, tones: &ChordTones) -> Result<(Vec<PitchOctave>, Vec<PitchOctave>), DeckError> {
        let low = |name: PitchName| PitchOctave::new(name, LOW_OCTAVE);
        let high = |name: PitchName| PitchOctave::new(name, HIGH_OCTAVE);

        let placed = match self {
            Voicing::FullRootPosition => (
                vec![
                    low(tones.root),
                    high(tones.third),
                    high(tones.fifth),
                    high(tones.seventh),
                ],
                Vec::new(),
            ),
            Voicing::ShellOff3rd => {
                let root = low(tones.root);
                (vec![root, root.stack_above(tones.third)], Vec::new())
            }
            Voicing::ShellOff7th => {
                let root = low(tones.root);
                (vec![root, root.stack_above(tones.seventh)], Vec::new())
            }
            Voicing::GuideToneOff3rd => {
                let third = high(tones.third);
                (vec![third, third.stack_above(tones.seventh)], vec![low(tones.root)])
            }
            Voicing::GuideToneOff7th => {
                let seventh = low(tones.seventh);
                (vec![seventh, seventh.stack_above(tones.third)], vec![low(tones.root)])
            }
            Voicing::FourNoteShellExtOff3rd | Voicing::FourNoteShellExtOff7th => {
                return Err(DeckError::NotImplemented(self.field_base().to_string()));
            }
        };
        Ok(placed)
    }
}

impl FromStr for Voicing {
    type Err = DeckError;

    /// Accepts the field base name (`Rootless_V_Off_3rd`) or the kebab-case
    /// name (`shell-off-3rd`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Voicing::ALL
            .into_iter()
            .find(|v| v.field_base() == s || v.kebab_name() == s)
            .ok_or_else(|| DeckError::UnknownVoicing(s.to_string()))
    }
}

impl fmt::Display for Voicing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_base())
    }
}

/// One voicing of one chord, placed and rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedVoicing {
    pub voicing: Voicing,
    pub treble: Vec<PitchOctave>,
    pub bass: Vec<PitchOctave>,
    /// Escaped, tagged markup ready for a deck field
    pub markup: String,
    source: String,
}

impl RenderedVoicing {
    /// Unescaped LilyPond source, without the add-on tag pair
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Bass then treble tones in Italian shorthand (`Do Mi Si`)
    pub fn note_list(&self) -> String {
        self.bass
            .iter()
            .chain(&self.treble)
            .map(|p| p.name.italian_plain())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// All tones, bass first
    pub fn tones(&self) -> impl Iterator<Item = &PitchOctave> {
        self.bass.iter().chain(&self.treble)
    }
}

/// Pick and place the tones of `chord` for `voicing` and render the markup
///
/// Pure: the same inputs always produce byte-identical markup.
///
/// # Errors
/// - [`DeckError::InvalidChord`] if the chord cannot be spelled
/// - [`DeckError::NotImplemented`] for the four-note shell extension voicings
pub fn render_voicing(chord: &ChordSpec, voicing: Voicing) -> Result<RenderedVoicing, DeckError> {
    let tones = chord.spell()?;
    let (treble, bass) = voicing.place(&tones)?;

    let source = lilypond::score_source(&treble, &bass);
    let markup = lilypond::field_markup(&source);

    Ok(RenderedVoicing {
        voicing,
        treble,
        bass,
        markup,
        source,
    })
}
