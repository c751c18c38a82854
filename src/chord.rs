//! # Chord Spelling
//!
//! Seventh-chord qualities, chord identities and diatonic chord spelling.
//!
//! A `ChordSpec` names a chord abstractly (root spelling + quality). `spell()`
//! turns it into exactly four spelled tones: root, 3rd, 5th and 7th. The 3rd,
//! 5th and 7th always use the letters two, four and six steps above the root
//! letter, so `Db maj7` spells `Db F Ab C` and `C# maj7` spells `C# E# G# B#`.
//!
//! ## Supported Qualities
//! - **Major 7th**: `maj7`, `M7`, `Maj7`, `Δ7` → 1, 3, 5, 7
//! - **Minor 7th**: `min7`, `m7`, `-7` → 1, b3, 5, b7
//! - **Half-diminished**: `halfdim`, `m7b5`, `ø`, `ø7` → 1, b3, b5, b7
//! - **Dominant 7th**: `dom7`, `7` → 1, 3, 5, b7

use std::fmt;

use crate::error::DeckError;
use crate::pitch::PitchName;

/// Default roots for generated decks (both spellings of the black keys except G#/D#/A#)
pub const DEFAULT_ROOTS: [&str; 14] = [
    "C", "C#", "Db", "D", "Eb", "E", "F", "F#", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Chord quality: the closed set of seventh chords the deck covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quality {
    Major7,
    Minor7,
    HalfDiminished,
    Dominant7,
}

impl Quality {
    pub const ALL: [Quality; 4] = [
        Quality::Major7,
        Quality::Minor7,
        Quality::HalfDiminished,
        Quality::Dominant7,
    ];

    /// Parse a quality tag or chord-symbol suffix
    pub fn parse_tag(s: &str) -> Option<Self> {
        match s.trim() {
            "maj7" | "M7" | "Maj7" | "Δ7" | "major7" => Some(Quality::Major7),
            "min7" | "m7" | "-7" | "minor7" => Some(Quality::Minor7),
            "halfdim" | "m7b5" | "ø" | "ø7" | "half-diminished" => Some(Quality::HalfDiminished),
            "dom7" | "7" | "dominant7" => Some(Quality::Dominant7),
            _ => None,
        }
    }

    /// Canonical tag used in the `Quality` field and in configuration
    pub fn tag(self) -> &'static str {
        match self {
            Quality::Major7 => "maj7",
            Quality::Minor7 => "min7",
            Quality::HalfDiminished => "halfdim",
            Quality::Dominant7 => "dom7",
        }
    }

    /// Chord-symbol suffix used in display names
    pub fn symbol(self) -> &'static str {
        match self {
            Quality::Major7 => "maj7",
            Quality::Minor7 => "m7",
            Quality::HalfDiminished => "m7b5",
            Quality::Dominant7 => "7",
        }
    }

    /// Semitones above the root for the 3rd, 5th and 7th
    fn intervals(self) -> [i32; 3] {
        match self {
            Quality::Major7 => [4, 7, 11],
            Quality::Minor7 => [3, 7, 10],
            Quality::HalfDiminished => [3, 6, 10],
            Quality::Dominant7 => [4, 7, 10],
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The four spelled tones of a seventh chord
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordTones {
    pub root: PitchName,
    pub third: PitchName,
    pub fifth: PitchName,
    pub seventh: PitchName,
}

impl ChordTones {
    pub fn as_array(&self) -> [PitchName; 4] {
        [self.root, self.third, self.fifth, self.seventh]
    }
}

/// Abstract chord identity: root spelling plus quality, no voicing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChordSpec {
    pub root: PitchName,
    pub quality: Quality,
}

impl ChordSpec {
    pub fn new(root: PitchName, quality: Quality) -> Self {
        Self { root, quality }
    }

    /// Build a chord from a root name and a quality tag
    ///
    /// # Examples
    /// ```
    /// use comping::ChordSpec;
    ///
    /// let chord = ChordSpec::parse("Db", "maj7").unwrap();
    /// assert_eq!(chord.display_name(), "Dbmaj7");
    /// assert!(ChordSpec::parse("Db", "sus4").is_err());
    /// ```
    pub fn parse(root: &str, quality: &str) -> Result<Self, DeckError> {
        let root_name = PitchName::parse(root).map_err(|_| DeckError::InvalidChord {
            chord: format!("{}{}", root, quality),
            message: format!("invalid root '{}'", root),
        })?;
        let quality = Quality::parse_tag(quality).ok_or_else(|| DeckError::InvalidChord {
            chord: format!("{}{}", root, quality),
            message: format!("unknown quality '{}'", quality),
        })?;
        Ok(Self::new(root_name, quality))
    }

    /// Display name: root plus chord-symbol suffix (`Cmaj7`, `F#m7b5`, `Bb7`)
    pub fn display_name(&self) -> String {
        format!("{}{}", self.root, self.quality.symbol())
    }

    /// Spell the chord diatonically into root, 3rd, 5th and 7th
    ///
    /// # Examples
    /// ```
    /// use comping::ChordSpec;
    ///
    /// let tones = ChordSpec::parse("C", "maj7").unwrap().spell().unwrap();
    /// let names: Vec<String> = tones.as_array().iter().map(|t| t.to_string()).collect();
    /// assert_eq!(names, vec!["C", "E", "G", "B"]);
    /// ```
    ///
    /// # Errors
    /// Fails with [`DeckError::InvalidChord`] when a tone would need more
    /// than two accidentals, which only happens for double-accidental roots.
    pub fn spell(&self) -> Result<ChordTones, DeckError> {
        let [third, fifth, seventh] = self.quality.intervals();
        Ok(ChordTones {
            root: self.root,
            third: self.tone_above(2, third)?,
            fifth: self.tone_above(4, fifth)?,
            seventh: self.tone_above(6, seventh)?,
        })
    }

    fn tone_above(&self, letter_steps: i32, semitones: i32) -> Result<PitchName, DeckError> {
        let letter = self.root.letter.up(letter_steps);
        let target = (self.root.pitch_class() + semitones).rem_euclid(12);
        // Map the difference to -6..=5 so the smallest accidental wins
        let accidental = (target - letter.semitone() + 6).rem_euclid(12) - 6;

        i8::try_from(accidental)
            .ok()
            .and_then(|acc| PitchName::new(letter, acc))
            .ok_or_else(|| DeckError::InvalidChord {
                chord: self.display_name(),
                message: format!(
                    "{} above the root cannot be spelled on {} with at most two accidentals",
                    semitones,
                    letter.as_char()
                ),
            })
    }
}

impl fmt::Display for ChordSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Parse a chord symbol such as `Dbmaj7`, `F#m7b5` or `Bb7` into a `ChordSpec`
///
/// The root is a letter followed by any number of `#`, `b`, `♯` or `♭`; the
/// rest of the symbol is the quality suffix.
///
/// # Examples
/// ```
/// use comping::chord::{parse_chord_symbol, Quality};
///
/// let chord = parse_chord_symbol("F#m7b5").unwrap();
/// assert_eq!(chord.root.to_string(), "F#");
/// assert_eq!(chord.quality, Quality::HalfDiminished);
///
/// assert_eq!(parse_chord_symbol("Bb7").unwrap().quality, Quality::Dominant7);
/// assert!(parse_chord_symbol("Cadd9").is_err());
/// ```
pub fn parse_chord_symbol(chord_symbol: &str) -> Result<ChordSpec, DeckError> {
    let symbol = chord_symbol.trim();
    let mut chars = symbol.char_indices();

    // Root letter
    if chars.next().is_none() {
        return Err(DeckError::InvalidChord {
            chord: chord_symbol.to_string(),
            message: "empty chord symbol".to_string(),
        });
    }

    // Accidentals directly after the letter
    let mut split = symbol.len();
    for (idx, c) in chars {
        if !matches!(c, '#' | 'b' | '♯' | '♭') {
            split = idx;
            break;
        }
    }

    ChordSpec::parse(&symbol[..split], &symbol[split..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spelled(root: &str, quality: &str) -> Vec<String> {
        ChordSpec::parse(root, quality)
            .unwrap()
            .spell()
            .unwrap()
            .as_array()
            .iter()
            .map(|t| t.to_string())
            .collect()
    }

    #[test]
    fn test_chord_spelling() {
        assert_eq!(spelled("C", "maj7"), vec!["C", "E", "G", "B"]);
        assert_eq!(spelled("D", "min7"), vec!["D", "F", "A", "C"]);
        assert_eq!(spelled("G", "dom7"), vec!["G", "B", "D", "F"]);
        assert_eq!(spelled("B", "halfdim"), vec!["B", "D", "F", "A"]);
    }

    #[test]
    fn test_chord_spelling_with_accidentals() {
        assert_eq!(spelled("Db", "maj7"), vec!["Db", "F", "Ab", "C"]);
        assert_eq!(spelled("C#", "maj7"), vec!["C#", "E#", "G#", "B#"]);
        assert_eq!(spelled("Ab", "min7"), vec!["Ab", "Cb", "Eb", "Gb"]);
        assert_eq!(spelled("Gb", "halfdim"), vec!["Gb", "Bbb", "Dbb", "Fb"]);
        assert_eq!(spelled("F#", "dom7"), vec!["F#", "A#", "C#", "E"]);
    }

    #[test]
    fn test_every_default_chord_has_four_distinct_tones() {
        for root in DEFAULT_ROOTS {
            for quality in Quality::ALL {
                let chord = ChordSpec::parse(root, quality.tag()).unwrap();
                let tones = chord.spell().unwrap().as_array();
                let mut classes: Vec<i32> = tones.iter().map(|t| t.pitch_class()).collect();
                classes.sort();
                classes.dedup();
                assert_eq!(classes.len(), 4, "{} should have 4 distinct tones", chord);
            }
        }
    }

    #[test]
    fn test_spelling_beyond_double_accidentals_fails() {
        // Root Fbb: the minor 3rd would need a triple flat on A
        let chord = ChordSpec::parse("Fbb", "min7").unwrap();
        assert!(matches!(chord.spell(), Err(DeckError::InvalidChord { .. })));
    }

    #[test]
    fn test_quality_aliases() {
        assert_eq!(Quality::parse_tag("M7"), Some(Quality::Major7));
        assert_eq!(Quality::parse_tag("-7"), Some(Quality::Minor7));
        assert_eq!(Quality::parse_tag("ø"), Some(Quality::HalfDiminished));
        assert_eq!(Quality::parse_tag("7"), Some(Quality::Dominant7));
        assert_eq!(Quality::parse_tag("9"), None);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ChordSpec::parse("C", "maj7").unwrap().display_name(), "Cmaj7");
        assert_eq!(ChordSpec::parse("F#", "halfdim").unwrap().display_name(), "F#m7b5");
        assert_eq!(ChordSpec::parse("Bb", "dom7").unwrap().display_name(), "Bb7");
        assert_eq!(ChordSpec::parse("Eb", "m7").unwrap().display_name(), "Ebm7");
    }

    #[test]
    fn test_parse_chord_symbol() {
        let chord = parse_chord_symbol("Dbmaj7").unwrap();
        assert_eq!(chord, ChordSpec::parse("Db", "maj7").unwrap());

        let chord = parse_chord_symbol("Cm7").unwrap();
        assert_eq!(chord.quality, Quality::Minor7);

        assert!(parse_chord_symbol("").is_err());
        assert!(parse_chord_symbol("C").is_err());
        assert!(parse_chord_symbol("Xmaj7").is_err());
    }
}
