//! # Pitch Types
//!
//! Letter names, spelled pitch names and octave-placed pitches.
//!
//! ## Spelling vs. pitch class
//! A `PitchName` keeps its spelling: `Db` and `C#` are different names with the
//! same pitch class. Chord spelling depends on this, since the 3rd of `Db` is
//! `F` while the 3rd of `C#` is `E#`.
//!
//! ## Octaves
//! Octaves follow scientific pitch notation (C4 = middle C). Octave numbers
//! attach to the letter, so `B#3` and `C4` sound the same but sit on different
//! staff positions.
//!
//! ## Shorthand
//! English shorthand accepts `#`/`s`/`♯` for sharps and `b`/`f`/`♭` for flats,
//! doubled for double accidentals: `C`, `Db`, `Df`, `C#`, `Cs`, `Bbb`, `Fss`.

use std::fmt;

use crate::error::DeckError;

/// Note letters A through G, in staff order starting from C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    /// Position within the octave, C = 0 .. B = 6
    pub fn index(self) -> i32 {
        self as i32
    }

    /// The letter `steps` diatonic steps above this one (wrapping at B)
    pub fn up(self, steps: i32) -> Letter {
        Letter::ALL[(self.index() + steps).rem_euclid(7) as usize]
    }

    /// Semitone offset of the natural note from C
    pub fn semitone(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    pub fn from_char(c: char) -> Option<Letter> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }

    /// Italian solfège syllable (`Do`, `Re`, ..., `Si`)
    pub fn solfege(self) -> &'static str {
        match self {
            Letter::C => "Do",
            Letter::D => "Re",
            Letter::E => "Mi",
            Letter::F => "Fa",
            Letter::G => "Sol",
            Letter::A => "La",
            Letter::B => "Si",
        }
    }
}

/// A spelled pitch name: letter plus accidental in semitones (-2..=2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PitchName {
    pub letter: Letter,
    pub accidental: i8,
}

impl PitchName {
    pub fn new(letter: Letter, accidental: i8) -> Option<Self> {
        if (-2..=2).contains(&accidental) {
            Some(Self { letter, accidental })
        } else {
            None
        }
    }

    /// Parse English shorthand (`C`, `Db`, `Df`, `C#`, `Cs`, `Bbb`, `E♭`)
    ///
    /// # Examples
    /// ```
    /// use comping::pitch::{Letter, PitchName};
    ///
    /// assert_eq!(PitchName::parse("Db").unwrap(), PitchName::new(Letter::D, -1).unwrap());
    /// assert_eq!(PitchName::parse("Cs").unwrap(), PitchName::new(Letter::C, 1).unwrap());
    /// assert_eq!(PitchName::parse("Bbb").unwrap(), PitchName::new(Letter::B, -2).unwrap());
    /// assert!(PitchName::parse("H").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, DeckError> {
        let invalid = |message: &str| DeckError::InvalidChord {
            chord: s.to_string(),
            message: message.to_string(),
        };

        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let letter = chars
            .next()
            .and_then(Letter::from_char)
            .ok_or_else(|| invalid("pitch name must start with a letter A-G"))?;

        let mut accidental: i8 = 0;
        for c in chars {
            let step = match c {
                '#' | 's' | '♯' => 1,
                'b' | 'f' | '♭' => -1,
                '𝄪' => 2,
                '𝄫' => -2,
                _ => return Err(invalid(&format!("unexpected character '{}'", c))),
            };
            accidental = accidental.saturating_add(step);
        }

        PitchName::new(letter, accidental)
            .ok_or_else(|| invalid("more than two accidentals"))
    }

    /// Pitch class, 0 = C .. 11 = B
    pub fn pitch_class(self) -> i32 {
        (self.letter.semitone() + self.accidental as i32).rem_euclid(12)
    }

    /// English shorthand with `f`/`s` suffixes (`Af`, `Css`), the key
    /// convention of the note-name tables
    pub fn english_plain(self) -> String {
        let mut s = self.letter.as_char().to_string();
        s.push_str(&accidental_suffix(self.accidental, "f", "s"));
        s
    }

    /// Italian shorthand with `b`/`d` suffixes (`Lab`, `Dodd`)
    pub fn italian_plain(self) -> String {
        let mut s = self.letter.solfege().to_string();
        s.push_str(&accidental_suffix(self.accidental, "b", "d"));
        s
    }

    /// Note name in LilyPond's `italiano` input language (`do`, `sib`, `fad`)
    pub fn lilypond_name(self) -> String {
        self.italian_plain().to_lowercase()
    }
}

/// `Db`, `F#`, `Bbb`, `C##`
impl fmt::Display for PitchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            self.letter.as_char(),
            accidental_suffix(self.accidental, "b", "#")
        )
    }
}

fn accidental_suffix(accidental: i8, flat: &str, sharp: &str) -> String {
    if accidental < 0 {
        flat.repeat(accidental.unsigned_abs() as usize)
    } else {
        sharp.repeat(accidental as usize)
    }
}

/// A pitch name placed in an octave (scientific pitch notation, C4 = middle C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PitchOctave {
    pub name: PitchName,
    pub octave: i32,
}

impl PitchOctave {
    pub fn new(name: PitchName, octave: i32) -> Self {
        Self { name, octave }
    }

    /// Diatonic staff position: seven steps per octave
    pub fn staff_position(self) -> i32 {
        self.octave * 7 + self.name.letter.index()
    }

    /// Place `name` in the lowest octave that sits strictly above `self` on the staff
    pub fn stack_above(self, name: PitchName) -> PitchOctave {
        let mut octave = self.octave;
        while PitchOctave::new(name, octave).staff_position() <= self.staff_position() {
            octave += 1;
        }
        PitchOctave::new(name, octave)
    }

    /// LilyPond absolute-mode octave marks: octave 3 is unmarked
    pub fn lilypond_octave_marks(self) -> String {
        let offset = self.octave - 3;
        if offset >= 0 {
            "'".repeat(offset as usize)
        } else {
            ",".repeat(offset.unsigned_abs() as usize)
        }
    }

    /// LilyPond token with the given duration, e.g. `mi'1`
    pub fn lilypond_token(self, duration: u8) -> String {
        format!(
            "{}{}{}",
            self.name.lilypond_name(),
            self.lilypond_octave_marks(),
            duration
        )
    }
}

/// `C3`, `Eb4`
impl fmt::Display for PitchOctave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}
